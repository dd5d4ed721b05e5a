use std::collections::BTreeMap;

use crate::ast::{FieldKind, NodeKind, ObjectField};
use crate::resolve::NodeRef;

/// A named member of an object literal.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    /// The `ObjectField` node.
    pub node: NodeRef,
}

impl Field {
    fn field(&self) -> Option<&ObjectField> {
        match self.node.kind() {
            NodeKind::ObjectField(field) => Some(field),
            _ => None,
        }
    }

    /// Method sugar, or a value that is a function literal.
    pub fn is_method(&self) -> bool {
        self.field().is_some_and(|f| {
            f.params.is_some() || matches!(self.node.tree.kind(f.body), NodeKind::Function { .. })
        })
    }

    /// What a lookup of this field yields: the value expression, or the
    /// field itself for method sugar so its parameters stay attached.
    pub fn value(&self) -> NodeRef {
        match self.field() {
            Some(f) if f.params.is_none() => self.node.with(f.body),
            _ => self.node.clone(),
        }
    }

    pub fn comments(&self) -> &[String] {
        self.node.tree.comments(self.node.id)
    }
}

/// Fields visible on an object value, after merging.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: BTreeMap<String, Field>,
    merged: bool,
}

impl FieldSet {
    /// Literal-named fields of an `Object` node. Computed keys, locals and
    /// asserts carry no static name and are skipped.
    pub fn from_object(object: &NodeRef) -> Self {
        let mut fields = BTreeMap::new();
        if let NodeKind::Object { fields: members, .. } = object.kind() {
            for member in members {
                if let NodeKind::ObjectField(field) = object.tree.kind(*member)
                    && matches!(field.kind, FieldKind::Id | FieldKind::Str)
                    && let Some(name) = &field.name
                {
                    fields.insert(
                        name.clone(),
                        Field {
                            name: name.clone(),
                            node: object.with(*member),
                        },
                    );
                }
            }
        }
        Self { fields, merged: false }
    }

    /// `self + right`: fields of `right` override fields of `self`.
    pub fn merge(mut self, right: FieldSet) -> FieldSet {
        self.fields.extend(right.fields);
        self.merged = true;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Whether this set came from combining two objects.
    pub fn is_merged(&self) -> bool {
        self.merged
    }
}
