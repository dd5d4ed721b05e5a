use crate::ast::{Ast, Env, FieldKind, NodeId, NodeKind};

/// Record parent links and lexical environments for the subtree at `root`.
///
/// Every node gets the environment its own expression is evaluated in.
/// Running it twice with the same arguments leaves the tables unchanged.
pub fn annotate(ast: &mut Ast, root: NodeId, parent: Option<NodeId>, env: Env) {
    let mut stack = vec![(root, parent, env)];
    while let Some((id, parent, env)) = stack.pop() {
        let children = child_envs(ast, id, &env);
        ast.set_annotation(id, parent, env);
        for (child, child_env) in children.into_iter().rev() {
            stack.push((child, Some(id), child_env));
        }
    }
}

fn named<'a>(ast: &'a Ast, ids: &'a [NodeId]) -> impl Iterator<Item = (String, NodeId)> + 'a {
    ids.iter()
        .filter_map(move |id| ast.bind_name(*id).map(|name| (name.to_string(), *id)))
}

/// Object locals are visible to every field of the object, themselves included.
fn object_locals<'a>(ast: &'a Ast, fields: &'a [NodeId]) -> impl Iterator<Item = (String, NodeId)> + 'a {
    fields.iter().filter_map(move |id| match ast.kind(*id) {
        NodeKind::ObjectField(field) if field.kind == FieldKind::Local => {
            field.name.as_ref().map(|name| (name.clone(), *id))
        }
        _ => None,
    })
}

/// Specs see the `for` variables before them; returns each spec's
/// environment and the environment of the comprehension body.
fn comprehension(ast: &Ast, specs: &[NodeId], env: &Env) -> (Vec<(NodeId, Env)>, Env) {
    let mut scope = env.clone();
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        out.push((*spec, scope.clone()));
        if let NodeKind::ForSpec { var, .. } = ast.kind(*spec) {
            scope = scope.extend([(var.clone(), *spec)]);
        }
    }
    (out, scope)
}

fn child_envs(ast: &Ast, id: NodeId, env: &Env) -> Vec<(NodeId, Env)> {
    match ast.kind(id) {
        NodeKind::Local { binds, body } => {
            let inner = env.extend(named(ast, binds));
            binds
                .iter()
                .chain([body])
                .map(|child| (*child, inner.clone()))
                .collect()
        }
        NodeKind::LocalBind {
            params: Some(params),
            body,
            ..
        }
        | NodeKind::Function { params, body } => {
            let inner = env.extend(named(ast, params));
            params
                .iter()
                .chain([body])
                .map(|child| (*child, inner.clone()))
                .collect()
        }
        NodeKind::Object { fields, .. } => {
            let inner = env.extend(object_locals(ast, fields));
            fields.iter().map(|f| (*f, inner.clone())).collect()
        }
        NodeKind::ObjectComp { fields, specs } => {
            let (mut out, scope) = comprehension(ast, specs, env);
            let inner = scope.extend(object_locals(ast, fields));
            out.extend(fields.iter().map(|f| (*f, inner.clone())));
            out
        }
        NodeKind::ArrayComp { body, specs } => {
            let (mut out, scope) = comprehension(ast, specs, env);
            out.insert(0, (*body, scope));
            out
        }
        NodeKind::ObjectField(field) => {
            let mut out = Vec::new();
            out.extend(field.key.map(|key| (key, env.clone())));
            let inner = match &field.params {
                Some(params) => {
                    let inner = env.extend(named(ast, params));
                    out.extend(params.iter().map(|p| (*p, inner.clone())));
                    inner
                }
                None => env.clone(),
            };
            out.push((field.body, inner));
            out.extend(field.message.map(|m| (m, env.clone())));
            out
        }
        other => other.children().into_iter().map(|c| (c, env.clone())).collect(),
    }
}
