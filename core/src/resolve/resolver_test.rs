#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use crate::ast::{Ast, NodeKind, annotate, locate, parse};
    use crate::resolve::{NoImports, NodeRef, Resolution, Resolver, defining_construct};
    use crate::token::Position;

    fn tree(src: &str) -> Arc<Ast> {
        Arc::new(parse(src).unwrap())
    }

    fn at(tree: &Arc<Ast>, line: u32, column: u32) -> NodeRef {
        let id = locate(tree, Position::at(line, column)).unwrap();
        NodeRef::new(Arc::clone(tree), id)
    }

    fn resolve_text(src: &str, line: u32, column: u32) -> Option<String> {
        let tree = tree(src);
        Resolver::new(&NoImports)
            .resolve(&at(&tree, line, column))
            .unwrap()
            .map(|n| n.text())
    }

    #[test]
    fn variable_resolves_to_bind_body() {
        assert_eq!(resolve_text("local a = {x: 1};\na", 2, 1).as_deref(), Some("{x: 1}"));
    }

    #[test]
    fn indirections_are_followed() {
        assert_eq!(resolve_text("local a = {x: 1}, b = a;\nb", 2, 1).as_deref(), Some("{x: 1}"));
        assert_eq!(resolve_text("local o = ({a: 1});\no.a", 2, 3).as_deref(), Some("1"));
    }

    #[test]
    fn merge_is_right_biased() {
        let tree = tree("local m = {a: 1, b: 2} + {b: 3, c: 4};\nm.b");
        let resolver = Resolver::new(&NoImports);
        let b = resolver.resolve(&at(&tree, 2, 3)).unwrap().unwrap();
        assert_eq!(b.text(), "3");

        let var = at(&tree, 2, 1).parent().unwrap();
        let fields = resolver.field_set(&var).unwrap().unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(fields.is_merged());
    }

    #[test]
    fn object_application_merges() {
        assert_eq!(
            resolve_text("local base = {a: 1};\n(base { b: 2 }).a", 2, 17).as_deref(),
            Some("1")
        );
    }

    #[test]
    fn parameters_are_free() {
        let tree = tree("function(x) x");
        let resolution = Resolver::new(&NoImports).resolution(&at(&tree, 1, 13)).unwrap();
        let Resolution::Free(site) = resolution else {
            panic!("expected a free variable, got {resolution:?}");
        };
        assert!(matches!(site.kind(), NodeKind::FunctionParam { .. }));
    }

    #[test]
    fn unbound_and_missing() {
        let resolver = Resolver::new(&NoImports);
        let unbound = tree("foo");
        assert_eq!(resolver.resolution(&at(&unbound, 1, 1)).unwrap(), Resolution::Unbound);

        let missing = tree("local o = {a: 1};\no.z");
        assert_eq!(resolver.resolution(&at(&missing, 2, 3)).unwrap(), Resolution::MissingField);

        let scalar = tree("local n = 1;\nn.z");
        assert_eq!(resolver.resolution(&at(&scalar, 2, 3)).unwrap(), Resolution::Unresolvable);
    }

    #[test]
    fn missing_field_in_merge_is_an_internal_error() {
        let tree = tree("local o = {a: 1} + {b: 2};\no.z");
        let err = Resolver::new(&NoImports).resolution(&at(&tree, 2, 3)).unwrap_err();
        assert!(err.message.contains("z"));
    }

    #[test]
    fn non_mixin_binary_is_an_internal_error() {
        let tree = tree("local n = 1 * 2;\nn");
        assert!(Resolver::new(&NoImports).resolution(&at(&tree, 2, 1)).is_err());
    }

    #[test]
    fn cycles_terminate() {
        let tree = tree("local a = b, b = a;\na.x");
        let resolver = Resolver::new(&NoImports);
        assert_eq!(resolver.resolution(&at(&tree, 2, 1)).unwrap(), Resolution::Unresolvable);
        assert_eq!(resolver.resolution(&at(&tree, 2, 3)).unwrap(), Resolution::Unresolvable);
    }

    #[test]
    fn local_bind_resolves_to_itself() {
        let tree = tree("local foo = 1; foo");
        let bind = at(&tree, 1, 8);
        assert_eq!(Resolver::new(&NoImports).resolve(&bind).unwrap(), Some(bind));
    }

    #[test]
    fn resolution_is_deterministic() {
        let tree = tree("local a = {x: {y: 1}};\na.x.y");
        let resolver = Resolver::new(&NoImports);
        let y = at(&tree, 2, 5);
        let first = resolver.resolve(&y).unwrap();
        let second = resolver.resolve(&y).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.map(|n| n.text()).as_deref(), Some("1"));
    }

    #[test]
    fn self_and_dollar() {
        assert_eq!(resolve_text("{ a: 1, b: self.a }", 1, 17).as_deref(), Some("1"));
        assert_eq!(resolve_text("local x = 1; { a: 2, b: $.a }", 1, 27).as_deref(), Some("2"));
    }

    #[test]
    fn string_index_is_a_member_access() {
        let tree = tree("local o = {a: 1};\no['a']");
        let index = at(&tree, 2, 1).parent().unwrap().parent().unwrap();
        assert!(matches!(index.kind(), NodeKind::Index { .. }));
        let value = Resolver::new(&NoImports).resolve(&index).unwrap().unwrap();
        assert_eq!(value.text(), "1");
    }

    #[test]
    fn imports_go_through_the_loader() {
        let lib = tree("{ f: 42 }");
        let loaded = Arc::clone(&lib);
        let loader = move |_: Option<&Path>, path: &str| (path == "lib.libsonnet").then(|| Arc::clone(&loaded));
        let resolver = Resolver::new(&loader);

        let main = tree("local lib = import 'lib.libsonnet';\nlib.f");
        let value = resolver.resolve(&at(&main, 2, 5)).unwrap().unwrap();
        assert_eq!(value.text(), "42");
        assert!(Arc::ptr_eq(&value.tree, &lib));

        let missing = tree("local lib = import 'other.libsonnet';\nlib.f");
        assert_eq!(resolver.resolution(&at(&missing, 2, 5)).unwrap(), Resolution::Unresolvable);
    }

    #[test]
    fn foreign_bindings_resolve_into_their_tree() {
        let good = tree("local foo = {bar: 1};\nfoo");
        let seed = at(&good, 2, 1).env().unwrap().foreign(&good);

        let err = parse("foo.").unwrap_err();
        let mut partial = (**err.rest().unwrap()).clone();
        let root = partial.root();
        annotate(&mut partial, root, None, seed);
        let partial = Arc::new(partial);

        let fields = Resolver::new(&NoImports)
            .field_set(&NodeRef::root(partial))
            .unwrap()
            .unwrap();
        let bar = fields.get("bar").unwrap();
        assert!(Arc::ptr_eq(&bar.node.tree, &good));
    }

    #[test]
    fn defining_construct_climbs_to_the_bind() {
        let first = tree("local f(x) = x + 1;\nf");
        let bind = Resolver::new(&NoImports).resolve(&at(&first, 2, 1)).unwrap().unwrap();
        let construct = defining_construct(&bind);
        assert_eq!(construct.text(), "f(x) = x + 1");

        let tree = tree("local g = function(y) y;\ng");
        let value = Resolver::new(&NoImports).resolve(&at(&tree, 2, 1)).unwrap().unwrap();
        assert!(matches!(value.kind(), NodeKind::Function { .. }));
        assert_eq!(defining_construct(&value).text(), "g = function(y) y");
    }
}
