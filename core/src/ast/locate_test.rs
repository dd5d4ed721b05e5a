#[cfg(test)]
mod tests {
    use crate::ast::{FindFailure, NodeKind, locate, parse};
    use crate::token::Position;

    #[test]
    fn finds_field_key() {
        let ast = parse("{\n  property1: foo,\n}").unwrap();
        let id = locate(&ast, Position::at(2, 5)).unwrap();
        assert!(matches!(ast.kind(id), NodeKind::Identifier { name } if name == "property1"));
        assert_eq!(ast.span(id).start, Position::at(2, 3));
    }

    #[test]
    fn span_ends_are_inclusive() {
        let ast = parse("{\n  property1: foo,\n}").unwrap();
        let at_end = locate(&ast, Position::at(2, 12)).unwrap();
        assert_eq!(ast.text(at_end), "property1");
        let at_start = locate(&ast, Position::at(2, 3)).unwrap();
        assert_eq!(at_end, at_start);
    }

    #[test]
    fn finds_variable_use() {
        let ast = parse("local a = 1;\na + 2").unwrap();
        let id = locate(&ast, Position::at(2, 1)).unwrap();
        assert!(matches!(ast.kind(id), NodeKind::Identifier { name } if name == "a"));
        assert!(matches!(ast.kind(ast.parent(id).unwrap()), NodeKind::Var { .. }));
    }

    #[test]
    fn bind_names_are_terminals() {
        let ast = parse("local foo = 1; foo").unwrap();
        let id = locate(&ast, Position::at(1, 8)).unwrap();
        assert!(matches!(ast.kind(id), NodeKind::LocalBind { name, .. } if name == "foo"));

        let ast = parse("function(arg) arg").unwrap();
        let id = locate(&ast, Position::at(1, 11)).unwrap();
        assert!(matches!(ast.kind(id), NodeKind::FunctionParam { .. }));
    }

    #[test]
    fn past_the_end_is_clamped() {
        let ast = parse("{a: 1}").unwrap();
        let err = locate(&ast, Position::at(5, 1)).unwrap_err();
        let FindFailure::Analyzable { enclosing, terminal } = err else {
            panic!("expected analyzable failure");
        };
        assert_eq!(enclosing, ast.root());
        assert_eq!(terminal.map(|t| ast.text(t)), Some("1".to_string()));
        assert_eq!(err.best_effort(), terminal);
    }

    #[test]
    fn before_the_document_is_unanalyzable() {
        let ast = parse("\n\n  x").unwrap();
        assert_eq!(locate(&ast, Position::at(1, 1)), Err(FindFailure::Unanalyzable));
        assert_eq!(FindFailure::Unanalyzable.best_effort(), None);
    }

    #[test]
    fn gap_inside_import_is_unanalyzable() {
        let ast = parse("import   'a.libsonnet'").unwrap();
        assert_eq!(locate(&ast, Position::at(1, 9)), Err(FindFailure::Unanalyzable));
    }

    #[test]
    fn gap_without_terminal_falls_back_to_enclosing() {
        let ast = parse("{\n\n  a: 1 }").unwrap();
        let err = locate(&ast, Position::at(2, 1)).unwrap_err();
        assert_eq!(
            err,
            FindFailure::Analyzable {
                enclosing: ast.root(),
                terminal: None
            }
        );
        assert_eq!(err.best_effort(), Some(ast.root()));
    }
}
