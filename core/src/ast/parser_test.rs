#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, FieldKind, NodeKind, StaticError, Visibility, parse};
    use crate::token::Position;

    fn root_kind(src: &str) -> NodeKind {
        let ast = parse(src).unwrap();
        ast.kind(ast.root()).clone()
    }

    fn parse_err(src: &str) -> StaticError {
        match parse(src) {
            Ok(_) => panic!("expected {src:?} to fail"),
            Err(err) => err,
        }
    }

    #[test]
    fn precedence() {
        let ast = parse("1 + 2 * 3").unwrap();
        let NodeKind::Binary { op, right, .. } = ast.kind(ast.root()) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Plus);
        assert!(matches!(ast.kind(*right), NodeKind::Binary { op: BinaryOp::Mult, .. }));

        let ast = parse("a || b && c == d").unwrap();
        let NodeKind::Binary { op, right, .. } = ast.kind(ast.root()) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Or);
        assert!(matches!(ast.kind(*right), NodeKind::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn unary_binds_looser_than_index() {
        let ast = parse("-a.b").unwrap();
        let NodeKind::Unary { expr, .. } = ast.kind(ast.root()) else {
            panic!("expected unary");
        };
        assert!(matches!(ast.kind(*expr), NodeKind::Index { .. }));
    }

    #[test]
    fn field_key_span() {
        let ast = parse("{\n  property1: foo,\n}").unwrap();
        let NodeKind::Object { fields, trailing_comma } = ast.kind(ast.root()) else {
            panic!("expected object");
        };
        assert!(*trailing_comma);
        let NodeKind::ObjectField(field) = ast.kind(fields[0]) else {
            panic!("expected field");
        };
        assert_eq!(field.kind, FieldKind::Id);
        assert_eq!(field.name.as_deref(), Some("property1"));
        let key = field.key.unwrap();
        assert_eq!(ast.span(key).start, Position::at(2, 3));
        assert_eq!(ast.span(key).end, Position::at(2, 12));
        assert_eq!(ast.text(key), "property1");
    }

    #[test]
    fn node_spans_cover_their_tokens() {
        let ast = parse("local x = 1; x").unwrap();
        let span = ast.span(ast.root());
        assert_eq!(span.start, Position::at(1, 1));
        assert_eq!(span.end, Position::at(1, 15));
        assert_eq!(ast.text(ast.root()), "local x = 1; x");
    }

    #[test]
    fn field_visibility_and_sugar() {
        let ast = parse("{ a:: 1, b+: 2, c::: 3, f(x): x, local l = 4, assert true : 'm' }").unwrap();
        let NodeKind::Object { fields, .. } = ast.kind(ast.root()) else {
            panic!("expected object");
        };
        let fields: Vec<_> = fields
            .iter()
            .map(|f| match ast.kind(*f) {
                NodeKind::ObjectField(field) => field.clone(),
                _ => panic!("expected field"),
            })
            .collect();
        assert_eq!(fields[0].hide, Visibility::Hidden);
        assert!(fields[1].plus_super);
        assert_eq!(fields[2].hide, Visibility::Visible);
        assert_eq!(fields[3].params.as_ref().map(Vec::len), Some(1));
        assert_eq!(fields[4].kind, FieldKind::Local);
        assert_eq!(fields[5].kind, FieldKind::Assert);
        assert!(fields[5].message.is_some());
    }

    #[test]
    fn calls_slices_and_named_args() {
        let ast = parse("f(1, y=2,)[1:2:3]").unwrap();
        let NodeKind::Slice { target, begin, end, step } = ast.kind(ast.root()) else {
            panic!("expected slice");
        };
        assert!(begin.is_some() && end.is_some() && step.is_some());
        let NodeKind::Apply { args, trailing_comma, .. } = ast.kind(*target) else {
            panic!("expected apply");
        };
        assert!(*trailing_comma);
        assert!(matches!(ast.kind(args[1]), NodeKind::NamedArg { name, .. } if name == "y"));

        assert!(matches!(root_kind("a[::2]"), NodeKind::Slice { begin: None, end: None, step: Some(_), .. }));
        assert!(matches!(root_kind("f(x) tailstrict"), NodeKind::Apply { tailstrict: true, .. }));
    }

    #[test]
    fn positional_after_named_is_rejected() {
        let err = parse_err("f(a=1, 2)");
        assert!(err.message().contains("Positional argument"));
    }

    #[test]
    fn comprehensions() {
        assert!(matches!(root_kind("[x * 2 for x in [1, 2] if x > 1]"), NodeKind::ArrayComp { specs, .. } if specs.len() == 2));
        assert!(matches!(root_kind("{ [k]: 1 for k in ['a', 'b'] }"), NodeKind::ObjectComp { .. }));
        let err = parse_err("{ a: 1 for k in [] }");
        assert!(err.message().contains("[e] fields"));
    }

    #[test]
    fn keyword_expressions() {
        assert!(matches!(root_kind("if a then b else c"), NodeKind::Conditional { otherwise: Some(_), .. }));
        assert!(matches!(root_kind("if a then b"), NodeKind::Conditional { otherwise: None, .. }));
        assert!(matches!(root_kind("function(x, y=1) x"), NodeKind::Function { params, .. } if params.len() == 2));
        assert!(matches!(root_kind("assert a : 'msg'; b"), NodeKind::Assert { message: Some(_), .. }));
        assert!(matches!(root_kind("error 'boom'"), NodeKind::Error { .. }));
        assert!(matches!(root_kind("import 'a.libsonnet'"), NodeKind::Import { .. }));
        assert!(matches!(root_kind("importstr 'a.txt'"), NodeKind::ImportStr { .. }));
        assert!(matches!(root_kind("'x' in super"), NodeKind::InSuper { .. }));
        assert!(matches!(root_kind("super.x"), NodeKind::SuperIndex { id: Some(_), .. }));
        assert!(matches!(root_kind("(1)"), NodeKind::Parens { .. }));
        assert!(matches!(root_kind("{} { a: 1 }"), NodeKind::ApplyBrace { .. }));
    }

    #[test]
    fn heading_comments_attach_to_binds() {
        let ast = parse("// the answer\nlocal x = 42,\n  # second\n  y = 1; x").unwrap();
        let NodeKind::Local { binds, .. } = ast.kind(ast.root()) else {
            panic!("expected local");
        };
        assert_eq!(ast.comments(binds[0]), ["the answer".to_string()]);
        assert_eq!(ast.comments(binds[1]), ["second".to_string()]);
    }

    #[test]
    fn free_variables() {
        let ast = parse("local a = 1; a + b").unwrap();
        assert_eq!(ast.free_vars(ast.root()).iter().collect::<Vec<_>>(), vec!["b"]);

        let ast = parse("function(x) x + y").unwrap();
        assert_eq!(ast.free_vars(ast.root()).iter().collect::<Vec<_>>(), vec!["y"]);

        let ast = parse("[x + z for x in xs]").unwrap();
        assert_eq!(ast.free_vars(ast.root()).iter().collect::<Vec<_>>(), vec!["xs", "z"]);

        let ast = parse("{ local h = 1, a: h + self.b }").unwrap();
        assert!(ast.free_vars(ast.root()).is_empty());
    }

    #[test]
    fn duplicate_field_fails() {
        let err = parse_err("{ a: 1, a: 2 }");
        assert_eq!(err.message(), "Duplicate field: a");
        assert!(err.rest().is_none());
        assert_eq!(err.span().start, Position::at(1, 9));
    }

    #[test]
    fn duplicate_binds_and_params_fail() {
        assert!(parse_err("local a = 1, a = 2; a").message().contains("Duplicate local var"));
        assert!(parse_err("function(x, x) x").message().contains("Duplicate parameter"));
    }

    #[test]
    fn computed_import_fails() {
        let err = parse_err("import 'a' + 'b'");
        assert_eq!(err.message(), "Computed imports are not allowed");
    }

    #[test]
    fn lex_errors_surface_as_static_errors() {
        let err = parse_err("{ a: 1. }");
        assert!(matches!(err, StaticError::Lex { .. }));
        assert!(err.rest().is_none());
    }

    #[test]
    fn trailing_tokens_fail() {
        assert!(parse_err("1 2").message().starts_with("Did not expect"));
    }

    #[test]
    fn dangling_dot_keeps_partial_tree() {
        let err = parse_err("local o = { a: 1 };\no.");
        assert_eq!(err.message(), "Expected token IDENTIFIER but got end of file");
        let rest = err.rest().expect("partial tree");
        let NodeKind::Local { body, .. } = rest.kind(rest.root()) else {
            panic!("expected the binds to be kept around the partial tree");
        };
        assert!(matches!(rest.kind(*body), NodeKind::Var { .. }));
        assert_eq!(rest.text(*body), "o");
        assert!(rest.env(*body).unwrap().contains("o"));
    }

    #[test]
    fn dangling_dot_before_closing_paren() {
        let err = parse_err("local foo = {bar: 1}; foo.)");
        assert!(matches!(err, StaticError::Parse { .. }));
        assert_eq!(err.message(), "Expected token IDENTIFIER but got )");
        let rest = err.rest().expect("partial tree");
        let NodeKind::Local { body, .. } = rest.kind(rest.root()) else {
            panic!("expected local");
        };
        assert_eq!(rest.text(*body), "foo");
    }

    #[test]
    fn dangling_dot_before_malformed_token() {
        let err = parse_err("local foo = {bar: 1}; foo.`");
        assert!(matches!(err, StaticError::Lex { .. }));
        assert!(err.message().contains('`'));
        assert_eq!(err.span().start, Position::at(1, 27));
        let rest = err.rest().expect("partial tree before the bad token");
        let NodeKind::Local { body, .. } = rest.kind(rest.root()) else {
            panic!("expected local");
        };
        assert_eq!(rest.text(*body), "foo");
        assert!(rest.env(*body).unwrap().contains("foo"));
    }

    #[test]
    fn malformed_token_after_complete_expression_has_no_tree() {
        let err = parse_err("local foo = {bar: 1}; foo `");
        assert!(matches!(err, StaticError::Lex { .. }));
        assert!(err.rest().is_none());
    }

    #[test]
    fn dot_above_next_field_takes_its_name() {
        let err = parse_err("local o = {};\n{\n  a: o.\n  b: 2,\n}");
        assert!(matches!(err, StaticError::Parse { .. }));
        assert!(err.message().starts_with("Expected a comma before next field"));
        assert_eq!(err.span().start, Position::at(4, 4));
        assert!(err.rest().is_none());
    }

    #[test]
    fn dangling_dot_without_scope() {
        let err = parse_err("foo.bar.");
        let rest = err.rest().expect("partial tree");
        assert!(matches!(rest.kind(rest.root()), NodeKind::Index { .. }));
        assert_eq!(rest.text(rest.root()), "foo.bar");
    }
}
