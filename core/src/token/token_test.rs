#[cfg(test)]
mod tests {
    use crate::token::{Position, Token, TokenKind, Tokenizer};

    fn kinds(src: &str) -> Vec<TokenKind> {
        Tokenizer::tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    fn texts(src: &str) -> Vec<String> {
        Tokenizer::tokenize(src)
            .into_iter()
            .filter(|t| t.kind != TokenKind::EndOfFile)
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn basic() {
        let t1 = kinds(r#"{ a: 1.5, "b": 'c', c: [true, false, null] }"#);
        let e1 = vec![
            TokenKind::BraceL,
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Number,
            TokenKind::Comma,
            TokenKind::StringDouble,
            TokenKind::Operator,
            TokenKind::StringSingle,
            TokenKind::Comma,
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::BracketL,
            TokenKind::True,
            TokenKind::Comma,
            TokenKind::False,
            TokenKind::Comma,
            TokenKind::Null,
            TokenKind::BracketR,
            TokenKind::BraceR,
            TokenKind::EndOfFile,
        ];
        assert_eq!(t1, e1);
    }

    #[test]
    fn empty_input_has_end_of_file() {
        let tokens = Tokenizer::tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EndOfFile);
        assert_eq!(tokens[0].span.start, Position::start());
    }

    #[test]
    fn keywords() {
        let t = kinds("assert else error for function if import importstr in local self super tailstrict then $");
        let e = vec![
            TokenKind::Assert,
            TokenKind::Else,
            TokenKind::Error,
            TokenKind::For,
            TokenKind::Function,
            TokenKind::If,
            TokenKind::Import,
            TokenKind::ImportStr,
            TokenKind::In,
            TokenKind::Local,
            TokenKind::SelfRef,
            TokenKind::Super,
            TokenKind::TailStrict,
            TokenKind::Then,
            TokenKind::Dollar,
            TokenKind::EndOfFile,
        ];
        assert_eq!(t, e);
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        let tokens = Tokenizer::tokenize("locals iffy selfish");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].text, "locals");
    }

    #[test]
    fn operators_are_greedy() {
        assert_eq!(texts("a ::: b :: c : d"), vec!["a", ":::", "b", "::", "c", ":", "d"]);
        assert_eq!(texts("a +: b +:: c"), vec!["a", "+:", "b", "+::", "c"]);
        assert_eq!(texts("x <= y >= z << 1 >> 2"), vec!["x", "<=", "y", ">=", "z", "<<", "1", ">>", "2"]);
        assert_eq!(texts("x && y || !z"), vec!["x", "&&", "y", "||", "!", "z"]);
    }

    #[test]
    fn trailing_unary_is_split_off() {
        assert_eq!(texts("x==-1"), vec!["x", "==", "-", "1"]);
        assert_eq!(texts("{a:-1}"), vec!["{", "a", ":", "-", "1", "}"]);
        assert_eq!(texts("a!=!b"), vec!["a", "!=", "!", "b"]);
    }

    #[test]
    fn comments_are_retained() {
        let tokens = Tokenizer::tokenize("# hash\n// cpp\n/* block */ x");
        let k: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::CommentHash,
                TokenKind::CommentCpp,
                TokenKind::CommentC,
                TokenKind::Identifier,
                TokenKind::EndOfFile
            ]
        );
        assert_eq!(tokens[0].text, "hash");
        assert_eq!(tokens[1].text, "cpp");
        assert_eq!(tokens[2].text, "block");
    }

    #[test]
    fn operator_run_stops_at_comment() {
        assert_eq!(texts("a +// note\nb"), vec!["a", "+", "note", "b"]);
    }

    #[test]
    fn string_escapes() {
        let tokens = Tokenizer::tokenize(r#""a\n\"b\u0041" 'it\'s'"#);
        assert_eq!(tokens[0].kind, TokenKind::StringDouble);
        assert_eq!(tokens[0].text, "a\n\"bA");
        assert_eq!(tokens[1].kind, TokenKind::StringSingle);
        assert_eq!(tokens[1].text, "it's");
    }

    #[test]
    fn surrogate_pair_escape() {
        let tokens = Tokenizer::tokenize(r#""\ud83d\ude00""#);
        assert_eq!(tokens[0].text, "\u{1F600}");
    }

    #[test]
    fn verbatim_strings() {
        let tokens = Tokenizer::tokenize(r#"@"C:\path ""q""" @'x'"#);
        assert_eq!(tokens[0].kind, TokenKind::VerbatimStringDouble);
        assert_eq!(tokens[0].text, r#"C:\path "q""#);
        assert_eq!(tokens[1].kind, TokenKind::VerbatimStringSingle);
    }

    #[test]
    fn text_block() {
        let src = "|||\n  line one\n    indented\n\n  last\n|||";
        let tokens = Tokenizer::tokenize(src);
        assert_eq!(tokens[0].kind, TokenKind::StringBlock);
        assert_eq!(tokens[0].text, "line one\n  indented\n\nlast\n");
        assert_eq!(tokens[1].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn text_block_chomped() {
        let tokens = Tokenizer::tokenize("|||-\n  abc\n|||");
        assert_eq!(tokens[0].text, "abc");
    }

    #[test]
    fn numbers() {
        assert_eq!(texts("0 12 3.25 1e3 2.5E-2"), vec!["0", "12", "3.25", "1e3", "2.5e-2"]);
    }

    #[test]
    fn malformed_number_is_invalid_token() {
        let tokens = Tokenizer::tokenize("1. + 2");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert!(tokens[0].text.contains("decimal point"));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn unterminated_string_is_invalid_token() {
        let tokens = Tokenizer::tokenize("{ a: \"oops }");
        let invalid: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Invalid).collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].text, "Unterminated String");
        assert_eq!(invalid[0].span.start, Position::at(1, 6));
    }

    #[test]
    fn unknown_character_is_invalid_token() {
        let tokens = Tokenizer::tokenize("a ` b");
        assert_eq!(tokens[1].kind, TokenKind::Invalid);
        assert!(tokens[1].text.contains('`'));
    }

    #[test]
    fn spans_track_lines_and_columns() {
        let tokens = Tokenizer::tokenize("{\n  property1: foo,\n}");
        let prop = &tokens[1];
        assert_eq!(prop.text, "property1");
        assert_eq!(prop.span.start, Position::at(2, 3));
        assert_eq!(prop.span.end, Position::at(2, 12));
        assert_eq!(prop.span.start.offset, 4);
        assert_eq!(prop.span.end.offset, 13);
    }

    #[test]
    fn token_display() {
        let tokens = Tokenizer::tokenize("foo +");
        assert_eq!(tokens[0].to_string(), "(IDENTIFIER, \"foo\")");
        assert_eq!(tokens[1].to_string(), "(OPERATOR, \"+\")");
        assert_eq!(tokens[2].to_string(), "end of file");
    }
}
