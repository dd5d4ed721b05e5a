use std::fmt;

use crate::token::{Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    BraceL,    // {
    BraceR,    // }
    BracketL,  // [
    BracketR,  // ]
    Comma,     // ,
    Dollar,    // $
    Dot,       // .
    ParenL,    // (
    ParenR,    // )
    Semicolon, // ;
    Identifier,
    Number,
    Operator, // any run of operator chars, see `Tokenizer::lex_operator`
    StringDouble,
    StringSingle,
    StringBlock,          // |||
    VerbatimStringDouble, // @"..."
    VerbatimStringSingle, // @'...'
    // Keywords
    Assert,
    Else,
    Error,
    False,
    For,
    Function,
    If,
    Import,
    ImportStr,
    ImportBin,
    In,
    Local,
    Null,
    SelfRef,
    Super,
    TailStrict,
    Then,
    True,
    // Comments are kept so the parser can attach them to binds and fields
    CommentC,    // /* */
    CommentCpp,  // //
    CommentHash, // #
    /// Malformed input. `text` carries the lexer's message.
    Invalid,
    EndOfFile,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::CommentC | TokenKind::CommentCpp | TokenKind::CommentHash)
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::StringDouble
                | TokenKind::StringSingle
                | TokenKind::StringBlock
                | TokenKind::VerbatimStringDouble
                | TokenKind::VerbatimStringSingle
        )
    }

    fn keyword(id: &str) -> Option<TokenKind> {
        let kind = match id {
            "assert" => TokenKind::Assert,
            "else" => TokenKind::Else,
            "error" => TokenKind::Error,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "importstr" => TokenKind::ImportStr,
            "importbin" => TokenKind::ImportBin,
            "in" => TokenKind::In,
            "local" => TokenKind::Local,
            "null" => TokenKind::Null,
            "self" => TokenKind::SelfRef,
            "super" => TokenKind::Super,
            "tailstrict" => TokenKind::TailStrict,
            "then" => TokenKind::Then,
            "true" => TokenKind::True,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::BraceL => "\"{\"",
            TokenKind::BraceR => "\"}\"",
            TokenKind::BracketL => "\"[\"",
            TokenKind::BracketR => "\"]\"",
            TokenKind::Comma => "\",\"",
            TokenKind::Dollar => "\"$\"",
            TokenKind::Dot => "\".\"",
            TokenKind::ParenL => "\"(\"",
            TokenKind::ParenR => "\")\"",
            TokenKind::Semicolon => "\";\"",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::Operator => "OPERATOR",
            TokenKind::StringDouble => "STRING_DOUBLE",
            TokenKind::StringSingle => "STRING_SINGLE",
            TokenKind::StringBlock => "STRING_BLOCK",
            TokenKind::VerbatimStringDouble => "VERBATIM_STRING_DOUBLE",
            TokenKind::VerbatimStringSingle => "VERBATIM_STRING_SINGLE",
            TokenKind::Assert => "assert",
            TokenKind::Else => "else",
            TokenKind::Error => "error",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::ImportStr => "importstr",
            TokenKind::ImportBin => "importbin",
            TokenKind::In => "in",
            TokenKind::Local => "local",
            TokenKind::Null => "null",
            TokenKind::SelfRef => "self",
            TokenKind::Super => "super",
            TokenKind::TailStrict => "tailstrict",
            TokenKind::Then => "then",
            TokenKind::True => "true",
            TokenKind::CommentC => "C_COMMENT",
            TokenKind::CommentCpp => "CPP_COMMENT",
            TokenKind::CommentHash => "HASH_COMMENT",
            TokenKind::Invalid => "INVALID",
            TokenKind::EndOfFile => "end of file",
        };
        f.write_str(s)
    }
}

/// A lexed token. For strings `text` is the unescaped value, for comments the
/// body without its markers, for everything else the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier | TokenKind::Number | TokenKind::Operator => {
                write!(f, "({}, \"{}\")", self.kind, self.text)
            }
            _ if self.kind.is_string() => write!(f, "({}, \"{}\")", self.kind, self.text),
            _ => write!(f, "{}", self.kind),
        }
    }
}

const ASCII_WHITESPACE: u8 = 1 << 0;
const ASCII_DIGIT: u8 = 1 << 1;
const ASCII_IDENT_START: u8 = 1 << 2;
const ASCII_IDENT_CONT: u8 = 1 << 3;
const ASCII_OPERATOR: u8 = 1 << 4;

const fn build_ascii_class() -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < 128 {
        let c = i as u8;
        if matches!(c, b' ' | b'\t' | b'\n' | b'\r') {
            table[i] |= ASCII_WHITESPACE;
        }
        if c >= b'0' && c <= b'9' {
            table[i] |= ASCII_DIGIT | ASCII_IDENT_CONT;
        }
        if (c >= b'a' && c <= b'z') || (c >= b'A' && c <= b'Z') || c == b'_' {
            table[i] |= ASCII_IDENT_START | ASCII_IDENT_CONT;
        }
        if matches!(
            c,
            b'!' | b':' | b'~' | b'+' | b'-' | b'&' | b'|' | b'^' | b'=' | b'<' | b'>' | b'*' | b'/' | b'%'
        ) {
            table[i] |= ASCII_OPERATOR;
        }
        i += 1;
    }
    table
}

const ASCII_CLASS: [u8; 128] = build_ascii_class();

#[inline]
fn ascii_flags(c: char) -> u8 {
    if c.is_ascii() { ASCII_CLASS[c as usize] } else { 0 }
}

#[inline]
fn is_space_char(c: char) -> bool {
    ascii_flags(c) & ASCII_WHITESPACE != 0
}

#[inline]
fn is_ident_start(c: char) -> bool {
    ascii_flags(c) & ASCII_IDENT_START != 0
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    ascii_flags(c) & ASCII_IDENT_CONT != 0
}

#[inline]
fn is_operator_char(c: char) -> bool {
    ascii_flags(c) & ASCII_OPERATOR != 0
}

struct LexError {
    message: String,
    start: Position,
}

type LexResult = std::result::Result<(), LexError>;

/// Scans source text into tokens. Never fails: the first malformed construct
/// becomes a single `Invalid` token and lexing stops there. The stream always
/// ends with `EndOfFile`.
pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
    len: usize,
    tokens: Vec<Token>,
    line: u32,
    column: u32,
}

impl Tokenizer {
    pub fn tokenize(s: &str) -> Vec<Token> {
        let mut t = Tokenizer::new(s);
        if let Err(err) = t.lex() {
            let end = t.current_position();
            t.tokens.push(Token::new(TokenKind::Invalid, err.message, Span::new(err.start, end)));
        }
        let eof = t.current_position();
        t.tokens.push(Token::new(TokenKind::EndOfFile, "", Span::single(eof)));
        t.tokens
    }

    fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        Self {
            len: chars.len(),
            chars,
            idx: 0,
            tokens: Vec::with_capacity(input.len() / 4),
            line: 1,
            column: 1,
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.idx)
    }

    fn eof(&self) -> bool {
        self.idx >= self.len
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut i = self.idx;
        for c in s.chars() {
            if i >= self.len || self.chars[i] != c {
                return false;
            }
            i += 1;
        }
        true
    }

    fn advance_char(&mut self) {
        if !self.eof() && self.chars[self.idx] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.idx += 1;
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance_char();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.idx < self.len && is_space_char(self.chars[self.idx]) {
            self.advance_char();
        }
    }

    fn err<T>(&self, start: Position, msg: impl Into<String>) -> std::result::Result<T, LexError> {
        Err(LexError {
            message: msg.into(),
            start,
        })
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: Position) {
        let end = self.current_position();
        self.tokens.push(Token::new(kind, text, Span::new(start, end)));
    }

    fn single(&mut self, kind: TokenKind, start: Position) {
        let c = self.chars[self.idx];
        self.advance_char();
        self.push(kind, c.to_string(), start);
    }

    fn lex(&mut self) -> LexResult {
        loop {
            self.skip_whitespace();
            if self.eof() {
                return Ok(());
            }
            let start = self.current_position();
            let c = self.chars[self.idx];
            match c {
                '{' => self.single(TokenKind::BraceL, start),
                '}' => self.single(TokenKind::BraceR, start),
                '[' => self.single(TokenKind::BracketL, start),
                ']' => self.single(TokenKind::BracketR, start),
                '(' => self.single(TokenKind::ParenL, start),
                ')' => self.single(TokenKind::ParenR, start),
                ',' => self.single(TokenKind::Comma, start),
                '.' => self.single(TokenKind::Dot, start),
                ';' => self.single(TokenKind::Semicolon, start),
                '$' => self.single(TokenKind::Dollar, start),
                '"' | '\'' => self.lex_string(c, start)?,
                '@' => self.lex_verbatim_string(start)?,
                '0'..='9' => self.lex_number(start)?,
                '#' => self.lex_line_comment(TokenKind::CommentHash, 1, start),
                '/' if self.peek_at(1) == Some('/') => self.lex_line_comment(TokenKind::CommentCpp, 2, start),
                '/' if self.peek_at(1) == Some('*') => self.lex_block_comment(start)?,
                '|' if self.starts_with("|||") => self.lex_text_block(start)?,
                c if is_ident_start(c) => self.lex_identifier(start),
                c if is_operator_char(c) => self.lex_operator(start),
                _ => return self.err(start, format!("Could not lex the character '{}'", c)),
            }
        }
    }

    fn lex_identifier(&mut self, start: Position) {
        let mut id = String::new();
        while !self.eof() && is_ident_continue(self.chars[self.idx]) {
            id.push(self.chars[self.idx]);
            self.advance_char();
        }
        let kind = TokenKind::keyword(&id).unwrap_or(TokenKind::Identifier);
        self.push(kind, id, start);
    }

    fn lex_number(&mut self, start: Position) -> LexResult {
        let mut num = String::new();
        self.take_digits(&mut num);

        if self.peek_at(0) == Some('.') {
            num.push('.');
            self.advance_char();
            if !matches!(self.peek_at(0), Some(c) if c.is_ascii_digit()) {
                return self.err(start, "Couldn't lex number, junk after decimal point");
            }
            self.take_digits(&mut num);
        }

        if matches!(self.peek_at(0), Some('e' | 'E')) {
            num.push('e');
            self.advance_char();
            if let Some(sign @ ('+' | '-')) = self.peek_at(0) {
                num.push(sign);
                self.advance_char();
            }
            if !matches!(self.peek_at(0), Some(c) if c.is_ascii_digit()) {
                return self.err(start, "Couldn't lex number, junk after 'E'");
            }
            self.take_digits(&mut num);
        }

        self.push(TokenKind::Number, num, start);
        Ok(())
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(c) = self.peek_at(0) {
            if !c.is_ascii_digit() {
                break;
            }
            out.push(c);
            self.advance_char();
        }
    }

    fn lex_string(&mut self, quote: char, start: Position) -> LexResult {
        self.advance_char(); // opening quote
        let mut content = String::new();

        loop {
            let Some(c) = self.peek_at(0) else {
                return self.err(start, "Unterminated String");
            };
            if c == quote {
                self.advance_char();
                break;
            }
            if c != '\\' {
                content.push(c);
                self.advance_char();
                continue;
            }

            self.advance_char(); // backslash
            let Some(escaped) = self.peek_at(0) else {
                return self.err(start, "Unterminated String");
            };
            self.advance_char();
            match escaped {
                '"' | '\'' | '\\' | '/' => content.push(escaped),
                'b' => content.push('\u{8}'),
                'f' => content.push('\u{c}'),
                'n' => content.push('\n'),
                'r' => content.push('\r'),
                't' => content.push('\t'),
                'u' => {
                    let ch = self.lex_unicode_escape(start)?;
                    content.push(ch);
                }
                other => {
                    return self.err(start, format!("Unknown escape sequence in string literal: '\\{}'", other));
                }
            }
        }

        let kind = if quote == '"' {
            TokenKind::StringDouble
        } else {
            TokenKind::StringSingle
        };
        self.push(kind, content, start);
        Ok(())
    }

    fn lex_hex4(&mut self, start: Position) -> std::result::Result<u32, LexError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(digit) = self.peek_at(0).and_then(|c| c.to_digit(16)) else {
                return self.err(start, "Unicode escape sequence was malformed");
            };
            code = code * 16 + digit;
            self.advance_char();
        }
        Ok(code)
    }

    fn lex_unicode_escape(&mut self, start: Position) -> std::result::Result<char, LexError> {
        let high = self.lex_hex4(start)?;
        if (0xD800..0xDC00).contains(&high) && self.starts_with("\\u") {
            self.advance_by(2);
            let low = self.lex_hex4(start)?;
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                if let Some(ch) = char::from_u32(code) {
                    return Ok(ch);
                }
            }
            return self.err(start, "Invalid unicode surrogate pair");
        }
        match char::from_u32(high) {
            Some(ch) => Ok(ch),
            None => self.err(start, "Invalid unicode code point"),
        }
    }

    fn lex_verbatim_string(&mut self, start: Position) -> LexResult {
        let quote = match self.peek_at(1) {
            Some(q @ ('"' | '\'')) => q,
            _ => return self.err(start, "Couldn't lex verbatim string, junk after '@'"),
        };
        self.advance_by(2);

        let mut content = String::new();
        loop {
            let Some(c) = self.peek_at(0) else {
                return self.err(start, "Unterminated String");
            };
            if c == quote {
                if self.peek_at(1) == Some(quote) {
                    content.push(quote);
                    self.advance_by(2);
                    continue;
                }
                self.advance_char();
                break;
            }
            content.push(c);
            self.advance_char();
        }

        let kind = if quote == '"' {
            TokenKind::VerbatimStringDouble
        } else {
            TokenKind::VerbatimStringSingle
        };
        self.push(kind, content, start);
        Ok(())
    }

    /// `|||` text block: the indentation of the first line is stripped from
    /// every line; the block ends at a `|||` indented less than that.
    fn lex_text_block(&mut self, start: Position) -> LexResult {
        self.advance_by(3);
        let chomp = self.peek_at(0) == Some('-');
        if chomp {
            self.advance_char();
        }

        while matches!(self.peek_at(0), Some(' ' | '\t' | '\r')) {
            self.advance_char();
        }
        if self.peek_at(0) != Some('\n') {
            return self.err(start, "Text block syntax requires new line after |||.");
        }
        self.advance_char();

        let mut content = String::new();
        while self.peek_at(0) == Some('\n') {
            content.push('\n');
            self.advance_char();
        }

        let indent: Vec<char> = self.chars[self.idx..]
            .iter()
            .take_while(|c| matches!(c, ' ' | '\t'))
            .copied()
            .collect();
        if indent.is_empty() {
            return self.err(start, "Text block's first line must start with whitespace.");
        }

        loop {
            self.advance_by(indent.len());
            while let Some(c) = self.peek_at(0) {
                if c == '\n' {
                    break;
                }
                content.push(c);
                self.advance_char();
            }
            if self.eof() {
                return self.err(start, "Unexpected EOF");
            }
            content.push('\n');
            self.advance_char();

            while self.peek_at(0) == Some('\n') {
                content.push('\n');
                self.advance_char();
            }

            if self.chars[self.idx..].starts_with(&indent) {
                continue;
            }

            while matches!(self.peek_at(0), Some(' ' | '\t')) {
                self.advance_char();
            }
            if !self.starts_with("|||") {
                return self.err(start, "Text block not terminated with |||");
            }
            self.advance_by(3);
            break;
        }

        if chomp && content.ends_with('\n') {
            content.pop();
        }
        self.push(TokenKind::StringBlock, content, start);
        Ok(())
    }

    fn lex_line_comment(&mut self, kind: TokenKind, marker_len: usize, start: Position) {
        self.advance_by(marker_len);
        let mut body = String::new();
        while let Some(c) = self.peek_at(0) {
            if c == '\n' {
                break;
            }
            body.push(c);
            self.advance_char();
        }
        self.push(kind, body.trim().to_string(), start);
    }

    fn lex_block_comment(&mut self, start: Position) -> LexResult {
        self.advance_by(2);
        let mut body = String::new();
        loop {
            if self.eof() {
                return self.err(start, "Multi-line comment has no terminating */");
            }
            if self.starts_with("*/") {
                self.advance_by(2);
                break;
            }
            body.push(self.chars[self.idx]);
            self.advance_char();
        }
        self.push(TokenKind::CommentC, body.trim().to_string(), start);
        Ok(())
    }

    /// Greedy operator run. The run stops before a comment opener or a text
    /// block, and a multi-char run never ends in `+ - ~ !` so unary operators
    /// after a binary one (`x==-1`) are split off.
    fn lex_operator(&mut self, start: Position) {
        let mut end = self.idx;
        while end < self.len && is_operator_char(self.chars[end]) {
            if end > self.idx {
                let rest = &self.chars[end..];
                if rest.starts_with(&['/', '/']) || rest.starts_with(&['/', '*']) || rest.starts_with(&['|', '|', '|'])
                {
                    break;
                }
            }
            end += 1;
        }
        while end - self.idx > 1 && matches!(self.chars[end - 1], '+' | '-' | '~' | '!') {
            end -= 1;
        }

        let op: String = self.chars[self.idx..end].iter().collect();
        self.advance_by(end - self.idx);
        self.push(TokenKind::Operator, op, start);
    }
}
