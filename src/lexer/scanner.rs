//! Lexer for QuonkScript source code.
//!
//! A single forward cursor over the source bytes, producing one token per
//! `next_token` call. End of input is signalled by a sentinel EOF token.
//! Illegal characters and unterminated strings become `TokenKind::Illegal`
//! tokens that flow to the parser, which rejects them at their point of use.

use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

/// The lexer transforms source code into a stream of tokens.
pub struct Lexer<'a> {
    source: &'a [u8],
    position: usize,
    line: usize,
    column: usize,
    start_pos: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.mark_start();

        let Some(c) = self.advance() else {
            return Token::eof(self.position, self.line, self.column);
        };

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b'[' => self.make_token(TokenKind::LeftBracket),
            b']' => self.make_token(TokenKind::RightBracket),
            b',' => self.make_token(TokenKind::Comma),
            b':' => self.make_token(TokenKind::Colon),
            b';' => self.make_token(TokenKind::Semicolon),
            b'.' => self.make_token(TokenKind::Dot),

            b'+' => self.make_token(TokenKind::Plus),
            b'-' => self.make_token(TokenKind::Minus),
            b'*' => self.make_token(TokenKind::Star),
            b'/' => self.make_token(TokenKind::Slash),
            b'%' => self.make_token(TokenKind::Percent),

            // Two-character operators formed by one-character lookahead
            b'=' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenKind::EqualEqual)
                } else {
                    self.make_token(TokenKind::Assign)
                }
            }
            b'!' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenKind::BangEqual)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            b'<' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenKind::LessEqual)
                } else {
                    self.make_token(TokenKind::Less)
                }
            }
            b'>' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenKind::GreaterEqual)
                } else {
                    self.make_token(TokenKind::Greater)
                }
            }
            b'&' => {
                if self.match_byte(b'&') {
                    self.make_token(TokenKind::And)
                } else {
                    self.make_token(TokenKind::Illegal("&".to_string()))
                }
            }
            b'|' => {
                if self.match_byte(b'|') {
                    self.make_token(TokenKind::Or)
                } else {
                    self.make_token(TokenKind::Illegal("|".to_string()))
                }
            }

            b'"' => self.scan_string(),

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_ascii_alphabetic() || c == b'_' => self.scan_identifier(),

            c => self.make_token(TokenKind::Illegal((c as char).to_string())),
        }
    }

    /// Scan the whole source, EOF token included. Convenience for tests.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    // --- Cursor helpers ---

    fn peek(&self) -> Option<u8> {
        self.source.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.position += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark_start(&mut self) {
        self.start_pos = self.position;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    fn current_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.position,
            self.start_line,
            self.start_column,
        )
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.current_span())
    }

    fn lexeme(&self) -> &str {
        // The lexer only ever slices at ASCII boundaries it scanned itself.
        std::str::from_utf8(&self.source[self.start_pos..self.position]).unwrap_or("")
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.advance();
        }
    }

    // --- Scanners ---

    /// Identifiers are a maximal run of `[A-Za-z_]`; keywords are looked up
    /// after the run is read.
    fn scan_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let lexeme = self.lexeme();
        match TokenKind::keyword(lexeme) {
            Some(kind) => self.make_token(kind),
            None => {
                let name = lexeme.to_string();
                self.make_token(TokenKind::Identifier(name))
            }
        }
    }

    /// A maximal digit run; a `.` is consumed only when followed by another
    /// digit, and its presence selects Float over Int.
    fn scan_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance(); // the dot
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let lexeme = self.lexeme();
        if is_float {
            match lexeme.parse::<f64>() {
                Ok(value) => self.make_token(TokenKind::Float(value)),
                Err(_) => {
                    let lexeme = lexeme.to_string();
                    self.make_token(TokenKind::Illegal(lexeme))
                }
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => self.make_token(TokenKind::Int(value)),
                Err(_) => {
                    let lexeme = lexeme.to_string();
                    self.make_token(TokenKind::Illegal(lexeme))
                }
            }
        }
    }

    /// Matched double quotes with no escape processing: the literal is the
    /// raw inner byte range. A string the input ends inside becomes an
    /// Illegal token.
    fn scan_string(&mut self) -> Token {
        let content_start = self.position;
        loop {
            match self.peek() {
                None => {
                    let rest = String::from_utf8_lossy(&self.source[self.start_pos..]).into_owned();
                    return self.make_token(TokenKind::Illegal(rest));
                }
                Some(b'"') => {
                    let value =
                        String::from_utf8_lossy(&self.source[content_start..self.position])
                            .into_owned();
                    self.advance(); // closing quote
                    return self.make_token(TokenKind::Str(value));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_next_token() {
        let source = r#"mut five = 5;
const pi = 3.14;
const add = func(x, y) { x + y; };
mut result = add(five, 10);
!-/*5;
5 < 10 > 5;
if (5 <= 10) { return true; } else { return false; }
10 == 10; 10 != 9;
"foobar" "foo bar"
[1, 2];
{"foo": "bar"}
a && b || c;
for (i < 3) { i = i + 1; }
"#;

        use TokenKind::*;
        let expected = vec![
            Mut,
            Identifier("five".into()),
            Assign,
            Int(5),
            Semicolon,
            Const,
            Identifier("pi".into()),
            Assign,
            Float(3.14),
            Semicolon,
            Const,
            Identifier("add".into()),
            Assign,
            Func,
            LeftParen,
            Identifier("x".into()),
            Comma,
            Identifier("y".into()),
            RightParen,
            LeftBrace,
            Identifier("x".into()),
            Plus,
            Identifier("y".into()),
            Semicolon,
            RightBrace,
            Semicolon,
            Mut,
            Identifier("result".into()),
            Assign,
            Identifier("add".into()),
            LeftParen,
            Identifier("five".into()),
            Comma,
            Int(10),
            RightParen,
            Semicolon,
            Bang,
            Minus,
            Slash,
            Star,
            Int(5),
            Semicolon,
            Int(5),
            Less,
            Int(10),
            Greater,
            Int(5),
            Semicolon,
            If,
            LeftParen,
            Int(5),
            LessEqual,
            Int(10),
            RightParen,
            LeftBrace,
            Return,
            True,
            Semicolon,
            RightBrace,
            Else,
            LeftBrace,
            Return,
            False,
            Semicolon,
            RightBrace,
            Int(10),
            EqualEqual,
            Int(10),
            Semicolon,
            Int(10),
            BangEqual,
            Int(9),
            Semicolon,
            Str("foobar".into()),
            Str("foo bar".into()),
            LeftBracket,
            Int(1),
            Comma,
            Int(2),
            RightBracket,
            Semicolon,
            LeftBrace,
            Str("foo".into()),
            Colon,
            Str("bar".into()),
            RightBrace,
            Identifier("a".into()),
            And,
            Identifier("b".into()),
            Or,
            Identifier("c".into()),
            Semicolon,
            For,
            LeftParen,
            Identifier("i".into()),
            Less,
            Int(3),
            RightParen,
            LeftBrace,
            Identifier("i".into()),
            Assign,
            Identifier("i".into()),
            Plus,
            Int(1),
            Semicolon,
            RightBrace,
            Eof,
        ];

        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn test_lone_ampersand_and_pipe_are_illegal() {
        assert_eq!(
            kinds("a & b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Illegal("&".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
        assert!(matches!(kinds("|")[0], TokenKind::Illegal(_)));
    }

    #[test]
    fn test_number_boundaries() {
        // A dot not followed by a digit ends the number.
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Int(1),
                TokenKind::Dot,
                TokenKind::Identifier("x".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("2.5")[0], TokenKind::Float(2.5));
    }

    #[test]
    fn test_unterminated_string_is_illegal() {
        let tokens = kinds("\"abc");
        assert_eq!(tokens[0], TokenKind::Illegal("\"abc".into()));
        assert_eq!(tokens[1], TokenKind::Eof);
    }

    #[test]
    fn test_line_tracking() {
        let mut lexer = Lexer::new("mut a = 1;\nmut b = 2;");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[0].line(), 1);
        let b_decl = &tokens[5];
        assert_eq!(b_decl.kind, TokenKind::Mut);
        assert_eq!(b_decl.line(), 2);
    }

    #[test]
    fn test_keywords_are_reserved() {
        assert_eq!(kinds("macro")[0], TokenKind::Macro);
        assert_eq!(kinds("elseif")[0], TokenKind::Elseif);
        assert_eq!(kinds("macros")[0], TokenKind::Identifier("macros".into()));
    }
}
