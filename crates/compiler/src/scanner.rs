//! Lexical scanner.
//!
//! Pull-driven: the compiler asks for one token at a time and the scanner
//! walks the source bytes on demand. Tokens borrow their lexeme from the
//! source string, so they are valid only for the duration of one compile.
//! Lexical errors are not reported here; they travel as `Error` tokens whose
//! lexeme slot carries the diagnostic message, and the compiler reports them
//! when it consumes them.

/// Token kinds: punctuation, literals, keywords, plus the `Error`/`Eof`
/// sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character punctuation.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    // One- or two-character punctuation.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    // Literals.
    Identifier,
    String,
    Number,
    // Keywords.
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
    // Sentinels.
    Error,
    Eof,
}

/// A lexeme pointing into the source buffer (non-owning).
///
/// For `Error` tokens the lexeme carries the diagnostic message instead of a
/// source span.
#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
}

pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Produce the next token. Returns `Eof` indefinitely once the source is
    /// exhausted.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if is_digit(c) {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b';' => self.make_token(TokenKind::Semicolon),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'!' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            b'"' => self.string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.source.as_bytes()[self.current];
        self.current += 1;
        c
    }

    /// Look at the current byte without consuming it; 0 at end of input.
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source.as_bytes()[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source.as_bytes()[self.current + 1]
        }
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source.as_bytes()[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' => {
                    if self.peek_next() == b'/' {
                        // A line comment runs to the end of the line.
                        while self.peek() != b'\n' && !self.is_at_end() {
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'src> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        // The closing quote.
        self.advance();

        // The lexeme excludes the surrounding quotes, so the compiler can
        // intern it as-is. Escapes are not interpreted.
        Token {
            kind: TokenKind::String,
            lexeme: &self.source[self.start + 1..self.current - 1],
            line: self.line,
        }
    }

    fn number(&mut self) -> Token<'src> {
        while is_digit(self.peek()) {
            self.advance();
        }

        // A fractional part needs a digit after the dot; a trailing dot is
        // left for the next token.
        if self.peek() == b'.' && is_digit(self.peek_next()) {
            self.advance();
            while is_digit(self.peek()) {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || is_digit(self.peek()) {
            self.advance();
        }
        self.make_token(self.identifier_kind())
    }

    /// Keyword recognition: dispatch on the first byte (and a second one for
    /// the two branching prefixes), then compare the remainder once.
    fn identifier_kind(&self) -> TokenKind {
        let bytes = self.source.as_bytes();
        match bytes[self.start] {
            b'a' => self.check_keyword(1, "nd", TokenKind::And),
            b'c' => self.check_keyword(1, "lass", TokenKind::Class),
            b'e' => self.check_keyword(1, "lse", TokenKind::Else),
            b'f' if self.current - self.start > 1 => match bytes[self.start + 1] {
                b'a' => self.check_keyword(2, "lse", TokenKind::False),
                b'o' => self.check_keyword(2, "r", TokenKind::For),
                b'u' => self.check_keyword(2, "n", TokenKind::Fun),
                _ => TokenKind::Identifier,
            },
            b'i' => self.check_keyword(1, "f", TokenKind::If),
            b'n' => self.check_keyword(1, "il", TokenKind::Nil),
            b'o' => self.check_keyword(1, "r", TokenKind::Or),
            b'p' => self.check_keyword(1, "rint", TokenKind::Print),
            b'r' => self.check_keyword(1, "eturn", TokenKind::Return),
            b's' => self.check_keyword(1, "uper", TokenKind::Super),
            b't' if self.current - self.start > 1 => match bytes[self.start + 1] {
                b'h' => self.check_keyword(2, "is", TokenKind::This),
                b'r' => self.check_keyword(2, "ue", TokenKind::True),
                _ => TokenKind::Identifier,
            },
            b'v' => self.check_keyword(1, "ar", TokenKind::Var),
            b'w' => self.check_keyword(1, "hile", TokenKind::While),
            _ => TokenKind::Identifier,
        }
    }

    fn check_keyword(&self, offset: usize, rest: &str, kind: TokenKind) -> TokenKind {
        let lexeme = &self.source[self.start..self.current];
        if lexeme.len() == offset + rest.len() && &lexeme[offset..] == rest {
            kind
        } else {
            TokenKind::Identifier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str) -> Vec<Token<'_>> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan_all(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("(){},.-+;/*"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Semicolon,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_one_or_two_character_operators() {
        assert_eq!(
            kinds("! != = == > >= < <="),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_literals() {
        let tokens = scan_all("123 45.67");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].lexeme, "45.67");
    }

    #[test]
    fn test_trailing_dot_is_not_consumed() {
        let tokens = scan_all("123.");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_string_lexeme_excludes_quotes() {
        let tokens = scan_all("\"hello\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "hello");
    }

    #[test]
    fn test_string_spanning_lines_counts_them() {
        let tokens = scan_all("\"a\nb\" 1");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "a\nb");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = scan_all("\"oops");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, "Unterminated string.");
    }

    #[test]
    fn test_keywords_and_near_keywords() {
        assert_eq!(kinds("and")[0], TokenKind::And);
        assert_eq!(kinds("class")[0], TokenKind::Class);
        assert_eq!(kinds("else")[0], TokenKind::Else);
        assert_eq!(kinds("false")[0], TokenKind::False);
        assert_eq!(kinds("for")[0], TokenKind::For);
        assert_eq!(kinds("fun")[0], TokenKind::Fun);
        assert_eq!(kinds("if")[0], TokenKind::If);
        assert_eq!(kinds("nil")[0], TokenKind::Nil);
        assert_eq!(kinds("or")[0], TokenKind::Or);
        assert_eq!(kinds("print")[0], TokenKind::Print);
        assert_eq!(kinds("return")[0], TokenKind::Return);
        assert_eq!(kinds("super")[0], TokenKind::Super);
        assert_eq!(kinds("this")[0], TokenKind::This);
        assert_eq!(kinds("true")[0], TokenKind::True);
        assert_eq!(kinds("var")[0], TokenKind::Var);
        assert_eq!(kinds("while")[0], TokenKind::While);

        // Prefixes and extensions of keywords are plain identifiers.
        assert_eq!(kinds("f")[0], TokenKind::Identifier);
        assert_eq!(kinds("fo")[0], TokenKind::Identifier);
        assert_eq!(kinds("fung")[0], TokenKind::Identifier);
        assert_eq!(kinds("classy")[0], TokenKind::Identifier);
        assert_eq!(kinds("tr")[0], TokenKind::Identifier);
        assert_eq!(kinds("_var")[0], TokenKind::Identifier);
    }

    #[test]
    fn test_comments_and_whitespace_are_skipped() {
        let tokens = scan_all("1 // the rest is noise ((( \n 2");
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let tokens = scan_all("@");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, "Unexpected character.");
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut scanner = Scanner::new("");
        for _ in 0..3 {
            assert_eq!(scanner.next_token().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn test_line_numbers() {
        let tokens = scan_all("1\n2\n\n3");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }
}
