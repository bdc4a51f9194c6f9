use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str, checked_extension: bool) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source, checked_extension);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    checked_extension: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, checked_extension: bool) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            checked_extension,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                '\'' => self.lex_char(),
                _ => self.lex_symbol(),
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
        self.error(start, self.offset, "Unterminated block comment");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = match slice {
            "void" => TokenKind::Void,
            "char" => TokenKind::CharKw,
            "short" => TokenKind::Short,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            _ => self
                .checked_keyword(slice)
                .unwrap_or_else(|| TokenKind::Identifier(slice.to_string())),
        };
        self.push_token(kind, start, end);
    }

    fn checked_keyword(&self, slice: &str) -> Option<TokenKind> {
        if !self.checked_extension {
            return None;
        }
        match slice {
            "_For_any" => Some(TokenKind::ForAny),
            "_Ptr" => Some(TokenKind::Ptr),
            "_Array_ptr" => Some(TokenKind::ArrayPtr),
            "_Nt_array_ptr" => Some(TokenKind::NtArrayPtr),
            "_Checked" => Some(TokenKind::Checked),
            "_Unchecked" => Some(TokenKind::Unchecked),
            _ => None,
        }
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let radix = if self.current == Some('0') && matches!(self.peek(), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            16
        } else if self.current == Some('0') && matches!(self.peek(), Some('0'..='7')) {
            self.bump();
            8
        } else {
            10
        };

        let digits_start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_digit(radix) {
                self.bump();
            } else {
                break;
            }
        }
        let digits_end = self.offset;

        // u, l, ul, ll, ull in any case
        while matches!(self.current, Some('u' | 'U' | 'l' | 'L')) {
            self.bump();
        }
        if matches!(self.current, Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
            while matches!(self.current, Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
                self.bump();
            }
            self.error(start, self.offset, "Invalid suffix on integer literal");
            return;
        }

        let end = self.offset;
        let digits = &self.src[digits_start..digits_end];
        if digits.is_empty() && radix == 16 {
            self.error(start, end, "Hexadecimal literal has no digits");
            return;
        }
        let digits = if digits.is_empty() { "0" } else { digits };
        match i128::from_str_radix(digits, radix) {
            Ok(value) => self.push_token(TokenKind::Integer(value), start, end),
            Err(_) => self.error(start, end, "Invalid integer literal"),
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            match ch {
                '"' => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::String(value), start, end);
                    return;
                }
                '\n' => break,
                '\\' => {
                    self.bump();
                    match self.current.map(unescape) {
                        Some(escaped) => {
                            value.push(escaped);
                            self.bump();
                        }
                        None => break,
                    }
                }
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_char(&mut self) {
        let start = self.offset;
        self.bump(); // '
        let Some(ch) = self.current else {
            self.error(start, self.offset, "Unterminated character literal");
            return;
        };
        let value = if ch == '\\' {
            self.bump();
            match self.current {
                Some(escaped) => unescape(escaped),
                None => {
                    self.error(start, self.offset, "Invalid escape in character literal");
                    return;
                }
            }
        } else {
            ch
        };
        self.bump();
        if self.current != Some('\'') {
            self.error(start, self.offset, "Unterminated character literal");
            return;
        }
        self.bump();
        let end = self.offset;
        self.push_token(TokenKind::Char(value), start, end);
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let ch = self.current;
        match ch {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some(';') => self.single(TokenKind::Semi),
            Some('%') => self.single(TokenKind::Percent),
            Some('+') => self.single(TokenKind::Plus),
            Some('*') => self.single(TokenKind::Star),
            Some('/') => self.single(TokenKind::Slash),
            Some('&') => self.one_or_two('&', TokenKind::Ampersand, TokenKind::AmpersandAmpersand),
            Some('!') => self.one_or_two('=', TokenKind::Bang, TokenKind::BangEq),
            Some('=') => self.one_or_two('=', TokenKind::Eq, TokenKind::EqEq),
            Some('<') => self.one_or_two('=', TokenKind::Lt, TokenKind::LtEq),
            Some('>') => self.one_or_two('=', TokenKind::Gt, TokenKind::GtEq),
            Some('-') => self.one_or_two('>', TokenKind::Minus, TokenKind::Arrow),
            Some('|') => {
                self.bump();
                if self.current == Some('|') {
                    self.bump();
                    self.push_token(TokenKind::PipePipe, start, self.offset);
                } else {
                    self.error(start, self.offset, "Bitwise `|` is not supported");
                }
            }
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }

    fn one_or_two(&mut self, second: char, one: TokenKind, two: TokenKind) {
        let start = self.offset;
        self.bump();
        if self.current == Some(second) {
            self.bump();
            self.push_token(two, start, self.offset);
        } else {
            self.push_token(one, start, self.offset);
        }
    }
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }
}
