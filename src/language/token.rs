use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i128),
    Char(char),
    String(String),

    Void,
    CharKw,
    Short,
    Int,
    Long,
    Float,
    Double,
    Return,
    If,
    Else,
    While,

    // Checked C extension keywords.
    ForAny,
    Ptr,
    ArrayPtr,
    NtArrayPtr,
    Checked,
    Unchecked,

    Ampersand,
    AmpersandAmpersand,
    PipePipe,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Comma,
    Semi,
    Arrow,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Integer(value) => format!("integer `{value}`"),
            TokenKind::Char(ch) => format!("character '{ch}'"),
            TokenKind::String(_) => "string literal".into(),
            TokenKind::Eof => "end of file".into(),
            other => format!("`{}`", other.spelling()),
        }
    }

    pub fn spelling(&self) -> &'static str {
        match self {
            TokenKind::Void => "void",
            TokenKind::CharKw => "char",
            TokenKind::Short => "short",
            TokenKind::Int => "int",
            TokenKind::Long => "long",
            TokenKind::Float => "float",
            TokenKind::Double => "double",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::ForAny => "_For_any",
            TokenKind::Ptr => "_Ptr",
            TokenKind::ArrayPtr => "_Array_ptr",
            TokenKind::NtArrayPtr => "_Nt_array_ptr",
            TokenKind::Checked => "_Checked",
            TokenKind::Unchecked => "_Unchecked",
            TokenKind::Ampersand => "&",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Bang => "!",
            TokenKind::BangEq => "!=",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Comma => ",",
            TokenKind::Semi => ";",
            TokenKind::Arrow => "->",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Identifier(_)
            | TokenKind::Integer(_)
            | TokenKind::Char(_)
            | TokenKind::String(_)
            | TokenKind::Eof => "",
        }
    }

    pub fn is_builtin_type(&self) -> bool {
        matches!(
            self,
            TokenKind::Void
                | TokenKind::CharKw
                | TokenKind::Short
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Float
                | TokenKind::Double
        )
    }

    pub fn is_checked_pointer(&self) -> bool {
        matches!(
            self,
            TokenKind::Ptr | TokenKind::ArrayPtr | TokenKind::NtArrayPtr
        )
    }
}
