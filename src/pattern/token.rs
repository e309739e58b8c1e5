//! Token types for the pattern lexer.

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 0-based character offset of the token's first character.
    pub position: usize,
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    /// A run of ASCII letters: the position variable `i` and/or effect codes.
    Word(String),
    /// `[alias]`
    Source(String),
    /// `#id`
    Group(String),

    // Operators
    Comma,      // , sequential
    Semicolon,  // ; simultaneous sum
    Caret,      // ^ simultaneous product
    Plus,       // +
    Minus,      // -
    At,         // @ random
    Underscore, // _ random range separator
    Bang,       // ! skip
    Question,   // ? ignore for size
    Greater,    // > head slice
    Less,       // < tail slice

    Eof,
}

impl TokenKind {
    /// Whether this token ends a term.
    pub fn is_delimiter(&self) -> bool {
        matches!(
            self,
            TokenKind::Comma | TokenKind::Semicolon | TokenKind::Caret | TokenKind::Eof
        )
    }
}
