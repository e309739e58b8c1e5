//! Lexer for the pattern language.
//!
//! Converts pattern text into a stream of [`Token`]s. Whitespace is ignored
//! everywhere; letters are grouped into words and split into effect codes by
//! the parser.

use super::error::PatternError;
use super::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, PatternError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position: self.pos,
                });
                break;
            }

            let ch = self.peek();
            let token = match ch {
                ',' => self.single_char(TokenKind::Comma),
                ';' => self.single_char(TokenKind::Semicolon),
                '^' => self.single_char(TokenKind::Caret),
                '+' => self.single_char(TokenKind::Plus),
                '-' => self.single_char(TokenKind::Minus),
                '@' => self.single_char(TokenKind::At),
                '_' => self.single_char(TokenKind::Underscore),
                '!' => self.single_char(TokenKind::Bang),
                '?' => self.single_char(TokenKind::Question),
                '>' => self.single_char(TokenKind::Greater),
                '<' => self.single_char(TokenKind::Less),
                '[' => self.lex_source()?,
                ']' => {
                    return Err(PatternError::syntax("unmatched ']'", self.pos));
                }
                '#' => self.lex_group()?,
                '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => self.lex_number()?,
                '0'..='9' => self.lex_number()?,
                'a'..='z' | 'A'..='Z' => self.lex_word(),
                _ => {
                    return Err(PatternError::syntax(
                        format!("unexpected character: '{ch}'"),
                        self.pos,
                    ));
                }
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let position = self.pos;
        self.advance();
        Token { kind, position }
    }

    fn lex_number(&mut self) -> Result<Token, PatternError> {
        let position = self.pos;
        let mut s = String::new();

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance());
        }
        if !self.is_at_end() && self.peek() == '.' {
            s.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }

        let val: f64 = s
            .parse()
            .map_err(|_| PatternError::syntax(format!("invalid number: {s}"), position))?;
        Ok(Token {
            kind: TokenKind::Number(val),
            position,
        })
    }

    fn lex_word(&mut self) -> Token {
        let position = self.pos;
        let mut s = String::new();
        while !self.is_at_end() && self.peek().is_ascii_alphabetic() {
            s.push(self.advance());
        }
        Token {
            kind: TokenKind::Word(s),
            position,
        }
    }

    /// Lex `[alias]` into a single source token.
    fn lex_source(&mut self) -> Result<Token, PatternError> {
        let position = self.pos;
        self.advance(); // consume '['

        let mut alias = String::new();
        loop {
            if self.is_at_end() {
                return Err(PatternError::syntax("unclosed bracket", position));
            }
            match self.advance() {
                ']' => break,
                '[' => {
                    return Err(PatternError::syntax("nested '[' in source alias", self.pos - 1));
                }
                c => alias.push(c),
            }
        }

        let alias = alias.trim();
        if alias.is_empty() {
            return Err(PatternError::syntax("empty source alias", position));
        }
        if let Some(bad) = alias
            .chars()
            .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(PatternError::syntax(
                format!("invalid character '{bad}' in source alias"),
                position,
            ));
        }
        Ok(Token {
            kind: TokenKind::Source(alias.to_string()),
            position,
        })
    }

    fn lex_group(&mut self) -> Result<Token, PatternError> {
        let position = self.pos;
        self.advance(); // consume '#'
        let mut id = String::new();
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            id.push(self.advance());
        }
        if id.is_empty() {
            return Err(PatternError::syntax("expected group id after '#'", position));
        }
        Ok(Token {
            kind: TokenKind::Group(id),
            position,
        })
    }
}
