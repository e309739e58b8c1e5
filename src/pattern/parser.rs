//! Parser for the pattern language.
//!
//! ```text
//! pattern  := group (',' group)*
//! group    := term ((';' | '^') term)*       one operator per group
//! term     := source? beat suffix*
//! source   := '[' alias ']'
//! beat     := number | '-' number | 'i' (('+' | '-') integer)? | '@' number '_' number ('_' number)?
//! suffix   := effect | '>' number | '<' number | '!' | '?' | '#' id
//! effect   := letter number?
//! ```

use std::collections::HashMap;

use crate::effect::{Effect, EffectError};

use super::ast::*;
use super::error::PatternError;
use super::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<Pattern, PatternError> {
        let mut steps = Vec::new();
        let mut groups: Vec<ShuffleGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        loop {
            let (node, group) = self.parse_group()?;
            if let Some(id) = group {
                let slot = steps.len();
                match group_index.get(&id) {
                    Some(&g) => groups[g].slots.push(slot),
                    None => {
                        group_index.insert(id.clone(), groups.len());
                        groups.push(ShuffleGroup {
                            id,
                            slots: vec![slot],
                        });
                    }
                }
            }
            steps.push(node);

            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Eof => break,
                other => {
                    return Err(PatternError::syntax(
                        format!("expected ',' or end of pattern, got {other:?}"),
                        self.peek().position,
                    ));
                }
            }
        }

        Ok(Pattern { steps, groups })
    }

    /// Parse one top-level step, returning its shuffle group id.
    fn parse_group(&mut self) -> Result<(Node, Option<String>), PatternError> {
        let first_pos = self.peek().position;
        let first = self.parse_term()?;

        let mode = match self.peek().kind {
            TokenKind::Semicolon => MixMode::Sum,
            TokenKind::Caret => MixMode::Product,
            _ => {
                let group = first.group().map(str::to_string);
                return Ok((first, group));
            }
        };

        let mut parts = vec![first];
        loop {
            let op = self.peek().clone();
            let op_mode = match op.kind {
                TokenKind::Semicolon => MixMode::Sum,
                TokenKind::Caret => MixMode::Product,
                _ => break,
            };
            if op_mode != mode {
                return Err(PatternError::syntax(
                    "cannot mix ';' and '^' in one group",
                    op.position,
                ));
            }
            self.advance();
            parts.push(self.parse_term()?);
        }

        if parts.iter().any(|p| p.group().is_some()) {
            return Err(PatternError::syntax(
                "shuffle groups apply to whole steps, not to mixed parts",
                first_pos,
            ));
        }
        Ok((Node::Simultaneous { mode, parts }, None))
    }

    fn parse_term(&mut self) -> Result<Node, PatternError> {
        let source = match &self.peek().kind {
            TokenKind::Source(alias) => {
                let alias = alias.clone();
                self.advance();
                Some(alias)
            }
            _ => None,
        };

        let (beat, pending) = self.parse_beat_ref()?;
        let mut token = BeatToken::new(beat);
        if let Some((word, position)) = pending {
            self.parse_effect_word(&word, position, &mut token)?;
        }
        self.parse_suffixes(&mut token)?;

        let node = Node::Beat(token);
        Ok(match source {
            Some(alias) => Node::Source {
                alias,
                child: Box::new(node),
            },
            None => node,
        })
    }

    /// Parse a beat reference. Letters glued to the position variable (`ir`)
    /// are returned as a pending effect word.
    fn parse_beat_ref(&mut self) -> Result<(BeatRef, Option<(String, usize)>), PatternError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok((BeatRef::Literal(n), None))
            }
            TokenKind::Minus => {
                self.advance();
                let n = self.expect_number()?;
                Ok((BeatRef::Literal(-n), None))
            }
            TokenKind::Word(ref w) if w.starts_with('i') => {
                self.advance();
                if w.len() > 1 {
                    return Ok((BeatRef::Position(0), Some((w[1..].to_string(), t.position + 1))));
                }
                let offset = match self.peek().kind {
                    TokenKind::Plus => {
                        self.advance();
                        self.expect_integer()?
                    }
                    TokenKind::Minus => {
                        self.advance();
                        -self.expect_integer()?
                    }
                    _ => 0,
                };
                Ok((BeatRef::Position(offset), None))
            }
            TokenKind::At => {
                self.advance();
                self.parse_random(t.position).map(|r| (r, None))
            }
            other => Err(PatternError::syntax(
                format!("expected beat number, 'i' or '@', got {other:?}"),
                t.position,
            )),
        }
    }

    fn parse_random(&mut self, position: usize) -> Result<BeatRef, PatternError> {
        let low = self.expect_number()?;
        self.expect(TokenKind::Underscore)?;
        let high = self.expect_number()?;
        let step = if self.check(TokenKind::Underscore) {
            self.advance();
            self.expect_number()?
        } else {
            1.0
        };
        if step <= 0.0 {
            return Err(PatternError::syntax("random step must be positive", position));
        }
        if low > high {
            return Err(PatternError::syntax(
                format!("random range low ({low}) exceeds high ({high})"),
                position,
            ));
        }
        if BeatRef::choices(low, high, step).is_none() {
            return Err(PatternError::syntax(
                format!("random range holds more than {MAX_RANDOM_CHOICES} choices"),
                position,
            ));
        }
        Ok(BeatRef::Random { low, high, step })
    }

    fn parse_suffixes(&mut self, token: &mut BeatToken) -> Result<(), PatternError> {
        loop {
            let t = self.peek().clone();
            match t.kind {
                ref k if k.is_delimiter() => return Ok(()),
                TokenKind::Word(ref w) => {
                    self.advance();
                    self.parse_effect_word(w, t.position, token)?;
                }
                TokenKind::Greater | TokenKind::Less => {
                    self.advance();
                    let frac = self.expect_number()?;
                    if !(frac > 0.0 && frac <= 1.0) {
                        return Err(PatternError::syntax(
                            format!("slice fraction must be in (0, 1], got {frac}"),
                            t.position,
                        ));
                    }
                    if token.slice.is_some() {
                        return Err(PatternError::syntax("beat already sliced", t.position));
                    }
                    token.slice = Some(if t.kind == TokenKind::Greater {
                        Slice::Head(frac)
                    } else {
                        Slice::Tail(frac)
                    });
                }
                TokenKind::Bang => {
                    self.advance();
                    token.skip = true;
                }
                TokenKind::Question => {
                    self.advance();
                    token.ignore_for_size = true;
                }
                TokenKind::Group(ref id) => {
                    self.advance();
                    if token.group.is_some() {
                        return Err(PatternError::syntax("beat already in a shuffle group", t.position));
                    }
                    token.group = Some(id.clone());
                }
                TokenKind::Source(_) => {
                    return Err(PatternError::syntax(
                        "source alias must come before the beat",
                        t.position,
                    ));
                }
                ref other => {
                    return Err(PatternError::syntax(
                        format!("unexpected {other:?} after beat"),
                        t.position,
                    ));
                }
            }
        }
    }

    /// Each letter of `word` is an effect code; the last one takes a directly
    /// following number as its parameter.
    fn parse_effect_word(
        &mut self,
        word: &str,
        position: usize,
        token: &mut BeatToken,
    ) -> Result<(), PatternError> {
        let codes: Vec<char> = word.chars().collect();
        for (i, &code) in codes.iter().enumerate() {
            let param = if i + 1 == codes.len() {
                match self.peek().kind {
                    TokenKind::Number(n) => {
                        self.advance();
                        Some(n)
                    }
                    _ => None,
                }
            } else {
                None
            };
            let effect = Effect::from_code(code, param).map_err(|e| match e {
                EffectError::Unknown(_) => PatternError::unknown_effect(e.to_string(), position + i),
                EffectError::InvalidParam { .. } => PatternError::syntax(e.to_string(), position + i),
            })?;
            token.effects.push(effect);
        }
        Ok(())
    }

    // --- helpers ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(&kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, PatternError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let t = self.peek();
            Err(PatternError::syntax(
                format!("expected {kind:?}, got {:?}", t.kind),
                t.position,
            ))
        }
    }

    fn expect_number(&mut self) -> Result<f64, PatternError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Number(v) => {
                self.advance();
                Ok(v)
            }
            ref other => Err(PatternError::syntax(
                format!("expected number, got {other:?}"),
                t.position,
            )),
        }
    }

    fn expect_integer(&mut self) -> Result<i64, PatternError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Number(v) if v.fract() == 0.0 && v <= MAX_POSITION_OFFSET as f64 => {
                self.advance();
                Ok(v as i64)
            }
            TokenKind::Number(v) if v.fract() == 0.0 => Err(PatternError::syntax(
                format!("offset {v} exceeds {MAX_POSITION_OFFSET}"),
                t.position,
            )),
            ref other => Err(PatternError::syntax(
                format!("expected integer, got {other:?}"),
                t.position,
            )),
        }
    }
}
