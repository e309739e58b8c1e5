//! Pattern compiler — pattern text → tokens → [`Pattern`] tree.
//!
//! Compilation is pure: the same text always yields the same tree, and a
//! compiled [`Pattern`] can be rendered any number of times against
//! different sources.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{level_size, BeatRef, BeatToken, MixMode, Node, Pattern, ShuffleGroup, Slice};
pub use error::{ErrorKind, PatternError};

use tracing::debug;

use lexer::Lexer;
use parser::Parser;

/// The pattern compiler.
pub struct Compiler;

impl Compiler {
    /// Compile pattern text into a [`Pattern`].
    pub fn compile(source: &str) -> Result<Pattern, PatternError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens);
        let pattern = parser.parse()?;
        debug!(
            steps = pattern.steps().len(),
            groups = pattern.groups().len(),
            size = pattern.size(),
            "compiled pattern"
        );
        Ok(pattern)
    }
}

/// Compile pattern text. Shorthand for [`Compiler::compile`].
pub fn compile(source: &str) -> Result<Pattern, PatternError> {
    Compiler::compile(source)
}
