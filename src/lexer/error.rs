use thiserror::Error;

/// Produced when a character matches no lexical rule.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("Unexpected character '{character}' at line {line}, column {column}")]
pub struct LexError {
    pub character: char,
    pub line: usize,
    pub column: usize,
}
