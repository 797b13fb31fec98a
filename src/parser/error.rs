use thiserror::Error;

/// Produced the first time a required token does not match the grammar.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, but got {found_kind} '{found}' at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found_kind: &'static str,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Expected {expected}, but got end of input at line {line}")]
    UnexpectedEof { expected: String, line: usize },
    #[error("Nesting too deep at line {line}")]
    NestingTooDeep { line: usize },
}
