use thiserror::Error;

use super::value::Value;

/// Evaluation-time failures. Every variant is catchable by a user
/// `try`/`catch` before it surfaces at top level.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Class '{name}' not found")]
    UnresolvedClass { name: String },
    #[error("Value of type {type_name} is not callable")]
    NotCallable { type_name: String },
    #[error("Operator '{operator}' is not supported for types {left} and {right}")]
    UnsupportedBinary {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("Operator '{operator}' is not supported for type {type_name}")]
    UnsupportedUnary {
        operator: &'static str,
        type_name: &'static str,
    },
    #[error("Expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Invalid update target")]
    InvalidUpdateTarget,
    #[error("Array index must be non-negative, got {index}")]
    NegativeIndex { index: i64 },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    BuiltinArityMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Maximum call depth exceeded")]
    StackExhausted,
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("Break outside of loop")]
    BreakOutsideLoop,
    #[error("Continue outside of loop")]
    ContinueOutsideLoop,
    /// A user `throw`; carries the raw value so `catch` binds it unchanged.
    #[error("{value}")]
    Thrown { value: Value },
}
