use thiserror::Error;

use crate::compiler::{self, Target, UnsupportedTargetError};
use crate::evaluator::error::RuntimeError;
use crate::evaluator::value::Value;
use crate::evaluator::Evaluator;
use crate::lexer::{self, LexError};
use crate::parser::{self, ParseError};

/// Sum of the four disjoint failure kinds crossing the engine boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Target(#[from] UnsupportedTargetError),
}

/// Result of `execute`. Output printed before a runtime failure is
/// preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Result of `compile`.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub success: bool,
    pub target: String,
    pub code: String,
    pub error: Option<String>,
}

/// Result of `analyze`.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub success: bool,
    pub token_count: usize,
    pub ast_dump: String,
    pub error: Option<String>,
}

/// Engine facade: lexer → parser → evaluator or renderer. The evaluator
/// persists across `execute` calls so hosts like a REPL keep their globals;
/// `compile` and `analyze` are stateless.
#[derive(Default)]
pub struct Runtime {
    evaluator: Evaluator,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            evaluator: Evaluator::new(),
        }
    }

    pub fn execute(&mut self, source: &str) -> Execution {
        let program = match lexer::tokenize(source).map_err(EngineError::from) {
            Ok(tokens) => match parser::parse_tokens(tokens) {
                Ok(program) => program,
                Err(error) => return Execution::failed(EngineError::from(error)),
            },
            Err(error) => return Execution::failed(error),
        };
        let evaluation = self.evaluator.evaluate(&program);
        Execution {
            success: evaluation.error.is_none(),
            output: evaluation.output,
            error: evaluation.error.map(|error| error.to_string()),
        }
    }

    pub fn compile(&self, source: &str, target_name: &str) -> Compilation {
        // Target resolution fails before any parsing work.
        let target = match Target::from_name(target_name) {
            Ok(target) => target,
            Err(error) => return Compilation::failed(target_name, EngineError::from(error)),
        };
        let tokens = match lexer::tokenize(source) {
            Ok(tokens) => tokens,
            Err(error) => return Compilation::failed(target_name, EngineError::from(error)),
        };
        let program = match parser::parse_tokens(tokens) {
            Ok(program) => program,
            Err(error) => return Compilation::failed(target_name, EngineError::from(error)),
        };
        Compilation {
            success: true,
            target: target.name().to_string(),
            code: compiler::render(&program, target),
            error: None,
        }
    }

    pub fn analyze(&self, source: &str) -> Analysis {
        let tokens = match lexer::tokenize(source) {
            Ok(tokens) => tokens,
            Err(error) => return Analysis::failed(EngineError::from(error)),
        };
        let token_count = tokens.len();
        match parser::parse_tokens(tokens) {
            Ok(program) => Analysis {
                success: true,
                token_count,
                ast_dump: format!("{program:#?}"),
                error: None,
            },
            Err(error) => Analysis::failed(EngineError::from(error)),
        }
    }

    /// Sorted snapshot of the evaluator's global bindings.
    pub fn variables(&self) -> Vec<(String, Value)> {
        self.evaluator.variables()
    }

    /// Drop all user state, keeping the builtin registry.
    pub fn reset(&mut self) {
        self.evaluator.reset();
    }
}

impl Execution {
    fn failed(error: EngineError) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.to_string()),
        }
    }
}

impl Compilation {
    fn failed(target: &str, error: EngineError) -> Self {
        Self {
            success: false,
            target: target.to_string(),
            code: String::new(),
            error: Some(error.to_string()),
        }
    }
}

impl Analysis {
    fn failed(error: EngineError) -> Self {
        Self {
            success: false,
            token_count: 0,
            ast_dump: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Run a program in a fresh environment.
pub fn execute(source: &str) -> Execution {
    Runtime::new().execute(source)
}

/// Render a program as `target_name` source text.
pub fn compile(source: &str, target_name: &str) -> Compilation {
    Runtime::new().compile(source, target_name)
}

/// Token count plus a pretty AST dump.
pub fn analyze(source: &str) -> Analysis {
    Runtime::new().analyze(source)
}

/// The closed supported-target list, exposed for discovery.
pub fn list_targets() -> &'static [Target] {
    &Target::ALL
}
