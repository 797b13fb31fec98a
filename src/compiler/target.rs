use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raised when a compile request names a language outside the supported
/// list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unsupported target language: {target}")]
pub struct UnsupportedTargetError {
    pub target: String,
}

/// Closed list of render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Python,
    Javascript,
    Typescript,
    Rust,
    Go,
    Java,
    Cpp,
    Csharp,
    Php,
    Ruby,
    Swift,
    Kotlin,
}

impl Target {
    pub const ALL: [Target; 12] = [
        Target::Python,
        Target::Javascript,
        Target::Typescript,
        Target::Rust,
        Target::Go,
        Target::Java,
        Target::Cpp,
        Target::Csharp,
        Target::Php,
        Target::Ruby,
        Target::Swift,
        Target::Kotlin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Csharp => "csharp",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
        }
    }

    /// Case-insensitive lookup used by the public compile entry point.
    pub fn from_name(name: &str) -> Result<Self, UnsupportedTargetError> {
        let lowered = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|target| target.name() == lowered)
            .ok_or_else(|| UnsupportedTargetError {
                target: name.to_string(),
            })
    }

    pub(super) fn profile(self) -> Profile {
        Profile {
            true_lit: if self == Self::Python { "True" } else { "true" },
            false_lit: if self == Self::Python { "False" } else { "false" },
            null_lit: match self {
                Self::Python => "None",
                Self::Rust => "None",
                Self::Go => "nil",
                Self::Cpp => "nullptr",
                Self::Ruby | Self::Swift => "nil",
                _ => "null",
            },
            and_op: if self == Self::Python { "and" } else { "&&" },
            or_op: if self == Self::Python { "or" } else { "||" },
            not_op: if self == Self::Python { "not " } else { "!" },
            terminator: match self {
                Self::Javascript
                | Self::Typescript
                | Self::Rust
                | Self::Java
                | Self::Cpp
                | Self::Csharp
                | Self::Php => ";",
                _ => "",
            },
            indent_unit: match self {
                Self::Javascript | Self::Typescript => "  ",
                _ => "    ",
            },
            block: match self {
                Self::Python => BlockStyle::Indent,
                Self::Ruby => BlockStyle::End,
                _ => BlockStyle::Brace,
            },
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Target {
    type Err = UnsupportedTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// How a target spells delimiters and fixed literals. Everything irregular
/// (loop headers, function headers, print) lives in per-target match arms in
/// the emitter.
pub(super) struct Profile {
    pub true_lit: &'static str,
    pub false_lit: &'static str,
    pub null_lit: &'static str,
    pub and_op: &'static str,
    pub or_op: &'static str,
    pub not_op: &'static str,
    pub terminator: &'static str,
    pub indent_unit: &'static str,
    pub block: BlockStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockStyle {
    /// Colon plus indentation (python).
    Indent,
    /// Braces.
    Brace,
    /// Bare header closed by `end` (ruby).
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Target::from_name("Python").expect("target"), Target::Python);
        assert_eq!(Target::from_name("RUST").expect("target"), Target::Rust);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = Target::from_name("nosuchlang").expect_err("expected rejection");
        assert_eq!(err.target, "nosuchlang");
        assert_eq!(
            err.to_string(),
            "Unsupported target language: nosuchlang"
        );
    }

    #[test]
    fn all_targets_have_distinct_names() {
        let mut names: Vec<&str> = Target::ALL.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Target::ALL.len());
    }
}
