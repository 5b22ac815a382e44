//! Engine error types
//!
//! Compile-phase errors (validation, structure, redefinition, arity) are raised
//! before any process spawns. Run-phase errors (undefined reference, runtime)
//! abort the run and leave the scratch directory in place for inspection.

use mixl_config::Phase;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Unknown language tag
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: '{tag}' is not a supported language")]
pub struct ValidationError {
    /// Tag identifier as written
    pub tag: String,
    /// 1-based line in the source file
    pub line: usize,
}

/// Structural problem in the source layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureErrorKind {
    /// Non-blank code before the first language tag
    CodeOutsideSegment,
    /// A brace-delimited function never closed
    UnterminatedFunction { name: String },
    /// A custom function call on a line that is not a top-level statement
    CallInBlock { name: String },
    /// A custom function call whose argument list does not close on its line
    UnclosedCall { name: String },
}

impl fmt::Display for StructureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureErrorKind::CodeOutsideSegment => {
                write!(f, "code outside of a language segment")
            }
            StructureErrorKind::UnterminatedFunction { name } => {
                write!(f, "unclosed function '{}'", name)
            }
            StructureErrorKind::CallInBlock { name } => write!(
                f,
                "call to '{}' must be a top-level statement to cross languages",
                name
            ),
            StructureErrorKind::UnclosedCall { name } => {
                write!(f, "argument list of '{}' is not closed on its line", name)
            }
        }
    }
}

/// Structural error with its location
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct StructureError {
    pub kind: StructureErrorKind,
    /// 1-based line in the source file
    pub line: usize,
}

impl StructureError {
    pub fn new(kind: StructureErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// What kind of symbol was redefined
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Function => write!(f, "function"),
        }
    }
}

/// Illegal redefinition of a variable or function
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind} '{name}' is already defined (line {previous_line})")]
pub struct RedefinitionError {
    pub kind: SymbolKind,
    pub name: String,
    pub line: usize,
    pub previous_line: usize,
}

/// Call argument count does not match the callee's parameter list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: wrong number of arguments to '{name}': expected {expected}, got {actual}")]
pub struct ArityError {
    pub name: String,
    pub expected: usize,
    pub actual: usize,
    pub line: usize,
}

/// A generated unit needs a global that has no value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: global '{name}' has no value when generating the unit")]
pub struct UndefinedReferenceError {
    pub name: String,
    /// First source line of the unit being generated
    pub line: usize,
}

/// A dispatched unit failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("cannot write '{path}': {message}")]
    Persist { path: PathBuf, message: String },

    #[error("cannot launch '{program}' for unit {unit}: {message}")]
    Launch {
        program: String,
        unit: String,
        message: String,
    },

    #[error("unit {unit} exited with {status}{}", stderr_suffix(.stderr))]
    Exit {
        unit: String,
        status: String,
        stderr: String,
    },

    #[error("result file '{path}' of unit {unit} is missing: {message}")]
    MissingResult {
        unit: String,
        path: PathBuf,
        message: String,
    },

    #[error("result file '{path}' of unit {unit} is invalid: {message}")]
    InvalidResult {
        unit: String,
        path: PathBuf,
        message: String,
    },

    #[error("no interpreter configured for {language}")]
    NoInterpreter { language: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{}", trimmed)
    }
}

/// Unified engine error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{}", validation_summary(.0))]
    Validation(Vec<ValidationError>),

    #[error("structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("redefinition error: {0}")]
    Redefinition(#[from] RedefinitionError),

    #[error("arity error: {0}")]
    Arity(#[from] ArityError),

    #[error("undefined reference: {0}")]
    UndefinedReference(#[from] UndefinedReferenceError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

fn validation_summary(errors: &[ValidationError]) -> String {
    let mut text = format!("validation failed with {} error(s):", errors.len());
    for error in errors {
        text.push_str("\n  ");
        text.push_str(&error.to_string());
    }
    text
}

impl EngineError {
    /// Source line of the error (first one for aggregated validation errors)
    pub fn line(&self) -> Option<usize> {
        match self {
            EngineError::Validation(errors) => errors.first().map(|e| e.line),
            EngineError::Structure(e) => Some(e.line),
            EngineError::Redefinition(e) => Some(e.line),
            EngineError::Arity(e) => Some(e.line),
            EngineError::UndefinedReference(e) => Some(e.line),
            EngineError::Runtime(_) => None,
        }
    }

    /// Pipeline phase the error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            EngineError::Validation(_) | EngineError::Structure(_) => Phase::Segment,
            EngineError::Redefinition(_) => Phase::Analyze,
            EngineError::Arity(_) => Phase::Resolve,
            EngineError::UndefinedReference(_) => Phase::Codegen,
            EngineError::Runtime(_) => Phase::Run,
        }
    }

    /// Whether the error was raised before any unit was dispatched
    pub fn is_compile_error(&self) -> bool {
        !matches!(
            self,
            EngineError::UndefinedReference(_) | EngineError::Runtime(_)
        )
    }

    /// Stable error kind name (for reports)
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "ValidationError",
            EngineError::Structure(_) => "StructureError",
            EngineError::Redefinition(_) => "RedefinitionError",
            EngineError::Arity(_) => "ArityError",
            EngineError::UndefinedReference(_) => "UndefinedReferenceError",
            EngineError::Runtime(_) => "RuntimeError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_names_expected_and_actual() {
        let err = ArityError {
            name: "f".to_string(),
            expected: 1,
            actual: 2,
            line: 4,
        };
        let msg = EngineError::from(err).to_string();
        assert!(msg.contains("expected 1, got 2"), "{}", msg);
        assert!(msg.contains("'f'"));
    }

    #[test]
    fn test_validation_summary_lists_every_tag() {
        let err = EngineError::Validation(vec![
            ValidationError {
                tag: "ruby".to_string(),
                line: 1,
            },
            ValidationError {
                tag: "go".to_string(),
                line: 5,
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("'ruby'"));
        assert!(msg.contains("line 5"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_phase_and_compile_classification() {
        let structure = EngineError::from(StructureError::new(
            StructureErrorKind::CodeOutsideSegment,
            1,
        ));
        assert_eq!(structure.phase(), Phase::Segment);
        assert!(structure.is_compile_error());

        let runtime = EngineError::from(RuntimeError::NoInterpreter {
            language: "python".to_string(),
        });
        assert_eq!(runtime.phase(), Phase::Run);
        assert!(!runtime.is_compile_error());
        assert_eq!(runtime.line(), None);
    }

    #[test]
    fn test_exit_error_includes_stderr() {
        let err = RuntimeError::Exit {
            unit: "abc".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "NameError: name 'x' is not defined\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 1:"));
        assert!(msg.ends_with("is not defined"));
    }
}
