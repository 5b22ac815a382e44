//! MixL Config - Pure configuration data structures
//!
//! This crate contains only data structures, no IO or global state.
//! It serves as the shared configuration vocabulary across all MixL crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default scratch directory name, relative to the entry file's directory
pub const DEFAULT_SCRATCH_DIR: &str = ".mixl";

/// A guest language the engine knows how to analyze and wrap
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestLanguage {
    /// Brace-delimited, declaration keywords required (`let`/`var`/`const`)
    JavaScript,
    /// Indentation-delimited, bare assignment
    Python,
}

impl GuestLanguage {
    /// Get the string name of the language
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "javascript",
            GuestLanguage::Python => "python",
        }
    }

    /// Tag used in `.mixl` sources by default
    pub fn default_tag(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "js",
            GuestLanguage::Python => "py",
        }
    }

    /// File extension of generated sources
    pub fn extension(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "js",
            GuestLanguage::Python => "py",
        }
    }

    /// Interpreter program used when none is configured
    pub fn default_interpreter(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "node",
            GuestLanguage::Python => "python3",
        }
    }
}

impl std::fmt::Display for GuestLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One accepted segment tag and how to run code tagged with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Tag identifier, compared case-insensitively (`js` matches `[JS]`)
    pub tag: String,
    /// Which guest language the tag denotes
    pub language: GuestLanguage,
    /// Interpreter program
    pub interpreter: String,
    /// Extra arguments placed before the generated file path
    #[serde(default)]
    pub args: Vec<String>,
}

impl LanguageSpec {
    /// Create a spec using the language's default interpreter
    pub fn new(tag: impl Into<String>, language: GuestLanguage) -> Self {
        Self {
            tag: tag.into(),
            language,
            interpreter: language.default_interpreter().to_string(),
            args: Vec::new(),
        }
    }

    /// Override the interpreter program
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Check whether a tag identifier denotes this spec
    pub fn matches(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// Configuration for one engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Accepted guest-language tags
    pub languages: Vec<LanguageSpec>,
    /// Where generated sources and result files are written
    pub scratch_dir: PathBuf,
    /// Working directory for spawned interpreters (None = inherit)
    pub working_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            languages: vec![
                LanguageSpec::new("js", GuestLanguage::JavaScript),
                LanguageSpec::new("py", GuestLanguage::Python),
            ],
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            working_dir: None,
        }
    }
}

impl EngineConfig {
    /// Find the spec for a tag identifier (case-insensitive)
    pub fn language_for_tag(&self, tag: &str) -> Option<&LanguageSpec> {
        self.languages.iter().find(|spec| spec.matches(tag))
    }

    /// Find the first spec registered for a guest language
    pub fn spec_for(&self, language: GuestLanguage) -> Option<&LanguageSpec> {
        self.languages.iter().find(|spec| spec.language == language)
    }

    /// Accepted tags, in registration order
    pub fn tags(&self) -> Vec<&str> {
        self.languages.iter().map(|spec| spec.tag.as_str()).collect()
    }
}

/// Pipeline phase enum for phase-specific logging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Segment,
    Analyze,
    Resolve,
    Codegen,
    Run,
}

impl Phase {
    /// All phases in pipeline order
    pub const ALL: [Phase; 5] = [
        Phase::Segment,
        Phase::Analyze,
        Phase::Resolve,
        Phase::Codegen,
        Phase::Run,
    ];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Segment => "segment",
            Phase::Analyze => "analyze",
            Phase::Resolve => "resolve",
            Phase::Codegen => "codegen",
            Phase::Run => "run",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> &'static str {
        match self {
            Phase::Segment => "mixl::segment",
            Phase::Analyze => "mixl::analyze",
            Phase::Resolve => "mixl::resolve",
            Phase::Codegen => "mixl::codegen",
            Phase::Run => "mixl::run",
        }
    }
}
