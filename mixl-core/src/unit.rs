//! Execution units
//!
//! A unit is one self-contained generated program. Its identity is the
//! blake3 hash of its own text, so identical generated code always lands in
//! the same scratch file.

use mixl_config::GuestLanguage;
use serde::Serialize;
use std::fmt;

/// What a unit was generated from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A whole segment, or a non-call sub-block of a split segment
    Segment,
    /// A call line re-generated with returned values spliced in
    Continuation,
    /// A cross-language function invocation
    Invocation,
}

impl UnitKind {
    /// File name marker
    pub fn suffix(&self) -> &'static str {
        match self {
            UnitKind::Segment => "seg",
            UnitKind::Continuation => "cont",
            UnitKind::Invocation => "call",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.suffix())
    }
}

/// Unit lifecycle: `Pending -> Written -> Running -> Completed | Failed`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Written,
    Running,
    Completed,
    Failed,
}

impl UnitState {
    /// Whether `next` is a legal successor state
    pub fn can_advance_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (UnitState::Pending, UnitState::Written)
                | (UnitState::Pending, UnitState::Failed)
                | (UnitState::Written, UnitState::Running)
                | (UnitState::Written, UnitState::Failed)
                | (UnitState::Running, UnitState::Completed)
                | (UnitState::Running, UnitState::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Failed)
    }
}

/// The call an invocation unit performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub callee: String,
    /// Caller line in the source file
    pub line: usize,
}

/// One generated program ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    pub language: GuestLanguage,
    pub kind: UnitKind,
    pub source: String,
    /// blake3 hex digest of `source`
    pub hash: String,
    /// Names the postamble serializes
    pub tracked: Vec<String>,
    pub pending_call: Option<PendingCall>,
    /// First source line the unit was generated from
    pub first_line: usize,
}

impl ExecutionUnit {
    pub fn new(
        language: GuestLanguage,
        kind: UnitKind,
        source: String,
        tracked: Vec<String>,
        first_line: usize,
    ) -> Self {
        let hash = content_hash(&source);
        Self {
            language,
            kind,
            source,
            hash,
            tracked,
            pending_call: None,
            first_line,
        }
    }

    pub fn with_pending_call(mut self, call: PendingCall) -> Self {
        self.pending_call = Some(call);
        self
    }

    /// `<hash>.<kind>`, shared by the source file and its result file
    pub fn file_stem(&self) -> String {
        format!("{}.{}", self.hash, self.kind.suffix())
    }

    /// Abbreviated hash for logs
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(12)]
    }
}

/// blake3 hex digest of generated text
pub fn content_hash(source: &str) -> String {
    blake3::hash(source.as_bytes()).to_hex().to_string()
}
