//! Output routing for unit execution
//!
//! Unit stdout is pushed to an [`OutputBuffer`] as it is produced, so a
//! front end can stream it live while the engine still accumulates the
//! complete output in execution order.

use std::sync::{Arc, Mutex};

/// A single output entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEntry {
    /// A chunk of a unit's stdout (usually one line, newline included)
    Stdout { unit: String, text: String },
    /// Non-fatal engine finding (empty segment, skipped continuation)
    Warning(String),
    /// Generic info message
    Info(String),
}

/// Output sink shared between the engine and its front end
pub trait OutputBuffer: Send + Sync {
    /// Push an output entry
    fn push(&self, entry: OutputEntry);

    /// Drain all entries (returns and clears)
    fn drain(&self) -> Vec<OutputEntry>;

    /// Check if empty
    fn is_empty(&self) -> bool;
}

/// In-memory output buffer implementation
pub struct MemoryOutputBuffer {
    entries: Mutex<Vec<OutputEntry>>,
}

impl MemoryOutputBuffer {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryOutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer for MemoryOutputBuffer {
    fn push(&self, entry: OutputEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    fn drain(&self) -> Vec<OutputEntry> {
        if let Ok(mut entries) = self.entries.lock() {
            std::mem::take(&mut *entries)
        } else {
            Vec::new()
        }
    }

    fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.is_empty())
            .unwrap_or(true)
    }
}

/// Shared output buffer handle
pub type OutputHandle = Arc<dyn OutputBuffer>;

/// Create a new in-memory output buffer
pub fn new_output_buffer() -> OutputHandle {
    Arc::new(MemoryOutputBuffer::new())
}

/// Concatenate the stdout chunks of drained entries
pub fn collect_stdout(entries: &[OutputEntry]) -> String {
    entries
        .iter()
        .filter_map(|entry| match entry {
            OutputEntry::Stdout { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
