//! Scratch directory holding generated sources and their result files

use crate::error::RuntimeError;
use crate::symbols::Literal;
use crate::unit::ExecutionUnit;
use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

const TARGET: &str = "mixl::run";

/// Content-addressed scratch storage, created on first use
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    ready: bool,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure(&mut self) -> Result<(), RuntimeError> {
        if self.ready {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|e| RuntimeError::Persist {
            path: self.root.clone(),
            message: e.to_string(),
        })?;
        // interpreters may run in another working directory
        self.root = fs::canonicalize(&self.root).map_err(|e| RuntimeError::Persist {
            path: self.root.clone(),
            message: e.to_string(),
        })?;
        self.ready = true;
        trace!(target: TARGET, root = %self.root.display(), "scratch directory ready");
        Ok(())
    }

    /// `<root>/<hash>.<kind>.<ext>`
    pub fn source_path(&self, unit: &ExecutionUnit) -> PathBuf {
        self.root
            .join(format!("{}.{}", unit.file_stem(), unit.language.extension()))
    }

    /// `<root>/<hash>.<kind>.json`
    pub fn result_path(&self, unit: &ExecutionUnit) -> PathBuf {
        self.root.join(format!("{}.json", unit.file_stem()))
    }

    /// Write the unit's source and clear any stale result file
    pub fn persist(&mut self, unit: &ExecutionUnit) -> Result<PathBuf, RuntimeError> {
        self.ensure()?;

        let result = self.result_path(unit);
        match fs::remove_file(&result) {
            Ok(()) => trace!(target: TARGET, path = %result.display(), "removed stale result"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RuntimeError::Persist {
                    path: result,
                    message: e.to_string(),
                })
            }
        }

        let path = self.source_path(unit);
        fs::write(&path, &unit.source).map_err(|e| RuntimeError::Persist {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(path)
    }

    /// Read the flat result object a unit wrote
    pub fn read_result(&self, unit: &ExecutionUnit) -> Result<IndexMap<String, Literal>, RuntimeError> {
        let path = self.result_path(unit);
        let text = fs::read_to_string(&path).map_err(|e| RuntimeError::MissingResult {
            unit: unit.hash.clone(),
            path: path.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| RuntimeError::InvalidResult {
            unit: unit.hash.clone(),
            path,
            message: e.to_string(),
        })
    }
}
