//! Execution scheduler
//!
//! Persists each unit, runs it with its language's interpreter, and merges
//! its result into the global symbols. A [`DispatchGate`] keeps exactly one
//! unit in flight; units run in the order they are dispatched.

pub mod interpreter;
pub mod scratch;

pub use interpreter::Interpreter;
pub use scratch::ScratchDir;

use crate::error::RuntimeError;
use crate::output::OutputHandle;
use crate::symbols::{GlobalSymbols, Literal};
use crate::unit::{ExecutionUnit, UnitKind, UnitState};
use mixl_config::{EngineConfig, GuestLanguage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

const TARGET: &str = "mixl::run";

/// 单飞闸门：持有期间不会有其他单元被派发
#[derive(Debug, Clone, Default)]
pub struct DispatchGate {
    slot: Arc<Mutex<()>>,
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other unit is in flight
    pub fn enter(&self) -> MutexGuard<'_, ()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a unit is currently in flight
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }
}

/// What happened to one dispatched unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub hash: String,
    pub kind: UnitKind,
    pub language: GuestLanguage,
    pub state: UnitState,
    pub elapsed: Duration,
    pub first_line: usize,
    pub path: Option<PathBuf>,
}

impl UnitRecord {
    fn new(unit: &ExecutionUnit) -> Self {
        Self {
            hash: unit.hash.clone(),
            kind: unit.kind,
            language: unit.language,
            state: UnitState::Pending,
            elapsed: Duration::ZERO,
            first_line: unit.first_line,
            path: None,
        }
    }

    fn advance(&mut self, next: UnitState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal unit transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(target: TARGET, unit = %self.hash.get(..12).unwrap_or(&self.hash), from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}

/// Dispatches units one at a time
pub struct Scheduler {
    config: EngineConfig,
    scratch: ScratchDir,
    gate: DispatchGate,
    output: OutputHandle,
    records: Vec<UnitRecord>,
    stdout: String,
}

impl Scheduler {
    pub fn new(config: EngineConfig, output: OutputHandle) -> Self {
        let scratch = ScratchDir::new(config.scratch_dir.clone());
        Self {
            config,
            scratch,
            gate: DispatchGate::new(),
            output,
            records: Vec::new(),
            stdout: String::new(),
        }
    }

    pub fn output(&self) -> &OutputHandle {
        &self.output
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.root()
    }

    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<UnitRecord> {
        std::mem::take(&mut self.records)
    }

    /// Stdout accumulated in execution order since the last call
    pub fn take_stdout(&mut self) -> String {
        std::mem::take(&mut self.stdout)
    }

    /// Run one unit to completion and merge its result.
    ///
    /// Returns the unit's reserved return value, if it wrote one.
    pub fn dispatch(
        &mut self,
        unit: &ExecutionUnit,
        globals: &mut GlobalSymbols,
        order: &mut Vec<String>,
    ) -> Result<Option<Literal>, RuntimeError> {
        let gate = self.gate.clone();
        let _in_flight = gate.enter();

        let started = Instant::now();
        let mut record = UnitRecord::new(unit);
        let result = self.execute(unit, &mut record, globals, order);
        record.elapsed = started.elapsed();

        match &result {
            Ok(_) => info!(
                target: TARGET,
                unit = unit.short_hash(),
                kind = %unit.kind,
                language = %unit.language,
                elapsed_ms = record.elapsed.as_secs_f64() * 1000.0,
                "unit completed"
            ),
            Err(e) => {
                record.advance(UnitState::Failed);
                debug!(target: TARGET, unit = unit.short_hash(), error = %e, "unit failed");
            }
        }
        self.records.push(record);
        result
    }

    fn execute(
        &mut self,
        unit: &ExecutionUnit,
        record: &mut UnitRecord,
        globals: &mut GlobalSymbols,
        order: &mut Vec<String>,
    ) -> Result<Option<Literal>, RuntimeError> {
        let spec = self
            .config
            .spec_for(unit.language)
            .ok_or_else(|| RuntimeError::NoInterpreter {
                language: unit.language.to_string(),
            })?;

        let path = self.scratch.persist(unit)?;
        record.path = Some(path.clone());
        record.advance(UnitState::Written);

        record.advance(UnitState::Running);
        let interpreter = Interpreter::new(spec, self.config.working_dir.as_deref());
        let stdout = interpreter.run(&path, unit, &self.output)?;
        self.stdout.push_str(&stdout);

        let values = self.scratch.read_result(unit)?;
        trace!(target: TARGET, unit = unit.short_hash(), names = ?values.keys().collect::<Vec<_>>(), "result");
        let returned = globals.merge(values);
        order.push(unit.hash.clone());
        record.advance(UnitState::Completed);
        Ok(returned)
    }
}
