//! MixL Core - the polyglot engine
//!
//! Segments a `.mixl` source, analyzes each guest-language segment, resolves
//! cross-language calls, generates self-contained wrapper programs, and
//! dispatches them one at a time to external interpreters.
//!
//! Configuration is passed explicitly via parameters, not via global state.
//! No tracing subscriber is installed here; front ends decide how to log.

pub mod analyzer;
pub mod codegen;
pub mod error;
pub mod language;
pub mod output;
pub mod program;
pub mod resolver;
pub mod scheduler;
pub mod segment;
pub mod symbols;
pub mod unit;

pub use error::{
    ArityError, EngineError, RedefinitionError, RuntimeError, StructureError, StructureErrorKind,
    UndefinedReferenceError, ValidationError,
};
pub use output::{new_output_buffer, OutputBuffer, OutputEntry, OutputHandle};
pub use program::{Program, RunReport, StageTimings};
pub use resolver::SegmentPlan;
pub use scheduler::{DispatchGate, Scheduler, UnitRecord};
pub use segment::{Segment, SegmentWarning, Segmenter};
pub use symbols::{FunctionTable, GlobalSymbols, Literal, RETURN_KEY};
pub use unit::{ExecutionUnit, UnitKind, UnitState};

// Re-export config types from mixl-config
pub use mixl_config::{EngineConfig, GuestLanguage, LanguageSpec, Phase};

/// Compile and run a source in one go
pub fn execute(
    source: &str,
    config: &EngineConfig,
    output: OutputHandle,
) -> Result<RunReport, EngineError> {
    let program = Program::compile(source, config)?;
    let mut scheduler = Scheduler::new(config.clone(), output);
    program.run(&mut scheduler)
}
