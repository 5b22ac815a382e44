//! MixL API - Build orchestration layer
//!
//! Provides the unified build interface, including:
//! - Build flow orchestration (`build`, `build_source`, `check`)
//! - Configuration abstraction (RunConfig)
//! - Unified error handling (MixlError)
//!
//! Configuration is always passed explicitly; there is no global state.

use std::path::Path;
use tracing::{debug, info};

use mixl_core::{Program, Scheduler};

pub mod config;
pub use config::{base_dir_of, RunConfig};

pub mod error;
pub mod types;
pub use error::{ErrorDetails, ErrorReport, LoadError, MixlError};
pub use types::{BuildOutput, CheckOutput, FunctionSummary, SegmentSummary};

// Re-export core and config types
pub use mixl_config;
pub use mixl_config::{EngineConfig, GuestLanguage, LanguageSpec, Phase, DEFAULT_SCRATCH_DIR};
pub use mixl_core;
pub use mixl_core::{
    new_output_buffer, EngineError, OutputBuffer, OutputEntry, OutputHandle,
    StageTimings, UnitKind, UnitRecord, UnitState,
};

const TARGET: &str = "mixl::api";

/// Read an entry file
pub fn load_entry(entry: &Path) -> Result<String, MixlError> {
    std::fs::read_to_string(entry).map_err(|e| {
        MixlError::Load(LoadError::EntryFile {
            path: entry.to_path_buf(),
            message: e.to_string(),
        })
    })
}

/// Build a `.mixl` file: compile it, then run every unit in source order
pub fn build(entry: &Path, config: &RunConfig) -> Result<BuildOutput, MixlError> {
    info!(target: TARGET, entry = %entry.display(), "Starting build");
    let source = load_entry(entry)?;
    build_source(&source, &base_dir_of(entry), config)
}

/// Build source text whose relative paths resolve against `base_dir`
pub fn build_source(
    source: &str,
    base_dir: &Path,
    config: &RunConfig,
) -> Result<BuildOutput, MixlError> {
    let engine = config.engine_for(base_dir);

    // Compile phase spawns nothing and creates no scratch files
    let program = Program::compile(source, &engine)?;
    debug!(
        target: TARGET,
        segments = program.segments().len(),
        functions = program.functions().len(),
        "compiled"
    );

    let scratch_dir = engine.scratch_dir.clone();
    let mut scheduler = Scheduler::new(engine, config.output.clone());
    let report = program.run(&mut scheduler)?;

    if config.show_steps {
        for (step, unit) in report.units.iter().enumerate() {
            config.output.push(OutputEntry::Info(format!(
                "step {}: {} {} {} (line {}, {:.1}ms)",
                step + 1,
                unit.kind,
                unit.language,
                unit.hash.get(..12).unwrap_or(&unit.hash),
                unit.first_line,
                unit.elapsed.as_secs_f64() * 1000.0,
            )));
        }
    }

    info!(
        target: TARGET,
        units = report.execution_order.len(),
        "Build completed"
    );
    Ok(BuildOutput::from_report(report, scratch_dir))
}

/// Run the compile phase of a `.mixl` file only
pub fn check(entry: &Path, config: &RunConfig) -> Result<CheckOutput, MixlError> {
    let source = load_entry(entry)?;
    check_source(&source, config)
}

/// Validate, analyze and resolve source text without running anything
pub fn check_source(source: &str, config: &RunConfig) -> Result<CheckOutput, MixlError> {
    let program = Program::compile(source, &config.engine)?;

    let segments = program
        .segments()
        .iter()
        .zip(program.plans())
        .map(|(segment, plan)| SegmentSummary {
            ordinal: segment.ordinal,
            tag: segment.tag.clone(),
            language: segment.language,
            first_line: segment.first_line,
            line_count: segment.source.lines().count(),
            calls: plan.call_count(),
        })
        .collect();

    let functions = program
        .functions()
        .iter()
        .map(|def| FunctionSummary {
            name: def.name.clone(),
            language: def.language,
            params: def.params.clone(),
            line: def.line,
        })
        .collect();

    Ok(CheckOutput {
        segments,
        functions,
        globals: program
            .declarations()
            .iter()
            .map(|d| d.name.clone())
            .collect(),
        warnings: program.warnings().iter().map(ToString::to_string).collect(),
        timings: program.timings().clone(),
    })
}
