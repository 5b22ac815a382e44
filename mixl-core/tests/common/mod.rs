//! 测试辅助工具
//!
//! Helpers shared by the engine integration tests

#![allow(dead_code)]

use mixl_core::{
    new_output_buffer, EngineConfig, EngineError, OutputHandle, Program, RunReport, Scheduler,
};
use std::path::Path;
use std::process::{Command, Stdio};

/// Whether an interpreter program can be launched
pub fn have_interpreter(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Whether both default interpreters are installed
pub fn have_guests() -> bool {
    have_interpreter("node") && have_interpreter("python3")
}

/// Skip the current test when `node`/`python3` are missing
#[macro_export]
macro_rules! require_guests {
    () => {
        if !common::have_guests() {
            eprintln!("skipping: node and python3 are required");
            return;
        }
    };
}

/// Default engine config writing into `scratch`
pub fn config_in(scratch: &Path) -> EngineConfig {
    EngineConfig {
        scratch_dir: scratch.to_path_buf(),
        ..EngineConfig::default()
    }
}

/// Compile only
pub fn compile(source: &str) -> Result<Program, EngineError> {
    Program::compile(source, &EngineConfig::default())
}

/// Compile and run against a fresh scratch directory
pub fn run_in(scratch: &Path, source: &str) -> Result<RunReport, EngineError> {
    run_with_output(scratch, source, new_output_buffer())
}

pub fn run_with_output(
    scratch: &Path,
    source: &str,
    output: OutputHandle,
) -> Result<RunReport, EngineError> {
    let config = config_in(scratch);
    let program = Program::compile(source, &config)?;
    let mut scheduler = Scheduler::new(config, output);
    program.run(&mut scheduler)
}

/// Output lines, trimmed
pub fn lines(report: &RunReport) -> Vec<&str> {
    report.stdout.lines().map(str::trim).collect()
}
