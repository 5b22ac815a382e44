//! 测试辅助工具
//!
//! 提供端到端测试的辅助函数

#![allow(dead_code)]

use mixl_workspace::{build_source, new_output_buffer, BuildOutput, MixlError, RunConfig};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Whether `node` and `python3` can both be launched
pub fn have_guests() -> bool {
    ["node", "python3"].iter().all(|program| {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    })
}

/// Skip the current test when the interpreters are missing
#[macro_export]
macro_rules! require_guests {
    () => {
        if !common::have_guests() {
            eprintln!("skipping: node and python3 are required");
            return;
        }
    };
}

/// Path of a bundled demo project
pub fn demo_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

/// Default config whose scratch dir lives under `dir`
pub fn config_in(dir: &Path) -> RunConfig {
    let mut config = RunConfig::default().with_output(new_output_buffer());
    config.engine.scratch_dir = dir.join(".mixl");
    config
}

/// Build source text with the scratch dir under `dir`
pub fn build_in(dir: &Path, source: &str) -> Result<BuildOutput, MixlError> {
    build_source(source, dir, &config_in(dir))
}

/// Output lines, trimmed
pub fn lines(output: &BuildOutput) -> Vec<&str> {
    output.stdout.lines().map(str::trim).collect()
}

/// Files in a directory with the given extension
pub fn files_with_extension(dir: &Path, ext: &str) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|x| x == ext))
                .count()
        })
        .unwrap_or(0)
}
