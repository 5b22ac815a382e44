//! External interpreter process

use crate::error::RuntimeError;
use crate::output::{OutputEntry, OutputHandle};
use crate::unit::ExecutionUnit;
use mixl_config::LanguageSpec;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tracing::{debug, warn};

const TARGET: &str = "mixl::run";

/// Runs generated files with a configured interpreter
pub struct Interpreter<'a> {
    spec: &'a LanguageSpec,
    working_dir: Option<&'a Path>,
}

impl<'a> Interpreter<'a> {
    pub fn new(spec: &'a LanguageSpec, working_dir: Option<&'a Path>) -> Self {
        Self { spec, working_dir }
    }

    /// Run `script`, streaming stdout to `output` line by line.
    ///
    /// Returns the captured stdout. Non-zero exit is an error carrying stderr.
    pub fn run(
        &self,
        script: &Path,
        unit: &ExecutionUnit,
        output: &OutputHandle,
    ) -> Result<String, RuntimeError> {
        let mut command = Command::new(&self.spec.interpreter);
        command
            .args(&self.spec.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("PYTHONUNBUFFERED", "1");
        if let Some(dir) = self.working_dir {
            command.current_dir(dir);
        }

        debug!(
            target: TARGET,
            program = %self.spec.interpreter,
            script = %script.display(),
            "spawn"
        );
        let mut child = command.spawn().map_err(|e| RuntimeError::Launch {
            program: self.spec.interpreter.clone(),
            unit: unit.hash.clone(),
            message: e.to_string(),
        })?;

        // drained on its own thread so a chatty stderr cannot block stdout
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        let mut captured = String::new();
        if let Some(pipe) = child.stdout.take() {
            let mut reader = BufReader::new(pipe);
            let mut chunk = Vec::new();
            loop {
                chunk.clear();
                match reader.read_until(b'\n', &mut chunk) {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&chunk).into_owned();
                        output.push(OutputEntry::Stdout {
                            unit: unit.hash.clone(),
                            text: text.clone(),
                        });
                        captured.push_str(&text);
                    }
                    Err(e) => {
                        warn!(target: TARGET, unit = unit.short_hash(), "stdout read failed: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(|e| RuntimeError::Launch {
            program: self.spec.interpreter.clone(),
            unit: unit.hash.clone(),
            message: e.to_string(),
        })?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(RuntimeError::Exit {
                unit: unit.hash.clone(),
                status: describe(status),
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            debug!(target: TARGET, unit = unit.short_hash(), stderr = %stderr.trim_end(), "stderr");
        }
        Ok(captured)
    }
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => status.to_string(),
    }
}
