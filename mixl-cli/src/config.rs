//! CLI 配置
//!
//! 包含 CLI 特有的配置：日志配置，以及清单与命令行参数组合出的运行配置

use mixl_api::{EngineConfig, GuestLanguage, LanguageSpec, OutputHandle, RunConfig};
use mixl_config::Phase;
use std::path::PathBuf;
use tracing::Level;

/// CLI 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub segment: Option<Level>,
    pub analyze: Option<Level>,
    pub resolve: Option<Level>,
    pub codegen: Option<Level>,
    pub run: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            segment: None,
            analyze: None,
            resolve: None,
            codegen: None,
            run: None,
        }
    }
}

impl LogConfig {
    /// Global level from the number of `-v` flags
    pub fn from_verbosity(verbose: u8) -> Self {
        let global = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            global,
            ..Self::default()
        }
    }

    /// Get log level for a specific phase
    pub fn level_for(&self, phase: Phase) -> Level {
        let level = match phase {
            Phase::Segment => self.segment,
            Phase::Analyze => self.analyze,
            Phase::Resolve => self.resolve,
            Phase::Codegen => self.codegen,
            Phase::Run => self.run,
        };
        level.unwrap_or(self.global)
    }
}

/// Guest language denoted by a well-known tag
pub fn language_for_tag(tag: &str) -> Option<GuestLanguage> {
    match tag.to_ascii_lowercase().as_str() {
        "js" | "javascript" | "node" => Some(GuestLanguage::JavaScript),
        "py" | "python" | "python3" => Some(GuestLanguage::Python),
        _ => None,
    }
}

/// Replace the accepted tags; unknown tag names are rejected
pub fn set_languages(engine: &mut EngineConfig, tags: &[String]) -> Result<(), String> {
    let mut languages = Vec::with_capacity(tags.len());
    for tag in tags {
        let language =
            language_for_tag(tag).ok_or_else(|| format!("unknown language tag '{}'", tag))?;
        languages.push(LanguageSpec::new(tag.clone(), language));
    }
    engine.languages = languages;
    Ok(())
}

/// Point a tag at another interpreter command (`"python3 -X utf8"` splits into program and args)
pub fn set_interpreter(engine: &mut EngineConfig, tag: &str, command: &str) -> Result<(), String> {
    let mut words = command.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| format!("empty interpreter command for '{}'", tag))?;

    let spec = engine
        .languages
        .iter_mut()
        .find(|spec| spec.matches(tag))
        .ok_or_else(|| format!("no language tag '{}' to set an interpreter for", tag))?;
    spec.interpreter = program.to_string();
    spec.args = words.map(str::to_string).collect();
    Ok(())
}

/// Command-line overrides applied on top of the manifest
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub scratch_dir: Option<PathBuf>,
    pub interpreters: Vec<(String, String)>,
    pub show_steps: bool,
}

/// Assemble the run configuration
pub fn build_run_config(
    mut engine: EngineConfig,
    overrides: &Overrides,
    output: OutputHandle,
) -> Result<RunConfig, String> {
    if let Some(dir) = &overrides.scratch_dir {
        engine.scratch_dir = std::path::absolute(dir)
            .map_err(|e| format!("invalid scratch dir '{}': {}", dir.display(), e))?;
    }
    for (tag, command) in &overrides.interpreters {
        set_interpreter(&mut engine, tag, command)?;
    }

    Ok(RunConfig {
        engine,
        output,
        show_steps: overrides.show_steps,
    })
}

/// Parse a `tag=program` argument
pub fn parse_interpreter_arg(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((tag, command)) if !tag.trim().is_empty() && !command.trim().is_empty() => {
            Ok((tag.trim().to_string(), command.trim().to_string()))
        }
        _ => Err(format!("expected TAG=PROGRAM, got '{}'", arg)),
    }
}
