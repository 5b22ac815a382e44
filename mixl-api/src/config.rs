//! API 层配置
//!
//! RunConfig 组合引擎配置与输出通道，按参数显式传递，没有全局单例。

use mixl_config::EngineConfig;
use mixl_core::{new_output_buffer, OutputHandle};
use std::path::{Path, PathBuf};

/// Build configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Engine configuration (languages, scratch dir, working dir)
    pub engine: EngineConfig,
    /// Sink receiving unit stdout and warnings as they are produced
    pub output: OutputHandle,
    /// Whether to report every dispatched unit on the output sink
    pub show_steps: bool,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("engine", &self.engine)
            .field("show_steps", &self.show_steps)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            output: new_output_buffer(),
            show_steps: false,
        }
    }
}

impl RunConfig {
    /// Use a specific output sink
    pub fn with_output(mut self, output: OutputHandle) -> Self {
        self.output = output;
        self
    }

    /// Engine config with relative paths anchored at `base_dir`.
    ///
    /// A relative scratch dir lands next to the entry file, and interpreters
    /// run in the entry file's directory unless a working dir is configured.
    pub fn engine_for(&self, base_dir: &Path) -> EngineConfig {
        let mut engine = self.engine.clone();
        if engine.scratch_dir.is_relative() {
            engine.scratch_dir = base_dir.join(&engine.scratch_dir);
        }
        match &engine.working_dir {
            Some(dir) if dir.is_relative() => {
                engine.working_dir = Some(base_dir.join(dir));
            }
            Some(_) => {}
            None => engine.working_dir = Some(base_dir.to_path_buf()),
        }
        engine
    }
}

/// Directory an entry file's relative paths are resolved against
pub fn base_dir_of(entry: &Path) -> PathBuf {
    match entry.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let cfg = RunConfig::default();
        assert!(!cfg.show_steps);
        assert_eq!(cfg.engine, EngineConfig::default());
        assert!(cfg.output.is_empty());
    }

    #[test]
    fn test_run_config_debug() {
        let debug_str = format!("{:?}", RunConfig::default());
        assert!(debug_str.contains("engine"));
        assert!(debug_str.contains("show_steps"));
        assert!(!debug_str.contains("output"));
    }

    #[test]
    fn test_relative_scratch_dir_is_anchored() {
        let cfg = RunConfig::default();
        let engine = cfg.engine_for(Path::new("/work/demo"));
        assert_eq!(engine.scratch_dir, PathBuf::from("/work/demo/.mixl"));
        assert_eq!(engine.working_dir, Some(PathBuf::from("/work/demo")));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut cfg = RunConfig::default();
        cfg.engine.scratch_dir = PathBuf::from("/tmp/scratch");
        cfg.engine.working_dir = Some(PathBuf::from("/srv"));
        let engine = cfg.engine_for(Path::new("/work/demo"));
        assert_eq!(engine.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(engine.working_dir, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_base_dir_of_bare_file_name() {
        assert_eq!(base_dir_of(Path::new("main.mixl")), PathBuf::from("."));
        assert_eq!(base_dir_of(Path::new("app/main.mixl")), PathBuf::from("app"));
    }
}
