//! 项目清单（mixconf.json）
//!
//! The CLI accepts a `.mixl` file, a manifest path, or a directory that
//! contains a manifest.

use crate::config::{set_interpreter, set_languages};
use mixl_api::{EngineConfig, LoadError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "mixconf.json";

/// mixconf.json 结构
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    /// 入口文件路径（相对清单所在目录）
    pub main: String,
    /// Accepted segment tags; empty keeps the defaults
    #[serde(default)]
    pub languages: Vec<String>,
    /// tag -> interpreter command
    #[serde(default)]
    pub interpreters: BTreeMap<String, String>,
    pub scratch_dir: Option<PathBuf>,
}

impl Manifest {
    /// Apply languages, interpreters and scratch dir to an engine config
    pub fn apply(&self, root: &Path, engine: &mut EngineConfig) -> Result<(), String> {
        if !self.languages.is_empty() {
            set_languages(engine, &self.languages)?;
        }
        for (tag, command) in &self.interpreters {
            set_interpreter(engine, tag, command)?;
        }
        if let Some(dir) = &self.scratch_dir {
            engine.scratch_dir = root.join(dir);
        }
        Ok(())
    }
}

/// Where a build starts from
#[derive(Debug, Clone)]
pub struct Project {
    /// Entry `.mixl` file
    pub entry: PathBuf,
    pub manifest: Option<Manifest>,
    /// Directory holding the manifest (or the entry file)
    pub root: PathBuf,
}

impl Project {
    /// Engine config for this project
    pub fn engine_config(&self) -> Result<EngineConfig, LoadError> {
        let mut engine = EngineConfig::default();
        if let Some(manifest) = &self.manifest {
            manifest
                .apply(&self.root, &mut engine)
                .map_err(|message| LoadError::Manifest {
                    path: self.root.join(MANIFEST_FILE),
                    message,
                })?;
        }
        Ok(engine)
    }

    /// Display name: manifest name, or the entry file name
    pub fn name(&self) -> String {
        self.manifest
            .as_ref()
            .and_then(|m| m.name.clone())
            .or_else(|| {
                self.entry
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "mixl".to_string())
    }
}

/// Resolve a command-line path into a project
pub fn locate(path: &Path) -> Result<Project, LoadError> {
    if path.is_dir() {
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(LoadError::Manifest {
                path: manifest_path,
                message: "当前目录不是一个 MixL 项目（未找到 mixconf.json）".to_string(),
            });
        }
        return from_manifest(&manifest_path);
    }

    let is_manifest = path.file_name().is_some_and(|n| n == MANIFEST_FILE)
        || path.extension().is_some_and(|e| e == "json");
    if is_manifest {
        return from_manifest(path);
    }

    let entry = absolute(path).map_err(|message| LoadError::EntryFile {
        path: path.to_path_buf(),
        message,
    })?;
    let root = mixl_api::base_dir_of(&entry);
    Ok(Project {
        entry,
        manifest: None,
        root,
    })
}

/// Read and validate a manifest
pub fn read_manifest(path: &Path) -> Result<Manifest, LoadError> {
    let manifest_error = |message: String| LoadError::Manifest {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    let manifest: Manifest =
        serde_json::from_str(&content).map_err(|e| manifest_error(format!("解析失败: {}", e)))?;

    if manifest.main.trim().is_empty() {
        return Err(manifest_error("'main' 字段不能为空".to_string()));
    }
    Ok(manifest)
}

fn from_manifest(path: &Path) -> Result<Project, LoadError> {
    let manifest = read_manifest(path)?;
    let path = absolute(path).map_err(|message| LoadError::Manifest {
        path: path.to_path_buf(),
        message,
    })?;
    let root = mixl_api::base_dir_of(&path);
    Ok(Project {
        entry: root.join(&manifest.main),
        manifest: Some(manifest),
        root,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    std::path::absolute(path).map_err(|e| e.to_string())
}
