//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use mixl_core::{EngineError, RuntimeError};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// 加载错误（入口文件、清单）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("cannot read entry file '{path}': {message}")]
    EntryFile { path: PathBuf, message: String },

    #[error("invalid manifest '{path}': {message}")]
    Manifest { path: PathBuf, message: String },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::EntryFile { path, .. } | LoadError::Manifest { path, .. } => path,
        }
    }
}

/// MixL 错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixlError {
    /// 引擎错误（编译期或运行期）
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// 加载错误
    #[error("{0}")]
    Load(#[from] LoadError),
}

impl MixlError {
    /// 获取错误行号（如果有）
    pub fn line(&self) -> Option<usize> {
        match self {
            MixlError::Engine(e) => e.line(),
            MixlError::Load(_) => None,
        }
    }

    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            MixlError::Engine(e) => e.phase().as_str(),
            MixlError::Load(_) => "load",
        }
    }

    /// Whether nothing was spawned before the error
    pub fn is_compile_error(&self) -> bool {
        match self {
            MixlError::Engine(e) => e.is_compile_error(),
            MixlError::Load(_) => true,
        }
    }

    /// 转换为结构化错误报告
    ///
    /// CLI 直接打印，工具集成可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        match self {
            MixlError::Load(e) => ErrorReport {
                phase: "load",
                line: None,
                error_kind: match e {
                    LoadError::EntryFile { .. } => "EntryFileError".to_string(),
                    LoadError::Manifest { .. } => "ManifestError".to_string(),
                },
                message: e.to_string(),
                details: Some(ErrorDetails::File {
                    path: e.path().display().to_string(),
                }),
            },
            MixlError::Engine(e) => ErrorReport {
                phase: e.phase().as_str(),
                line: e.line(),
                error_kind: e.kind_name().to_string(),
                message: e.to_string(),
                details: engine_details(e),
            },
        }
    }
}

fn engine_details(error: &EngineError) -> Option<ErrorDetails> {
    match error {
        EngineError::Validation(errors) => Some(ErrorDetails::Tags {
            tags: errors.iter().map(|e| e.tag.clone()).collect(),
            lines: errors.iter().map(|e| e.line).collect(),
        }),
        EngineError::Redefinition(e) => Some(ErrorDetails::Previous {
            line: e.previous_line,
        }),
        EngineError::Runtime(RuntimeError::Exit { unit, stderr, .. }) => {
            Some(ErrorDetails::Unit {
                unit: unit.clone(),
                stderr: stderr.clone(),
            })
        }
        _ => None,
    }
}

/// 结构化错误报告
///
/// 上层应用（CLI、编辑器插件）可以根据自己的需求格式化。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: load, segment, analyze, resolve, codegen, run
    pub phase: &'static str,
    /// 错误行号（1-based，如果有）
    pub line: Option<usize>,
    /// 错误类型（可用于程序化处理）
    pub error_kind: String,
    /// 人类可读的错误消息
    pub message: String,
    /// 额外详情
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// 错误额外详情
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorDetails {
    /// Unknown tags and where they occur
    Tags { tags: Vec<String>, lines: Vec<usize> },
    /// Line of the earlier definition
    Previous { line: usize },
    /// Failed unit and its stderr
    Unit { unit: String, stderr: String },
    /// File the error refers to
    File { path: String },
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[line {}] {} error: {}", line, self.phase, self.message),
            None => write!(f, "[{}] error: {}", self.phase, self.message),
        }
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}
