//! API 类型定义
//!
//! 构建和检查的输出类型。

use mixl_config::GuestLanguage;
use mixl_core::{GlobalSymbols, RunReport, StageTimings, UnitRecord};
use std::path::PathBuf;
use std::time::Duration;

/// 构建输出
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// 各单元标准输出，按执行顺序拼接
    pub stdout: String,
    /// 执行顺序日志（单元内容哈希）
    pub execution_order: Vec<String>,
    /// 每个单元的执行记录
    pub units: Vec<UnitRecord>,
    /// 各阶段耗时
    pub timings: StageTimings,
    /// 运行结束时的全局符号
    pub globals: GlobalSymbols,
    pub warnings: Vec<String>,
    /// 实际使用的临时目录
    pub scratch_dir: PathBuf,
}

impl BuildOutput {
    pub(crate) fn from_report(report: RunReport, scratch_dir: PathBuf) -> Self {
        Self {
            stdout: report.stdout,
            execution_order: report.execution_order,
            units: report.units,
            timings: report.timings,
            globals: report.globals,
            warnings: report.warnings,
            scratch_dir,
        }
    }

    /// Sum of per-unit wall time
    pub fn units_elapsed(&self) -> Duration {
        self.units.iter().map(|u| u.elapsed).sum()
    }
}

/// One segment as seen by the compile phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSummary {
    pub ordinal: usize,
    pub tag: String,
    pub language: GuestLanguage,
    pub first_line: usize,
    pub line_count: usize,
    /// Cross-language calls in the segment (0 = one simple unit)
    pub calls: usize,
}

/// A registered custom function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSummary {
    pub name: String,
    pub language: GuestLanguage,
    pub params: Vec<String>,
    pub line: usize,
}

/// 检查输出（只编译，不执行）
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutput {
    pub segments: Vec<SegmentSummary>,
    pub functions: Vec<FunctionSummary>,
    /// Declared global names, in declaration order
    pub globals: Vec<String>,
    pub warnings: Vec<String>,
    pub timings: StageTimings,
}
