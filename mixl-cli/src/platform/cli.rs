//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示、源码上下文打印和构建结果展示。

use mixl_api::{BuildOutput, CheckOutput, MixlError, OutputBuffer, OutputEntry};
use std::io::Write;

/// Streams unit stdout to the terminal as it arrives
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl OutputBuffer for ConsoleOutput {
    fn push(&self, entry: OutputEntry) {
        print_entry(&entry);
    }

    fn drain(&self) -> Vec<OutputEntry> {
        Vec::new()
    }

    fn is_empty(&self) -> bool {
        true
    }
}

/// Print one output entry: stdout to stdout, everything else to stderr
pub fn print_entry(entry: &OutputEntry) {
    match entry {
        OutputEntry::Stdout { text, .. } => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
        OutputEntry::Warning(message) => eprintln!("⚠️  {}", message),
        OutputEntry::Info(message) => eprintln!("{}", message),
    }
}

/// 打印错误并显示源代码上下文
pub fn print_error_with_source(e: &MixlError, source: &str) {
    eprintln!("❌ {}", e);

    if let Some(context) = e.line().and_then(|line| source_context(source, line)) {
        eprint!("{}", context);
    }
}

/// 源代码上下文（错误行前后几行），行号越界时返回 None
pub fn source_context(source: &str, error_line: usize) -> Option<String> {
    const CONTEXT_LINES: usize = 2; // 错误行前后显示的上下文行数

    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return None;
    }

    let start_line = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end_line.to_string().len();
    let separator = "-".repeat(width + 1);

    let mut out = format!("{}|--\n", separator);
    for line_no in start_line..=end_line {
        let content = lines[line_no - 1];
        out.push_str(&format!("{:>width$} | {}\n", line_no, content, width = width));

        if line_no == error_line {
            // 标记从第一个非空白字符开始
            let indent = content.len() - content.trim_start().len();
            let marks = content.trim().chars().count().max(1);
            out.push_str(&format!(
                "{} | {}{}\n",
                " ".repeat(width),
                " ".repeat(indent),
                "^".repeat(marks)
            ));
        }
    }
    out.push_str(&format!("{}|--\n", separator));
    Some(out)
}

/// `--show-order`: execution-order log
pub fn print_order(output: &BuildOutput) {
    eprintln!("[Execution Order]");
    for (idx, hash) in output.execution_order.iter().enumerate() {
        eprintln!("{:3}. {}", idx + 1, hash);
    }
}

/// `--bench`: per-stage and per-unit timings
pub fn print_bench(output: &BuildOutput) {
    eprint!("{}", format_bench(output));
}

/// Stage and per-unit timing table
pub fn format_bench(output: &BuildOutput) -> String {
    let mut out = String::from("[Stages]\n");
    for (phase, elapsed) in output.timings.iter() {
        out.push_str(&format!(
            "  {:<8} {:>10.3}ms\n",
            phase.as_str(),
            elapsed.as_secs_f64() * 1000.0
        ));
    }
    out.push_str(&format!(
        "  {:<8} {:>10.3}ms\n",
        "total",
        output.timings.total().as_secs_f64() * 1000.0
    ));

    out.push_str("[Units]\n");
    for unit in &output.units {
        out.push_str(&format!(
            "  {} {:<4} {:<10} line {:<4} {:>10.3}ms\n",
            unit.hash.get(..12).unwrap_or(&unit.hash),
            unit.kind,
            unit.language,
            unit.first_line,
            unit.elapsed.as_secs_f64() * 1000.0
        ));
    }
    out.push_str(&format!(
        "  {:<8} {:>10.3}ms\n",
        "total",
        output.units_elapsed().as_secs_f64() * 1000.0
    ));
    out
}

/// `mixl check` summary
pub fn format_check(output: &CheckOutput) -> String {
    let mut out = String::from("[Segments]\n");
    for segment in &output.segments {
        let plan = match segment.calls {
            0 => "simple".to_string(),
            1 => "1 call".to_string(),
            n => format!("{} calls", n),
        };
        out.push_str(&format!(
            "  #{} [{}] {} lines {}-{} ({})\n",
            segment.ordinal,
            segment.tag,
            segment.language,
            segment.first_line,
            segment.first_line + segment.line_count.saturating_sub(1),
            plan
        ));
    }

    if !output.functions.is_empty() {
        out.push_str("[Functions]\n");
        for function in &output.functions {
            out.push_str(&format!(
                "  {}({}) {} line {}\n",
                function.name,
                function.params.join(", "),
                function.language,
                function.line
            ));
        }
    }

    if !output.globals.is_empty() {
        out.push_str(&format!("[Globals]\n  {}\n", output.globals.join(", ")));
    }
    out
}
