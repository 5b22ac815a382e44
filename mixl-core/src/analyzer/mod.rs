//! Line analyzer
//!
//! Extracts top-level variable bindings, import lines and whole function
//! definitions from one segment. Line-oriented and heuristic: no multi-line expressions,
//! no nested function registration, no tuple unpacking, no multi-line
//! strings or comments.

pub mod bindings;
pub mod functions;
pub mod token;

pub use bindings::Binding;
pub use functions::LineRole;

use crate::error::StructureError;
use crate::segment::Segment;
use crate::symbols::FunctionDef;
use mixl_config::GuestLanguage;
use token::{brace_balance, tokenize, Token, TokenKind};
use tracing::{debug, trace};

const TARGET: &str = "mixl::analyze";

/// Per-line classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    pub role: LineRole,
    /// The line opens a block that continues on later lines
    pub opens_block: bool,
    /// Top-level `import`/`require` line
    pub is_import: bool,
}

/// A top-level import, repeated in every unit generated from its segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub line: usize,
    pub text: String,
}

/// Analysis result of one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentAnalysis {
    pub bindings: Vec<Binding>,
    pub functions: Vec<FunctionDef>,
    pub imports: Vec<ImportLine>,
    /// One entry per segment line
    pub lines: Vec<LineInfo>,
}

impl SegmentAnalysis {
    /// Names bound by the segment, first occurrence order, deduplicated
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for binding in &self.bindings {
            if !names.contains(&binding.name) {
                names.push(binding.name.clone());
            }
        }
        names
    }

    /// Names bound on file lines within `first..=last`
    pub fn bound_between(&self, first: usize, last: usize) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.line >= first && b.line <= last) {
            if !names.contains(&binding.name) {
                names.push(binding.name.clone());
            }
        }
        names
    }

    /// Latest binding of each name made on a line before `line`, first occurrence order
    pub fn bindings_before(&self, line: usize) -> Vec<&Binding> {
        let mut out: Vec<&Binding> = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.line < line) {
            match out.iter_mut().find(|b| b.name == binding.name) {
                Some(slot) => *slot = binding,
                None => out.push(binding),
            }
        }
        out
    }

    /// Import lines joined in source order
    pub fn import_source(&self) -> String {
        self.imports
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `import x`, `from x import y`, `require('x')`, `const x = require('x')`
fn is_import(line: &str, tokens: &[Token], language: GuestLanguage) -> bool {
    let code: Vec<Token> = tokens
        .iter()
        .copied()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();
    let word = |idx: usize| code.get(idx).filter(|t| t.is_ident()).map(|t| t.text(line));
    let paren_at = |idx: usize| code.get(idx).is_some_and(|t| t.is_punct('('));

    match language {
        GuestLanguage::Python => match word(0) {
            Some("import") => true,
            Some("from") => code.iter().any(|t| t.is_ident() && t.text(line) == "import"),
            _ => false,
        },
        GuestLanguage::JavaScript => match word(0) {
            // `import(...)` is an expression
            Some("import") => !paren_at(1),
            Some("require") => paren_at(1),
            Some("const" | "let" | "var") => code
                .iter()
                .position(|t| t.is_punct('='))
                .is_some_and(|eq| word(eq + 1) == Some("require") && paren_at(eq + 2)),
            _ => false,
        },
    }
}

fn opens_block(tokens: &[Token], language: GuestLanguage) -> bool {
    match language {
        GuestLanguage::JavaScript => {
            let (open, close) = brace_balance(tokens);
            open > close
        }
        GuestLanguage::Python => tokens
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Comment)
            .is_some_and(|t| t.is_punct(':')),
    }
}

/// Analyze one segment
pub fn analyze(segment: &Segment) -> Result<SegmentAnalysis, StructureError> {
    let language = segment.language;
    let lines: Vec<&str> = segment.source.split('\n').collect();
    let mut tracker = functions::tracker_for(language);
    let mut analysis = SegmentAnalysis::default();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = segment.first_line + idx;
        let tokens = tokenize(line, language);
        let role = tracker.feed(idx, line_no, line, &tokens);

        let import = role == LineRole::TopLevel && is_import(line, &tokens, language);
        if import {
            trace!(target: TARGET, line = line_no, "import");
            analysis.imports.push(ImportLine {
                line: line_no,
                text: line.trim_end().to_string(),
            });
        } else if role == LineRole::TopLevel {
            let found = bindings::extract(line, &tokens, language, line_no);
            for binding in &found {
                trace!(target: TARGET, line = line_no, name = %binding.name, expr = %binding.expression, "binding");
            }
            analysis.bindings.extend(found);
        }

        analysis.lines.push(LineInfo {
            role,
            opens_block: opens_block(&tokens, language),
            is_import: import,
        });
    }

    for span in tracker.finish()? {
        let source = lines[span.header.start..=span.end].join("\n");
        trace!(target: TARGET, name = %span.header.name, params = ?span.header.params, "function");
        analysis.functions.push(FunctionDef {
            name: span.header.name,
            language,
            params: span.header.params,
            source,
            segment: segment.ordinal,
            line: span.header.line,
        });
    }

    debug!(
        target: TARGET,
        ordinal = segment.ordinal,
        language = %language,
        bindings = analysis.bindings.len(),
        functions = analysis.functions.len(),
        imports = analysis.imports.len(),
        "segment analyzed"
    );
    Ok(analysis)
}
