//! Call resolver
//!
//! Finds calls to custom functions defined in other segments, checks their
//! arity, and plans how a segment is split around them.

use crate::analyzer::token::{matching_close, split_top_level, tokenize, Token};
use crate::analyzer::{LineRole, SegmentAnalysis};
use crate::error::{ArityError, EngineError, StructureError, StructureErrorKind};
use crate::language::Syntax;
use crate::segment::Segment;
use crate::symbols::FunctionTable;
use mixl_config::GuestLanguage;
use std::collections::HashSet;
use tracing::debug;

const TARGET: &str = "mixl::resolve";

/// A resolvable call expression on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub callee: String,
    /// Argument texts, top-level comma split
    pub args: Vec<String>,
    /// Byte range of the whole call expression inside its line
    pub start: usize,
    pub end: usize,
    /// 1-based file line
    pub line: usize,
}

/// A piece of a split segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubBlock {
    /// Consecutive lines without resolvable calls
    Code {
        text: String,
        first_line: usize,
        /// Names bound inside the block
        bound: Vec<String>,
    },
    /// One line carrying one or more call sites
    Call {
        text: String,
        line: usize,
        calls: Vec<CallSite>,
        bound: Vec<String>,
    },
}

impl SubBlock {
    pub fn bound(&self) -> &[String] {
        match self {
            SubBlock::Code { bound, .. } | SubBlock::Call { bound, .. } => bound,
        }
    }

    pub fn first_line(&self) -> usize {
        match self {
            SubBlock::Code { first_line, .. } => *first_line,
            SubBlock::Call { line, .. } => *line,
        }
    }
}

/// How a segment executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPlan {
    /// One unit, body verbatim
    Simple,
    /// Alternating code and call sub-blocks, in source order
    Split {
        blocks: Vec<SubBlock>,
        /// Functions defined by the segment itself; their definitions are
        /// carried into every sub-block unit
        local_functions: Vec<String>,
    },
}

impl SegmentPlan {
    pub fn call_count(&self) -> usize {
        match self {
            SegmentPlan::Simple => 0,
            SegmentPlan::Split { blocks, .. } => blocks
                .iter()
                .map(|b| match b {
                    SubBlock::Call { calls, .. } => calls.len(),
                    SubBlock::Code { .. } => 0,
                })
                .sum(),
        }
    }
}

/// Find resolvable call sites on one line.
///
/// A call is an identifier immediately followed by `(`, naming a function
/// in `functions` that is not in `local`. Introducers (`function f(`,
/// `def f(`) and method calls (`.f(`) never match; strings and comments are
/// already separate tokens. Calls nested in another resolvable call's
/// arguments travel with the outer call.
pub fn find_calls(
    line: &str,
    line_no: usize,
    language: GuestLanguage,
    functions: &FunctionTable,
    local: &HashSet<&str>,
) -> Result<Vec<CallSite>, StructureError> {
    let tokens = tokenize(line, language);
    let mut calls = Vec::new();
    let mut idx = 0;

    while idx + 1 < tokens.len() {
        if !is_call_head(line, &tokens, idx, language, functions, local) {
            idx += 1;
            continue;
        }

        let name = tokens[idx].text(line);
        let Some(close) = matching_close(&tokens, idx + 1) else {
            return Err(StructureError::new(
                StructureErrorKind::UnclosedCall {
                    name: name.to_string(),
                },
                line_no,
            ));
        };

        let args = split_top_level(&tokens[idx + 2..close], ',')
            .into_iter()
            .filter_map(|part| {
                let first = part.first()?;
                let last = part.last()?;
                Some(line[first.start..last.end].trim().to_string())
            })
            .collect();

        calls.push(CallSite {
            callee: name.to_string(),
            args,
            start: tokens[idx].start,
            end: tokens[close].end,
            line: line_no,
        });
        idx = close + 1;
    }

    Ok(calls)
}

fn is_call_head(
    line: &str,
    tokens: &[Token],
    idx: usize,
    language: GuestLanguage,
    functions: &FunctionTable,
    local: &HashSet<&str>,
) -> bool {
    let token = tokens[idx];
    let paren = tokens[idx + 1];
    if !token.is_ident() || !paren.is_punct('(') || paren.start != token.end {
        return false;
    }
    let name = token.text(line);
    if !functions.contains(name) || local.contains(name) {
        return false;
    }
    match idx.checked_sub(1).map(|prev| tokens[prev]) {
        Some(prev) if prev.is_punct('.') => false,
        Some(prev) if prev.is_ident() && prev.text(line) == language.function_keyword() => false,
        _ => true,
    }
}

/// Names of known functions called in `text` that are written in `language`
pub fn referenced_functions(
    text: &str,
    language: GuestLanguage,
    functions: &FunctionTable,
) -> Vec<String> {
    let mut names = Vec::new();
    for line in text.split('\n') {
        let tokens = tokenize(line, language);
        for idx in 0..tokens.len().saturating_sub(1) {
            if !is_call_head(line, &tokens, idx, language, functions, &HashSet::new()) {
                continue;
            }
            let name = tokens[idx].text(line);
            let same_language = functions.get(name).is_some_and(|f| f.language == language);
            if same_language && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Same-language functions reachable from `roots`, in table order
pub fn dependency_closure(
    roots: &[String],
    language: GuestLanguage,
    functions: &FunctionTable,
) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut stack: Vec<String> = roots.to_vec();
    while let Some(name) = stack.pop() {
        if seen.contains(&name) {
            continue;
        }
        let Some(def) = functions.get(&name) else {
            continue;
        };
        if def.language != language {
            continue;
        }
        stack.extend(referenced_functions(&def.source, language, functions));
        seen.push(name);
    }
    functions
        .iter()
        .filter(|f| seen.contains(&f.name))
        .map(|f| f.name.clone())
        .collect()
}

/// Plans segment execution against a complete function table
pub struct CallResolver<'a> {
    functions: &'a FunctionTable,
}

impl<'a> CallResolver<'a> {
    pub fn new(functions: &'a FunctionTable) -> Self {
        Self { functions }
    }

    /// Find every call in a segment, check arity, and build its plan
    pub fn resolve(
        &self,
        segment: &Segment,
        analysis: &SegmentAnalysis,
    ) -> Result<SegmentPlan, EngineError> {
        let local_functions: Vec<String> = self
            .functions
            .in_segment(segment.ordinal)
            .map(|f| f.name.clone())
            .collect();
        let local: HashSet<&str> = local_functions.iter().map(String::as_str).collect();

        let mut blocks = Vec::new();
        let mut pending: Vec<(usize, &str)> = Vec::new();
        let mut has_calls = false;

        for ((line_no, line), info) in segment.numbered_lines().zip(&analysis.lines) {
            // imports are repeated in every sub-unit instead
            if info.is_import {
                continue;
            }
            let calls = find_calls(line, line_no, segment.language, self.functions, &local)?;
            if info.role == LineRole::InFunction {
                // function bodies run natively where only the segment's own functions exist
                if let Some(call) = calls.first() {
                    return Err(StructureError::new(
                        StructureErrorKind::CallInBlock {
                            name: call.callee.clone(),
                        },
                        line_no,
                    )
                    .into());
                }
                continue;
            }
            if calls.is_empty() {
                pending.push((line_no, line));
                continue;
            }

            if info.role != LineRole::TopLevel || info.opens_block {
                return Err(StructureError::new(
                    StructureErrorKind::CallInBlock {
                        name: calls[0].callee.clone(),
                    },
                    line_no,
                )
                .into());
            }
            for call in &calls {
                self.check_arity(call)?;
            }

            flush_code(&mut pending, analysis, &mut blocks);
            debug!(
                target: TARGET,
                line = line_no,
                calls = ?calls.iter().map(|c| c.callee.as_str()).collect::<Vec<_>>(),
                "split point"
            );
            has_calls = true;
            blocks.push(SubBlock::Call {
                text: line.to_string(),
                line: line_no,
                calls,
                bound: analysis.bound_between(line_no, line_no),
            });
        }

        if !has_calls {
            debug!(target: TARGET, ordinal = segment.ordinal, "simple segment");
            return Ok(SegmentPlan::Simple);
        }
        flush_code(&mut pending, analysis, &mut blocks);

        debug!(
            target: TARGET,
            ordinal = segment.ordinal,
            blocks = blocks.len(),
            "split segment"
        );
        Ok(SegmentPlan::Split {
            blocks,
            local_functions,
        })
    }

    fn check_arity(&self, call: &CallSite) -> Result<(), ArityError> {
        let Some(def) = self.functions.get(&call.callee) else {
            return Ok(());
        };
        if def.arity() != call.args.len() {
            return Err(ArityError {
                name: call.callee.clone(),
                expected: def.arity(),
                actual: call.args.len(),
                line: call.line,
            });
        }
        Ok(())
    }
}

fn flush_code(pending: &mut Vec<(usize, &str)>, analysis: &SegmentAnalysis, blocks: &mut Vec<SubBlock>) {
    if pending.iter().all(|(_, line)| line.trim().is_empty()) {
        pending.clear();
        return;
    }
    let first_line = pending[0].0;
    let last_line = pending[pending.len() - 1].0;
    let text = pending.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n");
    blocks.push(SubBlock::Code {
        text,
        first_line,
        bound: analysis.bound_between(first_line, last_line),
    });
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::symbols::FunctionDef;

    fn table() -> FunctionTable {
        let mut table = FunctionTable::new();
        table
            .define(FunctionDef {
                name: "double".to_string(),
                language: GuestLanguage::Python,
                params: vec!["n".to_string()],
                source: "def double(n):\n    return twice(n)".to_string(),
                segment: 0,
                line: 2,
            })
            .unwrap();
        table
            .define(FunctionDef {
                name: "twice".to_string(),
                language: GuestLanguage::Python,
                params: vec!["n".to_string()],
                source: "def twice(n):\n    return n * 2".to_string(),
                segment: 0,
                line: 5,
            })
            .unwrap();
        table
            .define(FunctionDef {
                name: "greet".to_string(),
                language: GuestLanguage::JavaScript,
                params: vec![],
                source: "function greet() {\n  return 'hi'\n}".to_string(),
                segment: 1,
                line: 9,
            })
            .unwrap();
        table
    }

    fn js_segment(ordinal: usize, source: &str) -> Segment {
        Segment {
            language: GuestLanguage::JavaScript,
            tag: "js".to_string(),
            source: source.to_string(),
            ordinal,
            first_line: 20,
        }
    }

    fn calls(line: &str, language: GuestLanguage) -> Vec<CallSite> {
        find_calls(line, 1, language, &table(), &HashSet::new()).unwrap()
    }

    // ===== call sites =====

    #[test]
    fn test_find_calls_with_args() {
        let found = calls("let x = double(a + 1) + double([1, 2][0])", GuestLanguage::JavaScript);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].args, vec!["a + 1"]);
        assert_eq!(found[1].args, vec!["[1, 2][0]"]);
        assert_eq!(&"let x = double(a + 1)"[found[0].start..found[0].end], "double(a + 1)");
    }

    #[test]
    fn test_exclusions() {
        assert!(calls("obj.double(1)", GuestLanguage::JavaScript).is_empty());
        assert!(calls("function double(n) {", GuestLanguage::JavaScript).is_empty());
        assert!(calls("console.log('double(1)') // double(2)", GuestLanguage::JavaScript).is_empty());
        assert!(calls("undefined_fn(1)", GuestLanguage::JavaScript).is_empty());
        assert!(calls("double (1)", GuestLanguage::JavaScript).is_empty());
    }

    #[test]
    fn test_zero_args_and_inner_calls() {
        let found = calls("print(greet())", GuestLanguage::Python);
        assert_eq!(found.len(), 1);
        assert!(found[0].args.is_empty());

        let found = calls("y = double(double(2))", GuestLanguage::JavaScript);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].args, vec!["double(2)"]);
    }

    #[test]
    fn test_unclosed_call() {
        let err = find_calls("x = double(1,", 4, GuestLanguage::JavaScript, &table(), &HashSet::new())
            .unwrap_err();
        assert_eq!(err.line, 4);
    }

    // ===== dependencies =====

    #[test]
    fn test_dependency_closure_follows_same_language() {
        let deps = dependency_closure(&["double".to_string()], GuestLanguage::Python, &table());
        assert_eq!(deps, vec!["double", "twice"]);
    }

    // ===== plans =====

    #[test]
    fn test_simple_plan_without_calls() {
        let seg = js_segment(2, "let a = 1\nconsole.log(a)");
        let analysis = analyze(&seg).unwrap();
        let plan = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap();
        assert_eq!(plan, SegmentPlan::Simple);
    }

    #[test]
    fn test_split_plan() {
        let seg = js_segment(2, "let a = 1\nlet b = double(a)\n\nconsole.log(b)");
        let analysis = analyze(&seg).unwrap();
        let table = table();
        let plan = CallResolver::new(&table).resolve(&seg, &analysis).unwrap();
        let SegmentPlan::Split { blocks, local_functions } = plan else {
            panic!("expected split plan");
        };
        assert!(local_functions.is_empty());
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[0],
            SubBlock::Code {
                text: "let a = 1".to_string(),
                first_line: 20,
                bound: vec!["a".to_string()],
            }
        );
        match &blocks[1] {
            SubBlock::Call { line, calls, bound, .. } => {
                assert_eq!(*line, 21);
                assert_eq!(calls[0].callee, "double");
                assert_eq!(bound, &vec!["b".to_string()]);
            }
            other => panic!("expected call block, got {:?}", other),
        }
        assert_eq!(blocks[2].first_line(), 22);
    }

    #[test]
    fn test_arity_mismatch() {
        let seg = js_segment(2, "let b = double(1, 2)");
        let analysis = analyze(&seg).unwrap();
        let err = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap_err();
        match err {
            EngineError::Arity(e) => {
                assert_eq!((e.expected, e.actual, e.line), (1, 2, 20));
                assert!(e.to_string().contains("expected 1, got 2"));
            }
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_call_inside_block_is_structure_error() {
        let seg = js_segment(2, "if (true) {\n  double(1)\n}");
        let analysis = analyze(&seg).unwrap();
        let err = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structure(StructureError {
                kind: StructureErrorKind::CallInBlock { .. },
                line: 21
            })
        ));
    }

    #[test]
    fn test_local_functions_run_natively() {
        let seg = js_segment(1, "function greet() {\n  return 'hi'\n}\nconsole.log(greet())");
        let analysis = analyze(&seg).unwrap();
        let plan = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap();
        assert_eq!(plan, SegmentPlan::Simple);
    }

    #[test]
    fn test_foreign_call_inside_function_body_is_structure_error() {
        let seg = js_segment(2, "function wrap(v) {\n  return double(v)\n}\nconsole.log(wrap(1))");
        let analysis = analyze(&seg).unwrap();
        let err = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structure(StructureError {
                kind: StructureErrorKind::CallInBlock { ref name },
                line: 21
            }) if name == "double"
        ));
    }

    #[test]
    fn test_import_lines_stay_out_of_blocks() {
        let seg = js_segment(2, "const path = require('path')\nlet b = double(1)\nconsole.log(path.join('a', String(b)))");
        let analysis = analyze(&seg).unwrap();
        let plan = CallResolver::new(&table()).resolve(&seg, &analysis).unwrap();
        let SegmentPlan::Split { blocks, .. } = plan else {
            panic!("expected split plan");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].first_line(), 21);
        assert_eq!(blocks[1].first_line(), 22);
    }
}
