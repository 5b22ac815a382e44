//! Code generator
//!
//! Wraps guest code into self-contained programs:
//!
//! ```text
//! preamble   one native declaration per known global
//! definitions functions the unit needs (split segments, invocations)
//! body       the guest code itself
//! postamble  serialize tracked names to <own file name>.json
//! ```

pub mod javascript;
pub mod python;

pub use javascript::JavaScriptEmitter;
pub use python::PythonEmitter;

use crate::analyzer::token::{tokenize, TokenKind};
use crate::analyzer::SegmentAnalysis;
use crate::error::UndefinedReferenceError;
use crate::language::Syntax;
use crate::resolver::{dependency_closure, referenced_functions, CallSite, SubBlock};
use crate::segment::Segment;
use crate::symbols::{FunctionDef, FunctionTable, GlobalSymbols, Literal, RETURN_KEY};
use crate::unit::{ExecutionUnit, PendingCall, UnitKind};
use mixl_config::GuestLanguage;
use tracing::trace;

const TARGET: &str = "mixl::codegen";

/// Placeholder marker used in split-segment templates
pub const PLACEHOLDER_PREFIX: &str = "PLACEHOLDER_";

/// Per-language source emitter
pub trait Emitter: Sync {
    fn language(&self) -> GuestLanguage;

    /// One preamble declaration
    fn declare(&self, name: &str, value: &str) -> String;

    /// Statement storing `call`'s result under the reserved return name
    fn capture_return(&self, call: &str) -> String;

    /// Serialize every existing name in `names` to the unit's result file
    fn postamble(&self, names: &[String]) -> String;
}

pub fn emitter_for(language: GuestLanguage) -> &'static dyn Emitter {
    match language {
        GuestLanguage::JavaScript => &JavaScriptEmitter,
        GuestLanguage::Python => &PythonEmitter,
    }
}

/// A split-segment sub-block whose global values are filled in late
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTemplate {
    pub language: GuestLanguage,
    pub imports: String,
    pub preamble: String,
    pub body: String,
    pub postamble: String,
    pub placeholders: Vec<String>,
    /// Declarations of names bound earlier in the segment, used when the
    /// value never reached a result file (functions, `undefined`)
    pub fallbacks: Vec<(String, String)>,
    pub tracked: Vec<String>,
    pub first_line: usize,
}

impl UnitTemplate {
    /// Substitute every placeholder with the current value of its global
    pub fn fill(&self, globals: &GlobalSymbols) -> Result<ExecutionUnit, UndefinedReferenceError> {
        let preamble = fill_placeholders(&self.preamble, |name| {
            globals
                .get(name)
                .map(|value| value.render(self.language))
                .or_else(|| {
                    self.fallbacks
                        .iter()
                        .find(|(bound, _)| bound == name)
                        .map(|(_, expression)| expression.clone())
                })
                .ok_or_else(|| UndefinedReferenceError {
                    name: name.to_string(),
                    line: self.first_line,
                })
        })?;
        Ok(ExecutionUnit::new(
            self.language,
            UnitKind::Segment,
            assemble(&[&self.imports, &preamble, &self.body, &self.postamble]),
            self.tracked.clone(),
            self.first_line,
        ))
    }
}

pub fn placeholder(name: &str) -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, name)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Replace `PLACEHOLDER_<name>` tokens in one pass; substituted values are never rescanned
pub fn fill_placeholders<E>(
    text: &str,
    mut lookup: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(pos) = rest.find(PLACEHOLDER_PREFIX) {
        let before = rest[..pos].chars().next_back().or(prev);
        out.push_str(&rest[..pos]);
        let after = &rest[pos + PLACEHOLDER_PREFIX.len()..];
        let name_len = after
            .char_indices()
            .find(|(_, c)| !is_word_char(*c))
            .map_or(after.len(), |(i, _)| i);

        if name_len == 0 || before.is_some_and(is_word_char) {
            out.push_str(PLACEHOLDER_PREFIX);
            prev = PLACEHOLDER_PREFIX.chars().next_back();
            rest = after;
            continue;
        }

        out.push_str(&lookup(&after[..name_len])?);
        prev = after[..name_len].chars().next_back();
        rest = &after[name_len..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Translate `true/false/null` keyword literals between languages, outside strings
pub fn translate_literals(text: &str, from: GuestLanguage, to: GuestLanguage) -> String {
    if from == to {
        return text.to_string();
    }
    let (ft, ff, fnull) = from.keyword_literals();
    let (tt, tf, tnull) = to.keyword_literals();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for token in tokenize(text, from) {
        if token.kind != TokenKind::Ident {
            continue;
        }
        let word = token.text(text);
        let replacement = match word {
            w if w == ft => tt,
            w if w == ff => tf,
            w if w == fnull => tnull,
            "undefined" if from == GuestLanguage::JavaScript => tnull,
            _ => continue,
        };
        out.push_str(&text[cursor..token.start]);
        out.push_str(replacement);
        cursor = token.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn assemble(parts: &[&str]) -> String {
    let mut source = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    source.push('\n');
    source
}

fn push_unique(names: &mut Vec<String>, extra: &[String]) {
    for name in extra {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
}

/// Globals that can be declared in `language`
pub fn visible_globals(globals: &GlobalSymbols, language: GuestLanguage) -> Vec<String> {
    globals
        .names()
        .filter(|name| language.is_valid_identifier(name))
        .map(str::to_string)
        .collect()
}

/// Globals whose names `language` cannot declare; units of that language never see them
pub fn hidden_globals(globals: &GlobalSymbols, language: GuestLanguage) -> Vec<String> {
    globals
        .names()
        .filter(|name| !language.is_valid_identifier(name))
        .map(str::to_string)
        .collect()
}

/// Code every unit of a split segment repeats
#[derive(Debug, Clone, Copy)]
pub struct SegmentContext<'s> {
    pub language: GuestLanguage,
    /// Top-level import lines, placed first
    pub imports: &'s str,
    /// The segment's own function definitions
    pub definitions: &'s str,
    pub analysis: &'s SegmentAnalysis,
}

impl SegmentContext<'_> {
    /// `(name, expression)` of every name the segment bound before `line`
    pub fn fallbacks(&self, line: usize) -> Vec<(String, String)> {
        self.analysis
            .bindings_before(line)
            .into_iter()
            .map(|b| (b.name.clone(), b.expression.clone()))
            .collect()
    }
}

/// Generates execution units against a compiled function table
pub struct CodeGenerator<'a> {
    functions: &'a FunctionTable,
    /// Import lines per segment ordinal
    imports: Vec<String>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(functions: &'a FunctionTable) -> Self {
        Self {
            functions,
            imports: Vec::new(),
        }
    }

    /// Imports of each segment, carried along with its functions into invocation units
    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    /// Preamble declaring `names`, each rendered by `value`
    fn preamble<'n>(
        &self,
        language: GuestLanguage,
        names: impl Iterator<Item = &'n str>,
        skip: &[String],
        mut value: impl FnMut(&str) -> String,
    ) -> (String, Vec<String>) {
        let emitter = emitter_for(language);
        let conflicts = language.redeclaration_conflicts();
        let mut declared = Vec::new();
        let lines: Vec<String> = names
            .filter(|name| !(conflicts && skip.iter().any(|s| s.as_str() == *name)))
            .map(|name| {
                declared.push(name.to_string());
                emitter.declare(name, &value(name))
            })
            .collect();
        (lines.join("\n"), declared)
    }

    fn concrete_preamble(&self, language: GuestLanguage, globals: &GlobalSymbols, skip: &[String]) -> String {
        let names = visible_globals(globals, language);
        self.preamble(language, names.iter().map(String::as_str), skip, |name| {
            globals
                .get(name)
                .map(|v| v.render(language))
                .unwrap_or_else(|| language.keyword_literals().2.to_string())
        })
        .0
    }

    /// Whole segment as one unit
    pub fn simple_unit(&self, segment: &Segment, bound: &[String], globals: &GlobalSymbols) -> ExecutionUnit {
        let language = segment.language;
        let preamble = self.concrete_preamble(language, globals, bound);
        let mut tracked = visible_globals(globals, language);
        push_unique(&mut tracked, bound);
        let postamble = emitter_for(language).postamble(&tracked);

        trace!(target: TARGET, ordinal = segment.ordinal, tracked = ?tracked, "simple unit");
        ExecutionUnit::new(
            language,
            UnitKind::Segment,
            assemble(&[&preamble, &segment.source, &postamble]),
            tracked,
            segment.first_line,
        )
    }

    /// Definitions of a split segment's own functions, in definition order
    pub fn local_definitions(&self, local_functions: &[String]) -> String {
        local_functions
            .iter()
            .filter_map(|name| self.functions.get(name))
            .map(|def| def.source.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Deduplicated import lines of the given segments
    fn imports_of(&self, segments: impl Iterator<Item = usize>) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for ordinal in segments {
            let Some(text) = self.imports.get(ordinal) else {
                continue;
            };
            for line in text.lines() {
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
        }
        lines.join("\n")
    }

    /// Build templates for the code sub-blocks of a split segment.
    ///
    /// Returns one entry per block (`None` for call blocks). Placeholders
    /// cover every runtime global plus every name bound by an earlier block.
    pub fn plan_templates(
        &self,
        ctx: &SegmentContext<'_>,
        blocks: &[SubBlock],
        globals: &GlobalSymbols,
    ) -> Vec<Option<UnitTemplate>> {
        let language = ctx.language;
        let emitter = emitter_for(language);
        let mut known = visible_globals(globals, language);
        let mut templates = Vec::with_capacity(blocks.len());

        for block in blocks {
            match block {
                SubBlock::Code {
                    text,
                    first_line,
                    bound,
                } => {
                    let (preamble, placeholders) =
                        self.preamble(language, known.iter().map(String::as_str), bound, placeholder);
                    let mut tracked = known.clone();
                    push_unique(&mut tracked, bound);
                    let body = assemble(&[ctx.definitions, text]);
                    templates.push(Some(UnitTemplate {
                        language,
                        imports: ctx.imports.to_string(),
                        preamble,
                        body: body.trim_end_matches('\n').to_string(),
                        postamble: emitter.postamble(&tracked),
                        placeholders,
                        fallbacks: ctx.fallbacks(*first_line),
                        tracked,
                        first_line: *first_line,
                    }));
                }
                SubBlock::Call { .. } => templates.push(None),
            }
            push_unique(&mut known, block.bound());
        }
        templates
    }

    /// Program running one cross-language call in the callee's language
    pub fn invocation_unit(
        &self,
        call: &CallSite,
        callee: &FunctionDef,
        caller: GuestLanguage,
        globals: &GlobalSymbols,
    ) -> ExecutionUnit {
        let language = callee.language;
        let preamble = self.concrete_preamble(language, globals, &[]);

        let args: Vec<String> = call
            .args
            .iter()
            .map(|arg| translate_literals(arg, caller, language))
            .collect();

        let mut roots = vec![callee.name.clone()];
        for arg in &args {
            push_unique(&mut roots, &referenced_functions(arg, language, self.functions));
        }
        let defs: Vec<&FunctionDef> = dependency_closure(&roots, language, self.functions)
            .iter()
            .filter_map(|name| self.functions.get(name))
            .collect();
        let imports = self.imports_of(defs.iter().map(|def| def.segment));
        let definitions = defs
            .iter()
            .map(|def| def.source.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let emitter = emitter_for(language);
        let invoke = emitter.capture_return(&format!("{}({})", callee.name, args.join(", ")));
        let mut tracked = visible_globals(globals, language);
        tracked.push(RETURN_KEY.to_string());
        let postamble = emitter.postamble(&tracked);

        trace!(target: TARGET, callee = %callee.name, line = call.line, "invocation unit");
        ExecutionUnit::new(
            language,
            UnitKind::Invocation,
            assemble(&[&imports, &preamble, &definitions, &invoke, &postamble]),
            tracked,
            call.line,
        )
        .with_pending_call(PendingCall {
            callee: callee.name.clone(),
            line: call.line,
        })
    }

    /// Call line re-generated with each call replaced by its returned value
    #[allow(clippy::too_many_arguments)]
    pub fn continuation_unit(
        &self,
        ctx: &SegmentContext<'_>,
        text: &str,
        line: usize,
        calls: &[CallSite],
        returns: &[Literal],
        bound: &[String],
        globals: &GlobalSymbols,
    ) -> ExecutionUnit {
        let language = ctx.language;
        let mut body = text.to_string();
        // right to left keeps earlier byte offsets valid
        for (call, value) in calls.iter().zip(returns).rev() {
            body.replace_range(call.start..call.end, &value.render(language));
        }

        let preamble = self.concrete_preamble(language, globals, bound);
        let emitter = emitter_for(language);
        let conflicts = language.redeclaration_conflicts();
        let carried = ctx
            .fallbacks(line)
            .into_iter()
            .filter(|(name, _)| !globals.contains(name) && !(conflicts && bound.contains(name)))
            .map(|(name, expression)| emitter.declare(&name, &expression))
            .collect::<Vec<_>>()
            .join("\n");

        let mut tracked = visible_globals(globals, language);
        push_unique(&mut tracked, bound);
        let postamble = emitter.postamble(&tracked);

        trace!(target: TARGET, line, body = %body, "continuation unit");
        ExecutionUnit::new(
            language,
            UnitKind::Continuation,
            assemble(&[ctx.imports, &preamble, &carried, ctx.definitions, &body, &postamble]),
            tracked,
            line,
        )
    }
}
