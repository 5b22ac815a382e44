//! Program driver
//!
//! Compile phase (segment, analyze, resolve) runs over the whole file
//! before anything executes; the run phase then generates and dispatches
//! units strictly in source order.

use crate::analyzer::{analyze, SegmentAnalysis};
use crate::codegen::{hidden_globals, CodeGenerator, SegmentContext};
use crate::error::{EngineError, UndefinedReferenceError};
use crate::output::OutputEntry;
use crate::resolver::{CallResolver, SegmentPlan, SubBlock};
use crate::scheduler::{Scheduler, UnitRecord};
use crate::segment::{Segment, SegmentWarning, Segmenter};
use crate::symbols::{Declaration, Declarations, FunctionTable, GlobalSymbols, Literal};
use crate::unit::ExecutionUnit;
use mixl_config::{EngineConfig, GuestLanguage, Phase};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Accumulated time per pipeline stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    entries: Vec<(Phase, Duration)>,
}

impl StageTimings {
    pub fn add(&mut self, phase: Phase, elapsed: Duration) {
        match self.entries.iter_mut().find(|(p, _)| *p == phase) {
            Some((_, total)) => *total += elapsed,
            None => self.entries.push((phase, elapsed)),
        }
    }

    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, d)| *d)
    }

    /// Stages in the order they were first recorded
    pub fn iter(&self) -> impl Iterator<Item = (Phase, Duration)> + '_ {
        self.entries.iter().copied()
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unit stdout concatenated in execution order
    pub stdout: String,
    /// Content hashes of completed units, in execution order
    pub execution_order: Vec<String>,
    pub units: Vec<UnitRecord>,
    pub timings: StageTimings,
    pub globals: GlobalSymbols,
    pub warnings: Vec<String>,
}

/// A compiled `.mixl` program
#[derive(Debug, Clone)]
pub struct Program {
    segments: Vec<Segment>,
    warnings: Vec<SegmentWarning>,
    analyses: Vec<SegmentAnalysis>,
    declarations: Declarations,
    functions: FunctionTable,
    plans: Vec<SegmentPlan>,
    timings: StageTimings,
}

impl Program {
    /// Run the compile phase. Spawns nothing and touches no files.
    pub fn compile(source: &str, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut timings = StageTimings::default();

        let started = Instant::now();
        let segmentation = Segmenter::new(config).split(source)?;
        timings.add(Phase::Segment, started.elapsed());

        let started = Instant::now();
        let mut analyses = Vec::with_capacity(segmentation.segments.len());
        let mut declarations = Declarations::new();
        let mut functions = FunctionTable::new();
        for segment in &segmentation.segments {
            let analysis = analyze(segment)?;
            for binding in &analysis.bindings {
                declarations.declare(Declaration {
                    name: binding.name.clone(),
                    expression: binding.expression.clone(),
                    language: segment.language,
                    segment: segment.ordinal,
                    line: binding.line,
                })?;
            }
            for def in &analysis.functions {
                functions.define(def.clone())?;
            }
            analyses.push(analysis);
        }
        timings.add(Phase::Analyze, started.elapsed());

        let started = Instant::now();
        let resolver = CallResolver::new(&functions);
        let plans = segmentation
            .segments
            .iter()
            .zip(&analyses)
            .map(|(segment, analysis)| resolver.resolve(segment, analysis))
            .collect::<Result<Vec<_>, _>>()?;
        timings.add(Phase::Resolve, started.elapsed());

        debug!(
            target: "mixl::resolve",
            segments = segmentation.segments.len(),
            declarations = declarations.len(),
            functions = functions.len(),
            "compile phase complete"
        );

        Ok(Self {
            segments: segmentation.segments,
            warnings: segmentation.warnings,
            analyses,
            declarations,
            functions,
            plans,
            timings,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn warnings(&self) -> &[SegmentWarning] {
        &self.warnings
    }

    pub fn analyses(&self) -> &[SegmentAnalysis] {
        &self.analyses
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn plans(&self) -> &[SegmentPlan] {
        &self.plans
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Execute every segment in source order
    pub fn run(self, scheduler: &mut Scheduler) -> Result<RunReport, EngineError> {
        let generator = CodeGenerator::new(&self.functions)
            .with_imports(self.analyses.iter().map(SegmentAnalysis::import_source).collect());

        let mut state = RunState {
            scheduler,
            globals: GlobalSymbols::new(),
            order: Vec::new(),
            warnings: Vec::new(),
            hidden: HashSet::new(),
            codegen: Duration::ZERO,
            run: Duration::ZERO,
        };
        for warning in &self.warnings {
            state.record(warning.to_string());
        }

        for ((segment, plan), analysis) in self.segments.iter().zip(&self.plans).zip(&self.analyses) {
            info!(
                target: "mixl::run",
                ordinal = segment.ordinal,
                language = %segment.language,
                line = segment.first_line,
                "segment"
            );
            match plan {
                SegmentPlan::Simple => {
                    let bound = analysis.bound_names();
                    state.note_hidden(segment.language, segment.first_line);
                    let unit =
                        state.generate(|globals| Ok(generator.simple_unit(segment, &bound, globals)))?;
                    state.execute(&unit)?;
                }
                SegmentPlan::Split {
                    blocks,
                    local_functions,
                } => self.run_split(&generator, &mut state, segment, analysis, blocks, local_functions)?,
            }
        }

        let mut timings = self.timings.clone();
        timings.add(Phase::Codegen, state.codegen);
        timings.add(Phase::Run, state.run);

        Ok(RunReport {
            stdout: state.scheduler.take_stdout(),
            execution_order: state.order,
            units: state.scheduler.take_records(),
            timings,
            globals: state.globals,
            warnings: state.warnings,
        })
    }

    fn run_split(
        &self,
        generator: &CodeGenerator<'_>,
        state: &mut RunState<'_>,
        segment: &Segment,
        analysis: &SegmentAnalysis,
        blocks: &[SubBlock],
        local_functions: &[String],
    ) -> Result<(), EngineError> {
        let language = segment.language;
        let imports = analysis.import_source();
        let definitions = generator.local_definitions(local_functions);
        let ctx = SegmentContext {
            language,
            imports: &imports,
            definitions: &definitions,
            analysis,
        };
        state.note_hidden(language, segment.first_line);
        let templates = state.generate(|globals| Ok(generator.plan_templates(&ctx, blocks, globals)))?;

        for (block, template) in blocks.iter().zip(templates) {
            match block {
                SubBlock::Code { first_line, .. } => {
                    if let Some(template) = template {
                        state.note_hidden(language, *first_line);
                        let unit = state.generate(|globals| Ok(template.fill(globals)?))?;
                        state.execute(&unit)?;
                    }
                }
                SubBlock::Call {
                    text,
                    line,
                    calls,
                    bound,
                } => {
                    let mut returns: Vec<Literal> = Vec::with_capacity(calls.len());
                    for call in calls {
                        let callee = self.functions.get(&call.callee).ok_or_else(|| {
                            UndefinedReferenceError {
                                name: call.callee.clone(),
                                line: call.line,
                            }
                        })?;
                        state.note_hidden(callee.language, call.line);
                        let unit = state.generate(|globals| {
                            Ok(generator.invocation_unit(call, callee, language, globals))
                        })?;
                        if let Some(value) = state.execute(&unit)? {
                            returns.push(value);
                        }
                    }

                    if returns.len() < calls.len() {
                        state.warn(format!(
                            "line {}: a called function returned no value, continuation skipped",
                            line
                        ));
                        continue;
                    }

                    state.note_hidden(language, *line);
                    let unit = state.generate(|globals| {
                        Ok(generator.continuation_unit(&ctx, text, *line, calls, &returns, bound, globals))
                    })?;
                    state.execute(&unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Mutable state of one run
struct RunState<'s> {
    scheduler: &'s mut Scheduler,
    globals: GlobalSymbols,
    order: Vec<String>,
    warnings: Vec<String>,
    /// Globals already reported as hidden from a language
    hidden: HashSet<(String, GuestLanguage)>,
    codegen: Duration,
    run: Duration,
}

impl RunState<'_> {
    fn record(&mut self, message: String) {
        self.scheduler.output().push(OutputEntry::Warning(message.clone()));
        self.warnings.push(message);
    }

    fn warn(&mut self, message: String) {
        warn!(target: "mixl::run", "{}", message);
        self.record(message);
    }

    /// Report globals the next `language` unit cannot declare, once per name and language
    fn note_hidden(&mut self, language: GuestLanguage, line: usize) {
        for name in hidden_globals(&self.globals, language) {
            if self.hidden.insert((name.clone(), language)) {
                self.warn(format!(
                    "line {}: global '{}' is not a valid {} name and is not visible there",
                    line, name, language
                ));
            }
        }
    }

    fn generate<T>(
        &mut self,
        f: impl FnOnce(&GlobalSymbols) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let started = Instant::now();
        let out = f(&self.globals);
        self.codegen += started.elapsed();
        out
    }

    fn execute(&mut self, unit: &ExecutionUnit) -> Result<Option<Literal>, EngineError> {
        let started = Instant::now();
        let out = self
            .scheduler
            .dispatch(unit, &mut self.globals, &mut self.order);
        self.run += started.elapsed();
        Ok(out?)
    }
}
