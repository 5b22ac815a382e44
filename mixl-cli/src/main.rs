//! MixL CLI - Command line interface
//!
//! `mixl build|run|check [PATH]`, where PATH is a `.mixl` file, a
//! `mixconf.json` manifest, or a directory containing one.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{debug, Level};

mod config;
mod logging;
mod manifest;
mod platform;

use crate::config::{build_run_config, parse_interpreter_arg, LogConfig, Overrides};
use crate::logging::LogFormat;
use crate::manifest::Project;
use crate::platform::{
    format_check, print_bench, print_entry, print_error_with_source, print_order, ConsoleOutput,
};
use mixl_api::{
    base_dir_of, build_source, check_source, load_entry, new_output_buffer, MixlError,
    OutputEntry, OutputHandle, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "mixl",
    about = "MixL - run JavaScript and Python segments as one program",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log level for the segmenter
    #[arg(long, value_name = "LEVEL", global = true)]
    log_segment: Option<Level>,

    /// Log level for the line analyzer
    #[arg(long, value_name = "LEVEL", global = true)]
    log_analyze: Option<Level>,

    /// Log level for the call resolver
    #[arg(long, value_name = "LEVEL", global = true)]
    log_resolve: Option<Level>,

    /// Log level for the code generator
    #[arg(long, value_name = "LEVEL", global = true)]
    log_codegen: Option<Level>,

    /// Log level for the unit scheduler
    #[arg(long, value_name = "LEVEL", global = true)]
    log_run: Option<Level>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    format: LogFormat,

    /// Also append logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every unit and print the collected output at the end
    Build(BuildArgs),
    /// Run every unit, streaming output as it is produced
    Run(BuildArgs),
    /// Validate, analyze and resolve without running anything
    Check(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// A .mixl file, a mixconf.json manifest, or a project directory
    #[arg(value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Directory for generated sources and result files
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,

    /// Interpreter for a tag, e.g. `--interpreter py=python3.12`
    #[arg(long, value_name = "TAG=PROGRAM", value_parser = parse_interpreter_arg)]
    interpreter: Vec<(String, String)>,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print per-stage and per-unit timings
    #[arg(long)]
    bench: bool,

    /// Print the execution-order log
    #[arg(long)]
    show_order: bool,

    /// Report every dispatched unit
    #[arg(long)]
    show_steps: bool,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        LogConfig {
            segment: self.log_segment,
            analyze: self.log_analyze,
            resolve: self.log_resolve,
            codegen: self.log_codegen,
            run: self.log_run,
            ..LogConfig::from_verbosity(self.verbose)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_config(), cli.format, cli.log_file.as_deref()) {
        eprintln!("Error: cannot initialize logging: {}", e);
        process::exit(1);
    }

    match &cli.command {
        Command::Build(args) => handle_build(args, false),
        Command::Run(args) => handle_build(args, true),
        Command::Check(args) => handle_check(args),
    }
}

/// Everything a command needs before the engine starts
struct Prepared {
    project: Project,
    source: String,
    config: RunConfig,
}

fn prepare(args: &ProjectArgs, show_steps: bool, output: OutputHandle) -> Prepared {
    let project = match manifest::locate(&args.path) {
        Ok(project) => project,
        Err(e) => fail_without_source(&MixlError::Load(e)),
    };
    debug!(
        target: "mixl::cli",
        project = %project.name(),
        version = ?project.manifest.as_ref().and_then(|m| m.version.as_deref()),
        entry = %project.entry.display(),
        "project located"
    );

    let engine = match project.engine_config() {
        Ok(engine) => engine,
        Err(e) => fail_without_source(&MixlError::Load(e)),
    };

    let overrides = Overrides {
        scratch_dir: args.scratch_dir.clone(),
        interpreters: args.interpreter.clone(),
        show_steps,
    };
    let config = match build_run_config(engine, &overrides, output) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    };

    let source = match load_entry(&project.entry) {
        Ok(source) => source,
        Err(e) => fail_without_source(&e),
    };

    Prepared {
        project,
        source,
        config,
    }
}

fn handle_build(args: &BuildArgs, stream: bool) {
    let output: OutputHandle = if stream {
        Arc::new(ConsoleOutput)
    } else {
        new_output_buffer()
    };
    let prepared = prepare(&args.project, args.show_steps, output.clone());
    let base_dir = base_dir_of(&prepared.project.entry);

    match build_source(&prepared.source, &base_dir, &prepared.config) {
        Ok(result) => {
            // build: notices first, then the collected program output
            for entry in output.drain() {
                if !matches!(entry, OutputEntry::Stdout { .. }) {
                    print_entry(&entry);
                }
            }
            if !stream {
                print!("{}", result.stdout);
            }
            if args.show_order {
                print_order(&result);
            }
            if args.bench {
                print_bench(&result);
            }
        }
        Err(e) => {
            // Whatever ran before the failure is still shown
            for entry in output.drain() {
                print_entry(&entry);
            }
            fail(&e, &prepared.source, &prepared.project.entry);
        }
    }
}

fn handle_check(args: &ProjectArgs) {
    let output = new_output_buffer();
    let prepared = prepare(args, false, output);

    match check_source(&prepared.source, &prepared.config) {
        Ok(result) => {
            for warning in &result.warnings {
                eprintln!("⚠️  {}", warning);
            }
            print!("{}", format_check(&result));
            println!("✅ {} checked", prepared.project.entry.display());
        }
        Err(e) => fail(&e, &prepared.source, &prepared.project.entry),
    }
}

fn fail(e: &MixlError, source: &str, entry: &Path) -> ! {
    eprintln!("{}:", entry.display());
    print_error_with_source(e, source);
    process::exit(1);
}

fn fail_without_source(e: &MixlError) -> ! {
    eprintln!("❌ {}", e);
    process::exit(1);
}
