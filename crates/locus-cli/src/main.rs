// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Locus CLI - lower, simulate and compile access scenarios.
//!
//! ```text
//! locus lower <SCENARIO> [--target c|lir] [--mode immediate|deferred] [--config FILE]
//! locus run   <SCENARIO> [--locales N] [--here N]
//! locus build <SCENARIO> -o <OBJECT>
//! ```

mod output;
mod pipeline;
mod scenario;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use locus_addr::{CodegenConfig, LoweringMode};
use locus_codegen::CodeGenerator;
use locus_sim::{Machine, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "locus")]
#[command(version)]
#[command(about = "Address model and communication lowering for partitioned global address spaces", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Control when to use colored output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a scenario and print the generated code
    Lower {
        #[command(flatten)]
        input: InputArgs,

        /// Output form
        #[arg(long, value_enum, default_value_t = Target::C)]
        target: Target,

        /// Print deferred-mode LIR before the wide lowering passes
        #[arg(long)]
        no_passes: bool,
    },

    /// Lower a scenario to LIR and execute it on a simulated machine
    ///
    /// Memory, arguments and the machine shape come from the scenario's
    /// `run` section; the flags override the machine shape.
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Number of locales
        #[arg(long)]
        locales: Option<u32>,

        /// Locale the function runs on
        #[arg(long)]
        here: Option<i64>,
    },

    /// Compile a scenario to a native object file
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Object file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Scenario file (JSON)
    #[arg(value_name = "SCENARIO")]
    file: PathBuf,

    /// Lowering mode; overrides the configuration
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Code generation configuration (JSON); overrides the scenario's
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    C,
    Lir,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Immediate,
    Deferred,
}

/// When to use colored output
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::init(cli.color);

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Lower { input, target, no_passes } => cmd_lower(&input, target, !no_passes),
        Commands::Run { input, locales, here } => cmd_run(&input, locales, here),
        Commands::Build { input, output } => cmd_build(&input, &output),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e:#}", output::error_label());
            ExitCode::FAILURE
        }
    }
}

/// The scenario and the configuration to lower it with. Precedence:
/// `--config`, then the scenario's own, then defaults; `--mode` last.
fn load(input: &InputArgs) -> Result<(Scenario, CodegenConfig)> {
    let text = read(&input.file)?;
    let scenario = Scenario::from_json(&text).with_context(|| format!("in {}", input.file.display()))?;
    let mut config = match &input.config {
        Some(path) => CodegenConfig::from_json(&read(path)?).with_context(|| format!("in {}", path.display()))?,
        None => scenario.config.clone().unwrap_or_default(),
    };
    if let Some(mode) = input.mode {
        config.mode = match mode {
            Mode::Immediate => LoweringMode::Immediate,
            Mode::Deferred => LoweringMode::Deferred,
        };
    }
    info!(?config, "configuration");
    Ok((scenario, config))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn cmd_lower(input: &InputArgs, target: Target, passes: bool) -> Result<()> {
    let (scenario, config) = load(input)?;
    let program = scenario.program()?;
    match target {
        Target::C => print!("{}", pipeline::lower_c(program, config)?),
        Target::Lir => {
            let lowered = pipeline::lower_lir(program, config, passes)?;
            print!("{}", lowered.func);
            if let Some(stats) = lowered.widened {
                eprintln!(
                    "{} {} coalesced, {} gets, {} puts",
                    output::label("deferred"),
                    lowered.coalesced,
                    stats.gets,
                    stats.puts
                );
            }
        }
    }
    Ok(())
}

fn cmd_run(input: &InputArgs, locales: Option<u32>, here: Option<i64>) -> Result<()> {
    let (scenario, config) = load(input)?;
    let program = scenario.program()?;
    let lowered = pipeline::lower_lir(program, config, true)?;
    let run = &scenario.run;

    let mut machine = Machine::new(locales.unwrap_or(run.locales));
    for word in &run.memory {
        machine
            .write_i64(word.locale, word.addr, word.value)
            .with_context(|| format!("initializing {:#x} on locale {}", word.addr, word.locale))?;
    }
    let here = here.unwrap_or(run.here);
    let args: Vec<Value> = run.args.iter().map(|&a| Value::Int(a)).collect();
    let result = machine.run(&lowered.func, here, &args).context("simulation failed")?;

    println!("{}", output::banner_ok("Run"));
    match result {
        Some(Value::Int(v)) => println!("{} {v}", output::label("result")),
        Some(Value::Ptr(p)) => println!("{} {p:#x}", output::label("result")),
        Some(Value::Float(f)) => println!("{} {f}", output::label("result")),
        None => {}
    }
    println!("{} {}", output::label("comm"), machine.events().len());
    for event in machine.events() {
        println!("{}", output::comm_event(event));
    }
    if machine.pending_transfers() > 0 {
        println!("{} {}", output::label("pending unordered"), machine.pending_transfers());
    }
    Ok(())
}

fn cmd_build(input: &InputArgs, path: &Path) -> Result<()> {
    let (scenario, config) = load(input)?;
    let program = scenario.program()?;
    let lowered = pipeline::lower_lir(program, config, true)?;
    if lowered.func.has_wide_ops() {
        bail!("`{}` still has wide operations after lowering", lowered.func.name);
    }

    let mut gen = CodeGenerator::new()?;
    gen.declare_runtime_functions()?;
    gen.compile(std::slice::from_ref(&lowered.func))?;
    gen.emit_object(path)?;
    println!("{} {}", output::banner_ok("Build"), path.display());
    Ok(())
}
