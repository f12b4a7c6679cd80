use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde_json::json;
use sim86_core::logging::{LogCategory, LogConfig, LogLevel};
use sim86_core::state::Memory;
use sim86_core::{ClockEstimator, Disassembler, Simulator};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sim86", about = "Disassemble, simulate or clock a raw 8086 binary")]
struct Args {
    /// Raw machine code, loaded at address 0
    input: PathBuf,

    /// Execute the program and trace every instruction
    #[arg(short, long, default_value_t = false, conflicts_with = "clocks")]
    simulate: bool,

    /// Annotate every instruction with its estimated clock count
    #[arg(short, long, default_value_t = false)]
    clocks: bool,

    /// Write the 64KiB memory image after the run (default: dump.data)
    #[arg(short, long, num_args = 0..=1, default_missing_value = "dump.data")]
    dump: Option<PathBuf>,

    /// Write the final registers and flags to this file as JSON
    #[arg(long)]
    state: Option<PathBuf>,

    /// Stop simulating after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Level for decoded-but-unsimulated instructions (overrides --log-level)
    #[arg(long, default_value = "warn")]
    log_stubs: String,

    /// Send core log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_level(value: &str) -> Result<LogLevel> {
    LogLevel::from_str(value).with_context(|| format!("invalid log level `{}`", value))
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    config.set_global_level(parse_level(&args.log_level)?);
    config.set_level(LogCategory::Stubs, parse_level(&args.log_stubs)?);
    if let Some(path) = args.log_file.as_ref() {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

/// Plain listing that assembles back to the input
fn write_disassembly(out: &mut impl Write, program: &[u8]) -> Result<()> {
    writeln!(out, "bits 16")?;
    writeln!(out)?;
    for decoded in Disassembler::new(program) {
        let decoded = decoded.context("decoding failed")?;
        writeln!(out, "{}", decoded)?;
    }
    Ok(())
}

fn write_clocks(out: &mut impl Write, program: &[u8]) -> Result<ClockEstimator> {
    let mut estimator = ClockEstimator::new();
    for decoded in Disassembler::new(program) {
        let decoded = decoded.context("decoding failed")?;
        let estimate = estimator
            .estimate(&decoded)
            .context("clock estimation failed")?;
        writeln!(out, "{} ; {}", decoded, estimate)?;
    }
    Ok(estimator)
}

fn write_simulation(
    out: &mut impl Write,
    program: &[u8],
    max_steps: Option<u64>,
) -> Result<Simulator> {
    let mut sim = Simulator::new(program)?;
    while max_steps.map_or(true, |max| sim.steps() < max) {
        match sim.step().context("simulation failed")? {
            Some(trace) => writeln!(out, "{}", trace)?,
            None => break,
        }
    }
    if !sim.is_finished() {
        warn!(
            "stopped after {} instructions with ip at 0x{:04x}",
            sim.steps(),
            sim.state().ip
        );
    }
    writeln!(out)?;
    writeln!(out, "{}", sim.state().register_dump())?;
    Ok(sim)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(bytes)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let program = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    info!("loaded {} bytes from {}", program.len(), args.input.display());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "; {}", args.input.display())?;

    let (memory, mut state) = if args.simulate {
        let sim = write_simulation(&mut out, &program, args.max_steps)?;
        (sim.state().memory.clone(), Some(sim.state().save_state()))
    } else {
        let mut memory = Memory::new();
        memory.load_program(&program)?;
        if args.clocks {
            let estimator = write_clocks(&mut out, &program)?;
            info!("estimated {} clocks", estimator.total());
            (memory, Some(json!({ "clocks": estimator.total() })))
        } else {
            write_disassembly(&mut out, &program)?;
            (memory, None)
        }
    };
    out.flush()?;

    if let Some(path) = args.dump.as_ref() {
        write_file(path, memory.as_bytes())?;
        info!("memory image written to {}", path.display());
    }

    if let Some(path) = args.state.as_ref() {
        let state = state.get_or_insert_with(|| json!({}));
        let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write!(f, "{}", serde_json::to_string_pretty(state)?)?;
    }

    Ok(())
}
