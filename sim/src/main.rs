use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ansi_term::Style;
use binutils::{clap, verbose};
use clap::{error::ErrorKind, CommandFactory, Parser};
use hack_sim::{framework::ClockedSim, hdl::stdlib, mem_print, ChipLibrary, HackMachine, Object};

/// Cycle limit of a rom run without `--cycles`.
const HALT_LIMIT: u64 = 1_000_000;

/// Hack chip simulator: evaluate and clock HDL chips, or run a program on the
/// CPU circuit.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the input .hdl file
    chip: Option<PathBuf>,

    /// Directory of extra .hdl files, loaded over the standard chips
    #[arg(long)]
    lib: Option<PathBuf>,

    /// Build the basic gates from Nand instead of using the primitives
    #[arg(long)]
    nand: bool,

    /// Input assignment `pin=value`; values may be decimal, negative or 0x-hex
    #[arg(long = "set", value_name = "PIN=VALUE")]
    set: Vec<String>,

    /// Number of clock cycles. With a chip, 0 only evaluates once; with a rom,
    /// 0 runs until the program halts.
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Run a .hack program on the CPU circuit
    ///
    /// This option is conflict with the chip argument.
    #[arg(long)]
    rom: Option<PathBuf>,

    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn parse_value(s: &str) -> Result<u16> {
    let v = if let Some(hex) = s.strip_prefix("0x") {
        u16::from_str_radix(hex, 16).ok()
    } else if s.starts_with('-') {
        s.parse::<i16>().ok().map(|v| v as u16)
    } else {
        s.parse::<u16>().ok()
    };
    v.with_context(|| format!("invalid value `{}`", s))
}

fn parse_assignment(s: &str) -> Result<(String, u16)> {
    let (pin, value) = s
        .split_once('=')
        .with_context(|| format!("expected `pin=value`, got `{}`", s))?;
    Ok((pin.trim().to_string(), parse_value(value.trim())?))
}

fn load_library(args: &Args) -> Result<ChipLibrary> {
    let mut lib = ChipLibrary::standard()?;
    if args.nand {
        for src in stdlib::NAND_GATES {
            lib.add_source(src)?;
        }
    }
    if let Some(dir) = &args.lib {
        let names = lib.load_dir(dir)?;
        tracing::info!("loaded {} chips from `{}`", names.len(), dir.display());
    }
    Ok(lib)
}

fn run_chip(args: &Args, path: &Path, mut lib: ChipLibrary) -> Result<()> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.display()))?;
    let name = lib.add_source(&src)?;
    let mut chip = lib.simulate(&name)?;
    let graph = chip.graph().clone();
    tracing::info!(
        "chip {}: {} nets, {} sequential cells, depth {}",
        name,
        graph.net_count(),
        graph.cell_count(),
        graph.depth()
    );

    let mut inputs = Vec::new();
    for s in &args.set {
        inputs.push(parse_assignment(s)?);
    }
    // unassigned inputs default to zero on the command line
    for port in graph.inputs() {
        if !inputs.iter().any(|(pin, _)| pin == &port.name) {
            inputs.push((port.name.clone(), 0));
        }
    }

    if args.cycles == 0 {
        let out = chip.evaluate(inputs)?;
        for (pin, value) in out {
            println!("{} = {} ({:#06x})", Style::new().bold().paint(pin), value as i16, value);
        }
    } else {
        chip.enable_trace();
        for _ in 0..args.cycles {
            chip.step(inputs.iter().map(|(k, v)| (k.as_str(), *v)))?;
        }
        if let Some(trace) = chip.trace() {
            print!("{}", trace);
        }
    }
    Ok(())
}

fn run_rom(args: &Args, path: &Path, lib: ChipLibrary) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.display()))?;
    let obj = Object::from_hack(&text)?;
    let mut machine = HackMachine::new(&lib, &obj.binary)?;
    let max_cycles = if args.cycles == 0 { HALT_LIMIT } else { args.cycles };
    let res = machine.run_program(max_cycles);
    println!(
        "{:?} after {} cycles: A = {}, D = {}, PC = {}",
        res.stat,
        machine.cycle_count(),
        res.a as i16,
        res.d as i16,
        res.pc
    );
    mem_print(machine.ram());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = binutils::verbose_level_to_trace(args.verbose.log_level());
    binutils::logging_setup(log_level, None::<&std::fs::File>);

    let lib = load_library(&args)?;
    match (&args.chip, &args.rom) {
        (Some(_), Some(_)) => {
            let mut cmd = Args::command();
            cmd.error(
                ErrorKind::ArgumentConflict,
                "Can't both specify a chip and a rom",
            )
            .exit();
        }
        (Some(chip), None) => run_chip(&args, chip, lib),
        (None, Some(rom)) => run_rom(&args, rom, lib),
        (None, None) => anyhow::bail!("no input file"),
    }
}
