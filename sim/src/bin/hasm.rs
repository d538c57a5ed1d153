use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::Parser;
use hack_sim::{assemble, AssembleOption};

/// Hack assembler written in Rust.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the input .asm file
    input: Option<String>,

    /// Output filename (default is input%.hack)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Print the annotated listing to stdout
    #[arg(long)]
    listing: bool,

    /// Print logs during assembling
    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbose_asm = args
        .verbose
        .log_level()
        .is_some_and(|lv| lv >= verbose::Level::Trace);
    let log_level = binutils::verbose_level_to_trace(args.verbose.log_level());
    binutils::logging_setup(log_level, None::<&std::fs::File>);

    let input = args.input.as_ref().context("no input file")?;
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("could not read file `{}`", input))?;
    let a = assemble(&content, AssembleOption::default().set_verbose(verbose_asm))
        .with_context(|| format!("could not assemble `{}`", input))?;

    if args.listing {
        print!("{}", a);
    }
    let output_path = if let Some(path) = args.output {
        path
    } else {
        let mut path = std::path::PathBuf::from(input);
        path.set_extension("hack");
        path.to_string_lossy().to_string()
    };
    std::fs::write(&output_path, a.obj.to_string())
        .with_context(|| format!("could not write file `{}`", &output_path))?;
    eprintln!("writing to file `{}`", &output_path);
    Ok(())
}
