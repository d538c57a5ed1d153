use std::path::PathBuf;

use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::Parser;
use hack_sim::{translate, vm, TranslateOption};

/// Hack VM translator: lowers .vm files to Hack assembly.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// A .vm file, or a directory whose .vm files form one program
    input: PathBuf,

    /// Output filename (default is input%.asm, or dir/dir.asm for a directory)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Do not emit the `SP = 256; call Sys.init 0` preamble
    #[arg(long)]
    no_bootstrap: bool,

    /// Precede the code of each command with the command as a comment
    #[arg(long)]
    comments: bool,

    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn default_output(input: &std::path::Path) -> PathBuf {
    if input.is_dir() {
        let name = input.file_name().unwrap_or_default();
        input.join(name).with_extension("asm")
    } else {
        input.with_extension("asm")
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbose_vm = args
        .verbose
        .log_level()
        .is_some_and(|lv| lv >= verbose::Level::Trace);
    let log_level = binutils::verbose_level_to_trace(args.verbose.log_level());
    binutils::logging_setup(log_level, None::<&std::fs::File>);

    let units = vm::load_units(&args.input)?;
    let option = TranslateOption::default()
        .set_bootstrap(!args.no_bootstrap)
        .set_comments(args.comments)
        .set_verbose(verbose_vm);
    let text = translate(units, option)
        .with_context(|| format!("could not translate `{}`", args.input.display()))?;

    let output_path = args.output.unwrap_or_else(|| default_output(&args.input));
    std::fs::write(&output_path, text)
        .with_context(|| format!("could not write file `{}`", output_path.display()))?;
    eprintln!("writing to file `{}`", output_path.display());
    Ok(())
}
