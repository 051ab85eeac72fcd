//! Strata CLI, the command-line front end to the unit cache and package builder.
//!
//! Provides `strata pack` to merge compiled units into a package,
//! `strata inspect` to print a descriptor file, and `strata check` to load
//! units through the persistent environment and report their dependencies.

#![warn(missing_docs)]

mod check;
mod inspect;
mod pack;
mod session;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strata: compiled-unit cache and package linker.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata unit cache and package linker")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print each step as it happens.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strata.toml` file or the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge compiled units into one package.
    Pack(PackArgs),
    /// Print the content of a descriptor file.
    Inspect(InspectArgs),
    /// Load units and report their dependencies.
    Check(CheckArgs),
}

/// Arguments for the `strata pack` subcommand.
#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Output info file; the combined object is written next to it.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Additional directories searched for member and interface files.
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Package the result will itself be placed inside (e.g. `Outer.Mid`).
    #[arg(long)]
    pub for_pack: Option<String>,

    /// Member files (`.sti` or `.stx`), in link order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the `strata inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// The `.sti`, `.stx` or `.sto` file to print.
    pub file: PathBuf,

    /// Print as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `strata check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Additional directories searched for interface files.
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Units to load.
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print per-step progress.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Pack(ref args) => pack::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Treats the terminal as color-capable when `TERM` is set to anything but
/// `dumb`.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|term| term != "dumb")
}
