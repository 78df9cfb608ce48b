use std::path::PathBuf;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mmgrad",
    about = "Finite-difference validation of polarizable force-field gradients",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check analytic gradients against central finite differences
    #[command(visible_alias = "c")]
    Check(CheckArgs),

    /// Dump analytic gradients term by term (kcal/mol/Å)
    #[command(visible_alias = "g")]
    Grad(GradArgs),

    /// Compare one block of two gradient dumps
    Compare(CompareArgs),
}

impl Command {
    pub fn output(&self) -> OutputOptions {
        match self {
            Command::Check(args) => args.output,
            Command::Grad(args) => args.output,
            Command::Compare(args) => args.output,
        }
    }
}

/// Files shared by `check` and `grad`.
#[derive(Args)]
pub struct SystemFiles {
    /// System description (TOML, atomic units unless `units` says otherwise)
    #[arg(value_name = "SYSTEM")]
    pub system: PathBuf,

    /// Output file
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// External electric field, one `x y z` row per MM atom
    #[arg(value_name = "FIELD")]
    pub field: Option<PathBuf>,
}

/// Verbosity options shared by all commands.
#[derive(Args, Clone, Copy)]
pub struct OutputOptions {
    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,

    /// Log every perturbation batch and term result to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validation settings; command-line values override the config file.
#[derive(Args)]
#[command(next_help_heading = "Validation")]
pub struct ValidationOptions {
    /// Finite-difference step (bohr)
    #[arg(long, value_name = "H")]
    pub step: Option<f64>,

    /// Checks to run, comma separated (e.g. bond,polelec,EVQMMM)
    #[arg(long, value_name = "TERMS", value_delimiter = ',')]
    pub terms: Vec<String>,

    /// Validation config (TOML: step, terms, [tolerances])
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub files: SystemFiles,

    #[command(flatten)]
    pub validation: ValidationOptions,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct GradArgs {
    #[command(flatten)]
    pub files: SystemFiles,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Gradient dump under test
    #[arg(value_name = "A")]
    pub a: PathBuf,

    /// Reference gradient dump
    #[arg(value_name = "B")]
    pub b: PathBuf,

    /// Block label (EB, EA, ..., ETOT)
    #[arg(value_name = "LABEL")]
    pub label: String,

    /// Relative tolerance
    #[arg(long, value_name = "RTOL", default_value = "1e-5")]
    pub rtol: f64,

    /// Absolute tolerance
    #[arg(long, value_name = "ATOL", default_value = "1e-8")]
    pub atol: f64,

    #[command(flatten)]
    pub output: OutputOptions,
}

pub const USAGE: &str = "Syntax expected: mmgrad check|grad <SYSTEM> <REPORT> [<FIELD>] | mmgrad compare <A> <B> <LABEL>";

/// Parses the command line.
///
/// Help and version requests, and malformed option values, are handled by
/// clap and exit the process. A wrong number of arguments yields `None`.
pub fn parse() -> Option<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Some(cli),
        Err(e) if is_usage_error(&e) => None,
        Err(e) => e.exit(),
    }
}

/// Missing or surplus positionals and a missing subcommand. Unknown flags
/// stay clap errors.
fn is_usage_error(err: &clap::Error) -> bool {
    match err.kind() {
        ErrorKind::MissingRequiredArgument
        | ErrorKind::MissingSubcommand
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        | ErrorKind::InvalidSubcommand
        | ErrorKind::TooManyValues
        | ErrorKind::TooFewValues
        | ErrorKind::WrongNumberOfValues => true,
        ErrorKind::UnknownArgument => !matches!(
            err.get(ContextKind::InvalidArg),
            Some(ContextValue::String(arg)) if arg.starts_with('-')
        ),
        _ => false,
    }
}
