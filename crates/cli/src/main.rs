// exoplots CLI - catalog reconciliation and per-year discovery series

mod exceptions;
mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "exoplots")]
#[command(about = "Reconcile KOI, K2 and TOI candidates against the confirmed planet table")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Link candidates to confirmed planets and derive discovery years
    #[command(after_help = "\
Examples:
  exoplots reconcile data/catalog.toml
  exoplots reconcile data/catalog.toml --out-dir output/
  exoplots reconcile data/catalog.toml --json > report.json
  exoplots -vv reconcile data/catalog.toml

With --out-dir, writes confirmed.csv, koi.csv, k2.csv and toi.csv (each
with a year_disc column) plus report.json.")]
    Reconcile {
        /// Path to the catalog TOML describing the input tables
        config: PathBuf,

        /// Directory for the annotated tables and report.json
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,
    },

    /// Per-year counts by discovery method, with an exponential growth fit
    #[command(after_help = "\
Examples:
  exoplots per-year data/catalog.toml
  exoplots per-year data/catalog.toml --output per_year.json
  exoplots per-year data/catalog.toml --as-of 2021-06-30")]
    PerYear {
        /// Path to the catalog TOML describing the input tables
        config: PathBuf,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Date the data was retrieved; the final year counts as partial (default: today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Inspect and validate exception tables
    #[command(subcommand)]
    Exceptions(exceptions::ExceptionsCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  exoplots-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: exoplots <command> [options]");
            eprintln!("       exoplots --help for more information");
            Err(CliError::args(""))
        }
        Some(Commands::Reconcile { config, out_dir, json }) => {
            recon::cmd_reconcile(config, out_dir, json)
        }
        Some(Commands::PerYear { config, output, as_of }) => {
            recon::cmd_per_year(config, output, as_of)
        }
        Some(Commands::Exceptions(cmd)) => exceptions::cmd_exceptions(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Create error from an engine error with the registry's exit code.
    pub fn recon(err: exoplots_recon::ReconError) -> Self {
        use exoplots_recon::ReconErrorKind;

        let hint = match err.kind() {
            ReconErrorKind::AmbiguousMatch | ReconErrorKind::MissingMatch => Some(
                "add the identifier to confirmed_mismatch in the exception table, \
                 with a planet to link it",
            ),
            ReconErrorKind::UnexpectedOverlap => {
                Some("add the identifier to candidate_overlap if the overlap is expected")
            }
            ReconErrorKind::VintageNotFound => {
                Some("check that koi_history lists every KOI release, oldest first")
            }
            ReconErrorKind::OutOfBoundsYear => {
                Some("set year_ceiling in the catalog config if the data is newer")
            }
            ReconErrorKind::MissingColumn => Some("map the column under [tables.<name>.columns]"),
            _ => None,
        };
        Self {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
