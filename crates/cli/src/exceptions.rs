//! `exoplots exceptions`: inspect the curated exception tables.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use exoplots_recon::exceptions::{ExceptionCategory, ExceptionEntry};
use exoplots_recon::{CatalogKind, ExceptionConfig};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_LOAD, EXIT_WRITE};
use crate::CliError;

#[derive(Subcommand)]
pub enum ExceptionsCommands {
    /// Parse and validate an exception table (the built-in one by default)
    #[command(after_help = "\
Examples:
  exoplots exceptions validate
  exoplots exceptions validate data/exceptions.toml")]
    Validate {
        /// Exception TOML; omit to check the built-in table
        file: Option<PathBuf>,
    },

    /// List every exception entry
    #[command(after_help = "\
Examples:
  exoplots exceptions list
  exoplots exceptions list data/exceptions.toml --json")]
    List {
        /// Exception TOML; omit to list the built-in table
        file: Option<PathBuf>,

        /// Output JSON to stdout instead of a tab-separated listing
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_exceptions(cmd: ExceptionsCommands) -> Result<(), CliError> {
    match cmd {
        ExceptionsCommands::Validate { file } => cmd_validate(file),
        ExceptionsCommands::List { file, json } => cmd_list(file, json),
    }
}

fn load(file: Option<&PathBuf>) -> Result<ExceptionConfig, CliError> {
    let parsed = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                CliError::new(EXIT_LOAD, format!("cannot read {}: {e}", path.display()))
            })?;
            ExceptionConfig::from_toml(&text)
        }
        None => ExceptionConfig::builtin(),
    };
    parsed.map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

fn source_name(file: Option<&PathBuf>) -> String {
    file.map_or_else(|| "built-in table".to_string(), |p| p.display().to_string())
}

fn cmd_validate(file: Option<PathBuf>) -> Result<(), CliError> {
    let config = load(file.as_ref())?;

    let per_catalog: Vec<String> = CatalogKind::ALL
        .iter()
        .map(|&k| {
            let c = config.for_catalog(k);
            format!("{}: {}", k.key(), c.confirmed_mismatch.len() + c.candidate_overlap.len())
        })
        .collect();

    eprintln!(
        "valid: {} version {} with {} entries ({})",
        source_name(file.as_ref()),
        config.version,
        config.entry_count(),
        per_catalog.join(", "),
    );
    Ok(())
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    catalog: CatalogKind,
    category: ExceptionCategory,
    id: &'a str,
    #[serde(flatten)]
    entry: &'a ExceptionEntry,
}

fn entries(config: &ExceptionConfig) -> Vec<ListedEntry<'_>> {
    let mut out = Vec::new();
    for kind in CatalogKind::ALL {
        let listed = config.for_catalog(kind);
        let categories = [
            ExceptionCategory::ConfirmedMismatch,
            ExceptionCategory::CandidateOverlap,
        ];
        for category in categories {
            for (id, entry) in listed.category(category) {
                out.push(ListedEntry { catalog: kind, category, id, entry });
            }
        }
    }
    out
}

fn cmd_list(file: Option<PathBuf>, json_output: bool) -> Result<(), CliError> {
    let config = load(file.as_ref())?;
    let listed = entries(&config);

    if json_output {
        let json_str = serde_json::to_string_pretty(&listed)
            .map_err(|e| CliError::new(EXIT_WRITE, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    for e in &listed {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            e.catalog.key(),
            e.category,
            e.id,
            e.entry.planet.as_deref().unwrap_or("-"),
            e.entry.reason,
        );
    }
    eprintln!("{} entries from {}", listed.len(), source_name(file.as_ref()));
    Ok(())
}
