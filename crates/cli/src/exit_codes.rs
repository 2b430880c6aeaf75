//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; pipelines rely on them.
//!
//! # Exit Codes
//!
//! | Code | Description                                                  |
//! |------|--------------------------------------------------------------|
//! | 0    | Success                                                      |
//! | 1    | General error (unspecified)                                  |
//! | 2    | CLI usage error (bad args)                                   |
//! | 3    | Catalog or exception config failed to parse or validate      |
//! | 4    | Input table or KOI release unreadable or unparseable         |
//! | 5    | Reconciliation found a data-integrity breach                 |
//! | 6    | Output could not be written                                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the relevant command

use exoplots_recon::{ReconError, ReconErrorKind};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconciliation (3-9)
// =============================================================================

/// Catalog TOML or exception TOML is malformed or fails validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A table or KOI release could not be read, or a column is missing or
/// holds an unparseable value.
pub const EXIT_LOAD: u8 = 4;

/// Ambiguous or missing match, unexpected overlap, unresolvable KOI vintage,
/// out-of-bounds year, or a bad exception target.
pub const EXIT_INVARIANT: u8 = 5;

/// Annotated tables or JSON reports could not be written.
pub const EXIT_WRITE: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    if err.is_invariant_breach() {
        return EXIT_INVARIANT;
    }
    match err.kind() {
        ReconErrorKind::ConfigParse | ReconErrorKind::ConfigValidation => EXIT_INVALID_CONFIG,
        ReconErrorKind::MissingColumn | ReconErrorKind::ValueParse | ReconErrorKind::Io => {
            EXIT_LOAD
        }
        _ => EXIT_ERROR,
    }
}
