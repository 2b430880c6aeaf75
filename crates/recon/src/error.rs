use thiserror::Error;

use crate::model::CatalogKind;

/// Failure kind without payload, for callers that branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconErrorKind {
    AmbiguousMatch,
    MissingMatch,
    UnexpectedOverlap,
    VintageNotFound,
    OutOfBoundsYear,
    OverrideTargetNotFound,
    UnknownPlanetName,
    ConfigParse,
    ConfigValidation,
    MissingColumn,
    ValueParse,
    Io,
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// A Confirmed candidate hit more than one confirmed planet and is not exception-listed.
    #[error("{catalog} '{id}': ambiguous positional match against {}", .matches.join(", "))]
    AmbiguousMatch {
        catalog: CatalogKind,
        id: String,
        matches: Vec<String>,
    },
    /// A Confirmed candidate hit no confirmed planet and is not exception-listed.
    #[error("{catalog} '{id}': confirmed but no positional match in the confirmed table")]
    MissingMatch { catalog: CatalogKind, id: String },
    /// A Candidate row collides with a confirmed planet and is not overlap-listed.
    #[error("{catalog} '{id}': candidate overlaps confirmed planet(s) {}", .matches.join(", "))]
    UnexpectedOverlap {
        catalog: CatalogKind,
        id: String,
        matches: Vec<String>,
    },
    #[error("KOI '{id}' does not appear in any historical KOI release")]
    VintageNotFound { id: String },
    #[error("{table} '{id}': year {year} outside [{min}, {max}]")]
    OutOfBoundsYear {
        table: String,
        id: String,
        year: i32,
        min: i32,
        max: i32,
    },
    /// An exception entry names a planet that is missing or duplicated.
    #[error(
        "{catalog} '{id}': override target '{planet}' matched {found} confirmed planet(s), \
         expected 1"
    )]
    OverrideTargetNotFound {
        catalog: CatalogKind,
        id: String,
        planet: String,
        found: usize,
    },
    #[error("{catalog} '{id}': planet name '{planet}' is not in the confirmed table")]
    UnknownPlanetName {
        catalog: CatalogKind,
        id: String,
        planet: String,
    },
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("table '{table}', row '{id}': cannot parse {column} '{value}'")]
    ValueParse {
        table: String,
        id: String,
        column: String,
        value: String,
    },
    #[error("IO error: {0}")]
    Io(String),
}

impl ReconError {
    pub fn kind(&self) -> ReconErrorKind {
        match self {
            Self::AmbiguousMatch { .. } => ReconErrorKind::AmbiguousMatch,
            Self::MissingMatch { .. } => ReconErrorKind::MissingMatch,
            Self::UnexpectedOverlap { .. } => ReconErrorKind::UnexpectedOverlap,
            Self::VintageNotFound { .. } => ReconErrorKind::VintageNotFound,
            Self::OutOfBoundsYear { .. } => ReconErrorKind::OutOfBoundsYear,
            Self::OverrideTargetNotFound { .. } => ReconErrorKind::OverrideTargetNotFound,
            Self::UnknownPlanetName { .. } => ReconErrorKind::UnknownPlanetName,
            Self::ConfigParse(_) => ReconErrorKind::ConfigParse,
            Self::ConfigValidation(_) => ReconErrorKind::ConfigValidation,
            Self::MissingColumn { .. } => ReconErrorKind::MissingColumn,
            Self::ValueParse { .. } => ReconErrorKind::ValueParse,
            Self::Io(_) => ReconErrorKind::Io,
        }
    }

    /// True for data-integrity breaches found during reconciliation, as opposed
    /// to config or input problems.
    pub fn is_invariant_breach(&self) -> bool {
        matches!(
            self.kind(),
            ReconErrorKind::AmbiguousMatch
                | ReconErrorKind::MissingMatch
                | ReconErrorKind::UnexpectedOverlap
                | ReconErrorKind::VintageNotFound
                | ReconErrorKind::OutOfBoundsYear
                | ReconErrorKind::OverrideTargetNotFound
                | ReconErrorKind::UnknownPlanetName
        )
    }
}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
