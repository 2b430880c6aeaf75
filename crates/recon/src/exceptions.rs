use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::CatalogKind;

/// Exception table shipped with the engine.
pub const BUILTIN_EXCEPTIONS: &str = include_str!("../data/exceptions.toml");

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Curated positional-match exceptions, per catalog and category.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionConfig {
    pub version: u32,
    #[serde(default)]
    pub koi: CatalogExceptions,
    #[serde(default)]
    pub k2: CatalogExceptions,
    #[serde(default)]
    pub toi: CatalogExceptions,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogExceptions {
    #[serde(default)]
    pub confirmed_mismatch: BTreeMap<String, ExceptionEntry>,
    #[serde(default)]
    pub candidate_overlap: BTreeMap<String, ExceptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionEntry {
    /// Confirmed-table name to link to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCategory {
    ConfirmedMismatch,
    CandidateOverlap,
}

impl std::fmt::Display for ExceptionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfirmedMismatch => write!(f, "confirmed_mismatch"),
            Self::CandidateOverlap => write!(f, "candidate_overlap"),
        }
    }
}

impl CatalogExceptions {
    pub fn category(&self, category: ExceptionCategory) -> &BTreeMap<String, ExceptionEntry> {
        match category {
            ExceptionCategory::ConfirmedMismatch => &self.confirmed_mismatch,
            ExceptionCategory::CandidateOverlap => &self.candidate_overlap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed_mismatch.is_empty() && self.candidate_overlap.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ExceptionConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ExceptionConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded exception table.
    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(BUILTIN_EXCEPTIONS)
    }

    /// No exceptions at all; every anomaly is fatal.
    pub fn empty() -> Self {
        Self {
            version: 1,
            koi: CatalogExceptions::default(),
            k2: CatalogExceptions::default(),
            toi: CatalogExceptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.version == 0 {
            return Err(ReconError::ConfigValidation(
                "exceptions version must be >= 1".into(),
            ));
        }

        for kind in CatalogKind::ALL {
            let cat = self.for_catalog(kind);

            for (category, entries) in [
                (ExceptionCategory::ConfirmedMismatch, &cat.confirmed_mismatch),
                (ExceptionCategory::CandidateOverlap, &cat.candidate_overlap),
            ] {
                for (id, entry) in entries {
                    if id.trim().is_empty() {
                        return Err(ReconError::ConfigValidation(format!(
                            "{}.{category}: empty identifier",
                            kind.key()
                        )));
                    }
                    if entry.reason.trim().is_empty() {
                        return Err(ReconError::ConfigValidation(format!(
                            "{}.{category} '{id}': reason is required",
                            kind.key()
                        )));
                    }
                    if matches!(entry.planet.as_deref(), Some(p) if p.trim().is_empty()) {
                        return Err(ReconError::ConfigValidation(format!(
                            "{}.{category} '{id}': planet must not be empty",
                            kind.key()
                        )));
                    }
                    if kind == CatalogKind::Koi && !id.starts_with("KOI-") {
                        return Err(ReconError::ConfigValidation(format!(
                            "koi.{category} '{id}': KOI identifiers use the KOI-<number> form"
                        )));
                    }
                }
            }

            // A row is either Confirmed or Candidate, never both
            if let Some(id) = cat
                .confirmed_mismatch
                .keys()
                .find(|id| cat.candidate_overlap.contains_key(*id))
            {
                return Err(ReconError::ConfigValidation(format!(
                    "{} '{id}' is listed as both confirmed_mismatch and candidate_overlap",
                    kind.key()
                )));
            }
        }

        Ok(())
    }

    pub fn for_catalog(&self, kind: CatalogKind) -> &CatalogExceptions {
        match kind {
            CatalogKind::Koi => &self.koi,
            CatalogKind::K2 => &self.k2,
            CatalogKind::Toi => &self.toi,
        }
    }

    pub fn lookup(
        &self,
        kind: CatalogKind,
        category: ExceptionCategory,
        id: &str,
    ) -> Option<&ExceptionEntry> {
        self.for_catalog(kind).category(category).get(id)
    }

    pub fn entry_count(&self) -> usize {
        CatalogKind::ALL
            .iter()
            .map(|&k| {
                let c = self.for_catalog(k);
                c.confirmed_mismatch.len() + c.candidate_overlap.len()
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
