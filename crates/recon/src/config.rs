use serde::Deserialize;

use crate::engine::{ReconOptions, YEAR_FLOOR};
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Where the input tables live and how to read them.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    pub tables: TablesConfig,
    pub koi_history: KoiHistoryConfig,
    /// Exception table path; the built-in table is used when absent.
    #[serde(default)]
    pub exceptions: Option<String>,
    #[serde(default)]
    pub year_ceiling: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    pub confirmed: TableConfig<ConfirmedColumns>,
    pub koi: TableConfig<KoiColumns>,
    pub k2: TableConfig<K2Columns>,
    pub toi: TableConfig<ToiColumns>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de> + Default"))]
pub struct TableConfig<C> {
    pub file: String,
    #[serde(default)]
    pub columns: C,
}

// ---------------------------------------------------------------------------
// Column mappings
// ---------------------------------------------------------------------------
//
// Defaults are the NASA Exoplanet Archive / ExoFOP column names. Radius
// columns are optional: if the header is absent the radius is left unset.

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmedColumns {
    pub name: String,
    pub host: String,
    pub ra: String,
    pub dec: String,
    pub period: String,
    pub facility: String,
    pub method: String,
    pub disc_year: String,
    pub radius_earth: String,
    pub radius_jupiter: String,
}

impl Default for ConfirmedColumns {
    fn default() -> Self {
        Self {
            name: "pl_name".into(),
            host: "pl_hostname".into(),
            ra: "ra".into(),
            dec: "dec".into(),
            period: "pl_orbper".into(),
            facility: "pl_facility".into(),
            method: "pl_discmethod".into(),
            disc_year: "pl_disc".into(),
            radius_earth: "pl_rade".into(),
            radius_jupiter: "pl_radj".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KoiColumns {
    pub id: String,
    pub ra: String,
    pub dec: String,
    pub period: String,
    pub disposition: String,
    pub radius_earth: String,
}

impl Default for KoiColumns {
    fn default() -> Self {
        Self {
            id: "kepoi_name".into(),
            ra: "ra".into(),
            dec: "dec".into(),
            period: "koi_period".into(),
            disposition: "koi_disposition".into(),
            radius_earth: "koi_prad".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct K2Columns {
    pub id: String,
    pub planet_name: String,
    pub ra: String,
    pub dec: String,
    pub period: String,
    pub disposition: String,
    pub year: String,
    pub recent: String,
    pub radius_earth: String,
    pub radius_jupiter: String,
}

impl Default for K2Columns {
    fn default() -> Self {
        Self {
            id: "epic_candname".into(),
            planet_name: "pl_name".into(),
            ra: "ra".into(),
            dec: "dec".into(),
            period: "pl_orbper".into(),
            disposition: "k2c_disp".into(),
            year: "year".into(),
            recent: "k2c_recentflag".into(),
            radius_earth: "pl_rade".into(),
            radius_jupiter: "pl_radj".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToiColumns {
    pub id: String,
    pub tic: String,
    pub ra: String,
    pub dec: String,
    pub period: String,
    pub disposition: String,
    /// Integer year or a date starting with `YYYY-MM-DD`.
    pub year: String,
    pub radius_earth: String,
}

impl Default for ToiColumns {
    fn default() -> Self {
        Self {
            id: "TOI".into(),
            tic: "TIC ID".into(),
            ra: "RA".into(),
            dec: "Dec".into(),
            period: "Period (days)".into(),
            disposition: "TFOPWG Disposition".into(),
            year: "Date TOI Alerted (UTC)".into(),
            radius_earth: "Planet Radius (R_Earth)".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// KOI history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KoiHistoryConfig {
    /// Plain-text releases that predate the archive, oldest first.
    #[serde(default)]
    pub pre_archive: Vec<PreArchiveRelease>,
    /// Archived release tables, oldest first.
    #[serde(default)]
    pub archived: Vec<ArchivedRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreArchiveRelease {
    pub file: String,
    pub year: i32,
    /// Header lines to skip before the identifier column starts.
    #[serde(default)]
    pub skip_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedRelease {
    pub file: String,
    pub year: i32,
    #[serde(default = "default_koi_id_column")]
    pub id_column: String,
}

fn default_koi_id_column() -> String {
    "kepoi_name".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CatalogConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: CatalogConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (table, file) in [
            ("confirmed", &self.tables.confirmed.file),
            ("koi", &self.tables.koi.file),
            ("k2", &self.tables.k2.file),
            ("toi", &self.tables.toi.file),
        ] {
            if file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "tables.{table}: file must not be empty"
                )));
            }
        }

        let history = &self.koi_history;
        if history.pre_archive.is_empty() && history.archived.is_empty() {
            return Err(ReconError::ConfigValidation(
                "koi_history needs at least one release".into(),
            ));
        }

        // Releases are scanned oldest first, so years must never go backwards
        let years: Vec<(&str, i32)> = history
            .pre_archive
            .iter()
            .map(|r| (r.file.as_str(), r.year))
            .chain(history.archived.iter().map(|r| (r.file.as_str(), r.year)))
            .collect();
        for pair in years.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(ReconError::ConfigValidation(format!(
                    "koi_history: '{}' ({}) is older than the release before it, '{}' ({})",
                    pair[1].0, pair[1].1, pair[0].0, pair[0].1
                )));
            }
        }

        if let Some(ceiling) = self.year_ceiling {
            if ceiling < YEAR_FLOOR {
                return Err(ReconError::ConfigValidation(format!(
                    "year_ceiling {ceiling} is below {YEAR_FLOOR}"
                )));
            }
        }

        Ok(())
    }

    /// Reconciliation options implied by this config.
    pub fn recon_options(&self) -> ReconOptions {
        let options = ReconOptions::default();
        match self.year_ceiling {
            Some(ceiling) => options.with_year_ceiling(ceiling),
            None => options,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
