//! `exoplots reconcile` and `exoplots per-year`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use exoplots_recon::model::{
    CatalogSummary, K2Candidate, KoiCandidate, Link, PlanetRecord, ReconReport, ToiCandidate,
};
use exoplots_recon::per_year::{per_year_report, MethodGroup, PerYearReport, YearSeries};
use exoplots_recon::{
    load_catalog_dir, reconcile, CatalogConfig, CatalogKind, CatalogSet, Reconciled,
};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_LOAD, EXIT_WRITE};
use crate::CliError;

fn write_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_WRITE, msg)
}

/// Parse the catalog config and run the full load + reconcile pipeline.
fn load_and_reconcile(config_path: &Path) -> Result<Reconciled, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(EXIT_LOAD, format!("cannot read {}: {e}", config_path.display()))
    })?;

    let config = CatalogConfig::from_toml(&config_str).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, e.to_string())
            .with_hint(format!("in {}", config_path.display()))
    })?;

    // Table paths are relative to the config file
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    tracing::debug!(config = %config_path.display(), name = %config.name, "loading catalogs");
    let loaded = load_catalog_dir(&config, base_dir).map_err(CliError::recon)?;

    reconcile(
        &loaded.catalogs,
        &loaded.history,
        &loaded.exceptions,
        &config.recon_options(),
    )
    .map_err(CliError::recon)
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a ReconReport,
    links: &'a [Link],
}

pub fn cmd_reconcile(
    config_path: PathBuf,
    out_dir: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let out = load_and_reconcile(&config_path)?;

    let json_str = serde_json::to_string_pretty(&RunOutput {
        report: &out.report,
        links: &out.links,
    })
    .map_err(|e| write_err(format!("JSON serialization error: {e}")))?;

    if let Some(ref dir) = out_dir {
        write_tables(dir, &out.catalogs)?;
        let path = dir.join("report.json");
        std::fs::write(&path, &json_str)
            .map_err(|e| write_err(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", dir.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    for kind in CatalogKind::ALL {
        print_summary(kind, out.report.summary(kind));
    }
    eprintln!(
        "{} link(s); {} confirmed planet(s) moved to an earlier discovery year",
        out.links.len(),
        out.report.planets_lowered,
    );

    Ok(())
}

fn print_summary(kind: CatalogKind, s: &CatalogSummary) {
    eprintln!(
        "{kind}: {} rows ({} confirmed, {} candidate, {} false positive); \
         {} linked, {} via exception, {} unlinked by exception, {} overlap(s) accepted",
        s.total,
        s.confirmed,
        s.candidates,
        s.false_positives,
        s.linked,
        s.linked_by_override,
        s.unlinked_exceptions,
        s.overlaps_accepted,
    );
    if !s.stale_exceptions.is_empty() {
        eprintln!("{kind}: {} exception entr(ies) unused by this data", s.stale_exceptions.len());
    }
}

// ---------------------------------------------------------------------------
// Annotated tables
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ConfirmedRow<'a> {
    pl_name: &'a str,
    pl_hostname: &'a str,
    ra: f64,
    dec: f64,
    pl_orbper: Option<f64>,
    pl_facility: &'a str,
    pl_discmethod: &'a str,
    pl_disc: i32,
    pl_rade: Option<f64>,
    year_disc: i32,
}

impl<'a> From<&'a PlanetRecord> for ConfirmedRow<'a> {
    fn from(p: &'a PlanetRecord) -> Self {
        Self {
            pl_name: &p.name,
            pl_hostname: &p.host,
            ra: p.position.ra,
            dec: p.position.dec,
            pl_orbper: p.period,
            pl_facility: &p.facility,
            pl_discmethod: &p.method,
            pl_disc: p.disc_year,
            pl_rade: p.radius_earth,
            year_disc: p.year_disc,
        }
    }
}

#[derive(Serialize)]
struct KoiRow<'a> {
    kepoi_name: &'a str,
    ra: f64,
    dec: f64,
    koi_period: Option<f64>,
    koi_disposition: String,
    koi_prad: Option<f64>,
    koi_year: Option<i32>,
    year_disc: Option<i32>,
}

impl<'a> From<&'a KoiCandidate> for KoiRow<'a> {
    fn from(r: &'a KoiCandidate) -> Self {
        Self {
            kepoi_name: &r.id,
            ra: r.position.ra,
            dec: r.position.dec,
            koi_period: r.period,
            koi_disposition: r.disposition.to_string(),
            koi_prad: r.radius_earth,
            koi_year: r.koi_year,
            year_disc: r.year_disc,
        }
    }
}

#[derive(Serialize)]
struct K2Row<'a> {
    epic_candname: &'a str,
    pl_name: Option<&'a str>,
    ra: f64,
    dec: f64,
    pl_orbper: Option<f64>,
    k2c_disp: String,
    year: i32,
    k2c_recentflag: u8,
    pl_rade: Option<f64>,
    year_disc: Option<i32>,
}

impl<'a> From<&'a K2Candidate> for K2Row<'a> {
    fn from(r: &'a K2Candidate) -> Self {
        Self {
            epic_candname: &r.id,
            pl_name: r.planet_name.as_deref(),
            ra: r.position.ra,
            dec: r.position.dec,
            pl_orbper: r.period,
            k2c_disp: r.disposition.to_string(),
            year: r.year,
            k2c_recentflag: u8::from(r.recent),
            pl_rade: r.radius_earth,
            year_disc: r.year_disc,
        }
    }
}

#[derive(Serialize)]
struct ToiRow<'a> {
    toi: &'a str,
    tic: &'a str,
    ra: f64,
    dec: f64,
    period: Option<f64>,
    disposition: String,
    year: i32,
    radius_earth: Option<f64>,
    year_disc: Option<i32>,
}

impl<'a> From<&'a ToiCandidate> for ToiRow<'a> {
    fn from(r: &'a ToiCandidate) -> Self {
        Self {
            toi: &r.id,
            tic: &r.tic,
            ra: r.position.ra,
            dec: r.position.dec,
            period: r.period,
            disposition: r.disposition.to_string(),
            year: r.year,
            radius_earth: r.radius_earth,
            year_disc: r.year_disc,
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), CliError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| write_err(format!("cannot create {}: {e}", path.display())))?;
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| write_err(format!("cannot write {}: {e}", path.display())))?;
    }
    wtr.flush()
        .map_err(|e| write_err(format!("cannot write {}: {e}", path.display())))?;
    Ok(())
}

fn write_tables(dir: &Path, catalogs: &CatalogSet) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| write_err(format!("cannot create {}: {e}", dir.display())))?;

    write_csv(&dir.join("confirmed.csv"), catalogs.confirmed.iter().map(ConfirmedRow::from))?;
    write_csv(&dir.join("koi.csv"), catalogs.koi.iter().map(KoiRow::from))?;
    write_csv(&dir.join("k2.csv"), catalogs.k2.iter().map(K2Row::from))?;
    write_csv(&dir.join("toi.csv"), catalogs.toi.iter().map(ToiRow::from))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// per-year
// ---------------------------------------------------------------------------

pub fn cmd_per_year(
    config_path: PathBuf,
    output: Option<PathBuf>,
    as_of: Option<NaiveDate>,
) -> Result<(), CliError> {
    let out = load_and_reconcile(&config_path)?;
    let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let report = per_year_report(&out.catalogs, as_of);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| write_err(format!("JSON serialization error: {e}")))?;

    match output {
        Some(ref path) => {
            std::fs::write(path, &json_str)
                .map_err(|e| write_err(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json_str}"),
    }

    print_per_year_summary(&report);
    Ok(())
}

fn print_per_year_summary(report: &PerYearReport) {
    let years = &report.confirmed.years;
    let (Some(first), Some(last)) = (years.first(), years.last()) else {
        return;
    };
    let total = |s: &YearSeries| s.cumulative.last().copied().unwrap_or(0);

    eprintln!(
        "{first}-{last}: {} confirmed, {} including open candidates",
        total(&report.confirmed),
        total(&report.discovered),
    );
    for group in MethodGroup::ALL {
        eprintln!(
            "  {}: {} confirmed, {} including candidates",
            group.label(),
            report.confirmed.group(group).total,
            report.discovered.group(group).total,
        );
    }
    for (label, fit) in [
        ("confirmed", &report.confirmed_growth),
        ("with candidates", &report.discovered_growth),
    ] {
        if let Some(t) = fit.as_ref().and_then(|f| f.doubling_time) {
            eprintln!("doubling time ({label}): {t:.2} years");
        }
    }
}
