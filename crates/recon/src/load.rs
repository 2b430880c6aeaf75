//! CSV loading and normalization for the four catalog tables and the KOI
//! release history.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use tracing::{debug, info};

use crate::config::{CatalogConfig, ConfirmedColumns, K2Columns, KoiColumns, ToiColumns};
use crate::error::ReconError;
use crate::exceptions::ExceptionConfig;
use crate::model::{
    CatalogSet, Disposition, K2Candidate, KoiCandidate, PlanetRecord, SkyPosition, ToiCandidate,
};
use crate::vintage::{normalize_koi_name, KoiRelease, KoiReleaseHistory};

/// Earth radii per Jupiter radius.
pub const EARTH_RADII_PER_JUPITER: f64 = 11.21;

const TESS_FACILITY_LONG: &str = "Transiting Exoplanet Survey Satellite (TESS)";

// ---------------------------------------------------------------------------
// Header lookup
// ---------------------------------------------------------------------------

struct Table {
    name: &'static str,
    headers: Vec<String>,
}

impl Table {
    fn read(name: &'static str, reader: &mut csv::Reader<&[u8]>) -> Result<Self, ReconError> {
        let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        Ok(Self { name, headers })
    }

    fn idx(&self, column: &str) -> Result<usize, ReconError> {
        self.opt_idx(column).ok_or_else(|| ReconError::MissingColumn {
            table: self.name.into(),
            column: column.into(),
        })
    }

    fn opt_idx(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn parse_err(&self, id: &str, column: &str, value: &str) -> ReconError {
        ReconError::ValueParse {
            table: self.name.into(),
            id: id.into(),
            column: column.into(),
            value: value.into(),
        }
    }

    fn float(
        &self,
        rec: &StringRecord,
        i: usize,
        id: &str,
        column: &str,
    ) -> Result<Option<f64>, ReconError> {
        let raw = cell(rec, i);
        parse_float(raw).ok_or_else(|| self.parse_err(id, column, raw))
    }

    fn opt_float(
        &self,
        rec: &StringRecord,
        i: Option<usize>,
        id: &str,
        column: &str,
    ) -> Result<Option<f64>, ReconError> {
        match i {
            Some(i) => self.float(rec, i, id, column),
            None => Ok(None),
        }
    }

    fn year(
        &self,
        rec: &StringRecord,
        i: usize,
        id: &str,
        column: &str,
    ) -> Result<i32, ReconError> {
        let raw = cell(rec, i);
        parse_year(raw).ok_or_else(|| self.parse_err(id, column, raw))
    }

    fn disposition(
        &self,
        rec: &StringRecord,
        i: usize,
        id: &str,
        column: &str,
    ) -> Result<Disposition, ReconError> {
        let raw = cell(rec, i);
        parse_disposition(raw).ok_or_else(|| self.parse_err(id, column, raw))
    }
}

fn cell(rec: &StringRecord, i: usize) -> &str {
    rec.get(i).unwrap_or("").trim()
}

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .from_reader(csv_data.as_bytes())
}

// ---------------------------------------------------------------------------
// Value normalization
// ---------------------------------------------------------------------------

/// Blank and NaN cells are `Some(None)`; garbage is `None`.
fn parse_float(raw: &str) -> Option<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    raw.parse::<f64>().ok().map(|v| v.is_finite().then_some(v))
}

/// Integer year, float year (`2016.0`) or a date beginning `YYYY-MM-DD`.
pub fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(y) = raw.parse::<i32>() {
        return Some(y);
    }
    if let Ok(y) = raw.parse::<f64>() {
        if y.fract() == 0.0 && y.abs() < 1e5 {
            return Some(y as i32);
        }
    }
    let date = raw.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(|d| d.year())
}

/// Archive labels (`CONFIRMED`, `False Positive`) and TFOPWG codes
/// (`PC`, `CP`, `KP`, `FP`, `FA`, `APC`). A blank TFOPWG cell is a candidate.
pub fn parse_disposition(raw: &str) -> Option<Disposition> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "CONFIRMED" | "CP" | "KP" => Some(Disposition::Confirmed),
        "CANDIDATE" | "PC" | "APC" | "" => Some(Disposition::Candidate),
        "FALSE POSITIVE" | "FP" | "FA" => Some(Disposition::FalsePositive),
        _ => None,
    }
}

/// Right ascension in degrees, from degrees or `hh:mm:ss.s`.
pub fn parse_ra(raw: &str) -> Option<f64> {
    if raw.contains(':') {
        sexagesimal(raw).map(|hours| hours * 15.0)
    } else {
        raw.parse().ok()
    }
}

/// Declination in degrees, from degrees or `±dd:mm:ss.s`.
pub fn parse_dec(raw: &str) -> Option<f64> {
    if raw.contains(':') {
        sexagesimal(raw)
    } else {
        raw.parse().ok()
    }
}

fn sexagesimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let negative = raw.starts_with('-');
    let mut parts = raw.trim_start_matches(['+', '-']).split(':');
    let whole: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next().unwrap_or("0").parse().ok()?;
    let seconds: f64 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some()
        || !(0.0..60.0).contains(&minutes)
        || !(0.0..60.0).contains(&seconds)
    {
        return None;
    }
    let value = whole + minutes / 60.0 + seconds / 3600.0;
    Some(if negative { -value } else { value })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "1.0" => Some(true),
        "0" | "false" | "0.0" | "" => Some(false),
        _ => None,
    }
}

fn normalize_facility(raw: &str) -> String {
    if raw == TESS_FACILITY_LONG {
        "TESS".into()
    } else {
        raw.to_string()
    }
}

/// Earth radius, falling back to the Jupiter radius when only that is known.
fn earth_radius(earth: Option<f64>, jupiter: Option<f64>) -> Option<f64> {
    earth.or_else(|| jupiter.map(|r| r * EARTH_RADII_PER_JUPITER))
}

fn prefixed(prefix: &str, raw: &str) -> String {
    if raw.starts_with(prefix) {
        raw.to_string()
    } else {
        format!("{prefix}{raw}")
    }
}

fn position(
    table: &Table,
    rec: &StringRecord,
    ra_i: usize,
    dec_i: usize,
    id: &str,
    cols: (&str, &str),
) -> Result<SkyPosition, ReconError> {
    let ra_raw = cell(rec, ra_i);
    let dec_raw = cell(rec, dec_i);
    let ra = parse_ra(ra_raw).ok_or_else(|| table.parse_err(id, cols.0, ra_raw))?;
    let dec = parse_dec(dec_raw).ok_or_else(|| table.parse_err(id, cols.1, dec_raw))?;
    Ok(SkyPosition::new(ra, dec))
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub fn load_confirmed(
    csv_data: &str,
    col: &ConfirmedColumns,
) -> Result<Vec<PlanetRecord>, ReconError> {
    let mut rdr = reader(csv_data);
    let t = Table::read("confirmed", &mut rdr)?;

    let name_i = t.idx(&col.name)?;
    let host_i = t.idx(&col.host)?;
    let ra_i = t.idx(&col.ra)?;
    let dec_i = t.idx(&col.dec)?;
    let period_i = t.idx(&col.period)?;
    let facility_i = t.idx(&col.facility)?;
    let method_i = t.idx(&col.method)?;
    let year_i = t.idx(&col.disc_year)?;
    let rade_i = t.opt_idx(&col.radius_earth);
    let radj_i = t.opt_idx(&col.radius_jupiter);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        let name = cell(&rec, name_i).to_string();
        let disc_year = t.year(&rec, year_i, &name, &col.disc_year)?;
        rows.push(PlanetRecord {
            host: cell(&rec, host_i).to_string(),
            position: position(&t, &rec, ra_i, dec_i, &name, (&col.ra, &col.dec))?,
            period: t.float(&rec, period_i, &name, &col.period)?,
            facility: normalize_facility(cell(&rec, facility_i)),
            method: cell(&rec, method_i).to_string(),
            disc_year,
            year_disc: disc_year,
            radius_earth: earth_radius(
                t.opt_float(&rec, rade_i, &name, &col.radius_earth)?,
                t.opt_float(&rec, radj_i, &name, &col.radius_jupiter)?,
            ),
            name,
        });
    }

    debug!(rows = rows.len(), "loaded confirmed planets");
    Ok(rows)
}

pub fn load_koi(csv_data: &str, col: &KoiColumns) -> Result<Vec<KoiCandidate>, ReconError> {
    let mut rdr = reader(csv_data);
    let t = Table::read("KOI", &mut rdr)?;

    let id_i = t.idx(&col.id)?;
    let ra_i = t.idx(&col.ra)?;
    let dec_i = t.idx(&col.dec)?;
    let period_i = t.idx(&col.period)?;
    let disp_i = t.idx(&col.disposition)?;
    let rade_i = t.opt_idx(&col.radius_earth);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        let id = normalize_koi_name(cell(&rec, id_i));
        rows.push(KoiCandidate {
            position: position(&t, &rec, ra_i, dec_i, &id, (&col.ra, &col.dec))?,
            period: t.float(&rec, period_i, &id, &col.period)?,
            disposition: t.disposition(&rec, disp_i, &id, &col.disposition)?,
            koi_year: None,
            year_disc: None,
            radius_earth: t.opt_float(&rec, rade_i, &id, &col.radius_earth)?,
            id,
        });
    }

    debug!(rows = rows.len(), "loaded KOIs");
    Ok(rows)
}

pub fn load_k2(csv_data: &str, col: &K2Columns) -> Result<Vec<K2Candidate>, ReconError> {
    let mut rdr = reader(csv_data);
    let t = Table::read("K2", &mut rdr)?;

    let id_i = t.idx(&col.id)?;
    let name_i = t.idx(&col.planet_name)?;
    let ra_i = t.idx(&col.ra)?;
    let dec_i = t.idx(&col.dec)?;
    let period_i = t.idx(&col.period)?;
    let disp_i = t.idx(&col.disposition)?;
    let year_i = t.idx(&col.year)?;
    let recent_i = t.idx(&col.recent)?;
    let rade_i = t.opt_idx(&col.radius_earth);
    let radj_i = t.opt_idx(&col.radius_jupiter);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        let id = cell(&rec, id_i).to_string();
        let planet_name = Some(cell(&rec, name_i)).filter(|n| !n.is_empty()).map(String::from);
        let recent_raw = cell(&rec, recent_i);
        let recent = parse_flag(recent_raw)
            .ok_or_else(|| t.parse_err(&id, &col.recent, recent_raw))?;
        rows.push(K2Candidate {
            planet_name,
            position: position(&t, &rec, ra_i, dec_i, &id, (&col.ra, &col.dec))?,
            period: t.float(&rec, period_i, &id, &col.period)?,
            disposition: t.disposition(&rec, disp_i, &id, &col.disposition)?,
            year: t.year(&rec, year_i, &id, &col.year)?,
            recent,
            year_disc: None,
            radius_earth: earth_radius(
                t.opt_float(&rec, rade_i, &id, &col.radius_earth)?,
                t.opt_float(&rec, radj_i, &id, &col.radius_jupiter)?,
            ),
            id,
        });
    }

    debug!(rows = rows.len(), "loaded K2 candidates");
    Ok(rows)
}

pub fn load_toi(csv_data: &str, col: &ToiColumns) -> Result<Vec<ToiCandidate>, ReconError> {
    let mut rdr = reader(csv_data);
    let t = Table::read("TOI", &mut rdr)?;

    let id_i = t.idx(&col.id)?;
    let tic_i = t.idx(&col.tic)?;
    let ra_i = t.idx(&col.ra)?;
    let dec_i = t.idx(&col.dec)?;
    let period_i = t.idx(&col.period)?;
    let disp_i = t.idx(&col.disposition)?;
    let year_i = t.idx(&col.year)?;
    let rade_i = t.opt_idx(&col.radius_earth);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        let id = prefixed("TOI-", cell(&rec, id_i));
        rows.push(ToiCandidate {
            tic: prefixed("TIC ", cell(&rec, tic_i)),
            position: position(&t, &rec, ra_i, dec_i, &id, (&col.ra, &col.dec))?,
            period: t.float(&rec, period_i, &id, &col.period)?,
            disposition: t.disposition(&rec, disp_i, &id, &col.disposition)?,
            year: t.year(&rec, year_i, &id, &col.year)?,
            year_disc: None,
            radius_earth: t.opt_float(&rec, rade_i, &id, &col.radius_earth)?,
            id,
        });
    }

    debug!(rows = rows.len(), "loaded TOIs");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// KOI releases
// ---------------------------------------------------------------------------

/// A pre-archive release: whitespace-separated text whose first column is
/// the bare KOI number.
pub fn load_koi_release_text(label: &str, year: i32, text: &str, skip_rows: usize) -> KoiRelease {
    let ids = text
        .lines()
        .skip(skip_rows)
        .filter_map(|line| line.split_whitespace().next())
        .filter(|first| !first.starts_with('#'));
    KoiRelease::new(label, year, ids)
}

/// An archived release table; only the identifier column is read.
pub fn load_koi_release_csv(
    label: &str,
    year: i32,
    csv_data: &str,
    id_column: &str,
) -> Result<KoiRelease, ReconError> {
    let mut rdr = reader(csv_data);
    let t = Table::read("KOI release", &mut rdr)?;
    let id_i = t.idx(id_column)?;

    let mut ids = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        ids.push(cell(&rec, id_i).to_string());
    }
    Ok(KoiRelease::new(label, year, ids))
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Everything a reconciliation run needs, read from disk.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalogs: CatalogSet,
    pub history: KoiReleaseHistory,
    pub exceptions: ExceptionConfig,
}

fn read_file(base_dir: &Path, file: &str) -> Result<String, ReconError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))
}

/// Load every file named in `config`, resolving paths against `base_dir`.
pub fn load_catalog_dir(
    config: &CatalogConfig,
    base_dir: &Path,
) -> Result<LoadedCatalog, ReconError> {
    let tables = &config.tables;
    let catalogs = CatalogSet {
        confirmed: load_confirmed(
            &read_file(base_dir, &tables.confirmed.file)?,
            &tables.confirmed.columns,
        )?,
        koi: load_koi(&read_file(base_dir, &tables.koi.file)?, &tables.koi.columns)?,
        k2: load_k2(&read_file(base_dir, &tables.k2.file)?, &tables.k2.columns)?,
        toi: load_toi(&read_file(base_dir, &tables.toi.file)?, &tables.toi.columns)?,
    };

    let mut releases = Vec::new();
    for r in &config.koi_history.pre_archive {
        let text = read_file(base_dir, &r.file)?;
        releases.push(load_koi_release_text(&r.file, r.year, &text, r.skip_rows));
    }
    for r in &config.koi_history.archived {
        let data = read_file(base_dir, &r.file)?;
        releases.push(load_koi_release_csv(&r.file, r.year, &data, &r.id_column)?);
    }
    let history = KoiReleaseHistory::new(releases)?;

    let exceptions = match &config.exceptions {
        Some(file) => ExceptionConfig::from_toml(&read_file(base_dir, file)?)?,
        None => ExceptionConfig::builtin()?,
    };

    info!(
        confirmed = catalogs.confirmed.len(),
        koi = catalogs.koi.len(),
        k2 = catalogs.k2.len(),
        toi = catalogs.toi.len(),
        releases = history.releases().len(),
        "catalogs loaded"
    );

    Ok(LoadedCatalog {
        catalogs,
        history,
        exceptions,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
