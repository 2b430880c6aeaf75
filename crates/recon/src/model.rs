use serde::Serialize;

// ---------------------------------------------------------------------------
// Shared vocabulary
// ---------------------------------------------------------------------------

/// Which candidate catalog a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Koi,
    K2,
    Toi,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [Self::Koi, Self::K2, Self::Toi];

    /// Lowercase key used in exception TOML tables.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Koi => "koi",
            Self::K2 => "k2",
            Self::Toi => "toi",
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Koi => write!(f, "KOI"),
            Self::K2 => write!(f, "K2"),
            Self::Toi => write!(f, "TOI"),
        }
    }
}

/// Equatorial sky position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyPosition {
    pub ra: f64,
    pub dec: f64,
}

impl SkyPosition {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Candidate,
    Confirmed,
    FalsePositive,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate => write!(f, "Candidate"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::FalsePositive => write!(f, "False Positive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of the confirmed-planet table.
#[derive(Debug, Clone, Serialize)]
pub struct PlanetRecord {
    pub name: String,
    pub host: String,
    pub position: SkyPosition,
    pub period: Option<f64>,
    pub facility: String,
    pub method: String,
    /// Year of the original discovery publication.
    pub disc_year: i32,
    /// Derived; starts at `disc_year` and is only ever lowered.
    pub year_disc: i32,
    pub radius_earth: Option<f64>,
}

/// Kepler Object of Interest.
#[derive(Debug, Clone, Serialize)]
pub struct KoiCandidate {
    pub id: String,
    pub position: SkyPosition,
    pub period: Option<f64>,
    pub disposition: Disposition,
    /// Year of the first KOI release that lists `id`.
    pub koi_year: Option<i32>,
    pub year_disc: Option<i32>,
    pub radius_earth: Option<f64>,
}

/// One revision of a K2 candidate. The same `id` can appear in several
/// revisions; `recent` marks the current one.
#[derive(Debug, Clone, Serialize)]
pub struct K2Candidate {
    pub id: String,
    pub planet_name: Option<String>,
    pub position: SkyPosition,
    pub period: Option<f64>,
    pub disposition: Disposition,
    pub year: i32,
    pub recent: bool,
    pub year_disc: Option<i32>,
    pub radius_earth: Option<f64>,
}

/// TESS Object of Interest from ExoFOP.
#[derive(Debug, Clone, Serialize)]
pub struct ToiCandidate {
    pub id: String,
    pub tic: String,
    pub position: SkyPosition,
    pub period: Option<f64>,
    pub disposition: Disposition,
    /// ExoFOP alert year.
    pub year: i32,
    pub year_disc: Option<i32>,
    pub radius_earth: Option<f64>,
}

/// Fields every candidate catalog row exposes to the reconciler.
pub trait Candidate {
    const CATALOG: CatalogKind;

    fn id(&self) -> &str;
    fn position(&self) -> SkyPosition;
    fn period(&self) -> Option<f64>;
    fn disposition(&self) -> Disposition;

    /// Planet name the source catalog already assigned, if any.
    fn planet_name(&self) -> Option<&str> {
        None
    }
}

impl Candidate for KoiCandidate {
    const CATALOG: CatalogKind = CatalogKind::Koi;

    fn id(&self) -> &str {
        &self.id
    }
    fn position(&self) -> SkyPosition {
        self.position
    }
    fn period(&self) -> Option<f64> {
        self.period
    }
    fn disposition(&self) -> Disposition {
        self.disposition
    }
}

impl Candidate for K2Candidate {
    const CATALOG: CatalogKind = CatalogKind::K2;

    fn id(&self) -> &str {
        &self.id
    }
    fn position(&self) -> SkyPosition {
        self.position
    }
    fn period(&self) -> Option<f64> {
        self.period
    }
    fn disposition(&self) -> Disposition {
        self.disposition
    }
    fn planet_name(&self) -> Option<&str> {
        self.planet_name.as_deref()
    }
}

impl Candidate for ToiCandidate {
    const CATALOG: CatalogKind = CatalogKind::Toi;

    fn id(&self) -> &str {
        &self.id
    }
    fn position(&self) -> SkyPosition {
        self.position
    }
    fn period(&self) -> Option<f64> {
        self.period
    }
    fn disposition(&self) -> Disposition {
        self.disposition
    }
}

/// The four tables a reconciliation run consumes and produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSet {
    pub confirmed: Vec<PlanetRecord>,
    pub koi: Vec<KoiCandidate>,
    pub k2: Vec<K2Candidate>,
    pub toi: Vec<ToiCandidate>,
}

// ---------------------------------------------------------------------------
// Links + Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkVia {
    /// Unique positional match.
    Positional,
    /// Exception entry with an explicit planet name.
    Override,
}

/// A candidate row tied to the confirmed planet it describes.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub catalog: CatalogKind,
    pub candidate_index: usize,
    pub candidate_id: String,
    pub planet_index: usize,
    pub planet_name: String,
    /// min(candidate year, planet discovery year) for this pair alone.
    pub year: i32,
    pub via: LinkVia,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub confirmed: usize,
    pub candidates: usize,
    pub false_positives: usize,
    pub linked: usize,
    pub linked_by_override: usize,
    pub unlinked_exceptions: usize,
    pub overlaps_accepted: usize,
    pub stale_exceptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub exceptions_version: u32,
    pub year_ceiling: i32,
    pub koi_releases: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub koi: CatalogSummary,
    pub k2: CatalogSummary,
    pub toi: CatalogSummary,
    /// Confirmed planets whose `year_disc` ended below `disc_year`.
    pub planets_lowered: usize,
}

impl ReconReport {
    pub fn summary(&self, catalog: CatalogKind) -> &CatalogSummary {
        match catalog {
            CatalogKind::Koi => &self.koi,
            CatalogKind::K2 => &self.k2,
            CatalogKind::Toi => &self.toi,
        }
    }
}

/// Output of a successful run: fresh tables, every link made, and the report.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciled {
    pub catalogs: CatalogSet,
    pub links: Vec<Link>,
    pub report: ReconReport,
}
