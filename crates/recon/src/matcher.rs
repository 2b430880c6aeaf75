use crate::model::{PlanetRecord, SkyPosition};

/// One arcminute, in degrees.
pub const ARCMINUTE_DEG: f64 = 1.0 / 60.0;

/// One minute of orbital period, in days.
pub const PERIOD_TOLERANCE_DAYS: f64 = 1.0 / 60.0;

/// Per-axis match limits. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub period_days: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            ra_deg: ARCMINUTE_DEG,
            dec_deg: ARCMINUTE_DEG,
            period_days: PERIOD_TOLERANCE_DAYS,
        }
    }
}

impl Tolerance {
    /// True if the two descriptions are close enough to be the same object.
    ///
    /// A missing or NaN period on either side never matches.
    pub fn accepts(
        &self,
        a: SkyPosition,
        a_period: Option<f64>,
        b: SkyPosition,
        b_period: Option<f64>,
    ) -> bool {
        let period_close = match (a_period, b_period) {
            (Some(pa), Some(pb)) => (pa - pb).abs() < self.period_days,
            _ => false,
        };
        (a.ra - b.ra).abs() < self.ra_deg && (a.dec - b.dec).abs() < self.dec_deg && period_close
    }
}

/// Indices of every confirmed planet within tolerance of the given position
/// and period, in table order.
pub fn match_positional(
    position: SkyPosition,
    period: Option<f64>,
    confirmed: &[PlanetRecord],
    tolerance: &Tolerance,
) -> Vec<usize> {
    confirmed
        .iter()
        .enumerate()
        .filter(|(_, p)| tolerance.accepts(position, period, p.position, p.period))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of confirmed planets with exactly this name.
pub fn match_by_name(name: &str, confirmed: &[PlanetRecord]) -> Vec<usize> {
    confirmed
        .iter()
        .enumerate()
        .filter(|(_, p)| p.name == name)
        .map(|(i, _)| i)
        .collect()
}

/// Names for a set of matched indices, for error context.
pub fn match_names(indices: &[usize], confirmed: &[PlanetRecord]) -> Vec<String> {
    indices.iter().map(|&i| confirmed[i].name.clone()).collect()
}
