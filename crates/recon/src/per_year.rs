//! Per-year discovery counts and the exponential growth fit over their
//! cumulative totals.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::matcher::{match_by_name, match_positional, Tolerance};
use crate::model::{Candidate, CatalogSet, Disposition, PlanetRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodGroup {
    Other,
    RadialVelocity,
    Transit,
}

impl MethodGroup {
    /// Stacking order, bottom first.
    pub const ALL: [MethodGroup; 3] = [Self::Other, Self::RadialVelocity, Self::Transit];

    pub fn of(method: &str) -> Self {
        match method {
            "Transit" => Self::Transit,
            "Radial Velocity" => Self::RadialVelocity,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Other => "Other",
            Self::RadialVelocity => "Radial Velocity",
            Self::Transit => "Transit",
        }
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GroupSeries {
    pub group: MethodGroup,
    pub counts: Vec<usize>,
    pub cumulative: Vec<usize>,
    pub total: usize,
}

/// Counts per method group for a contiguous run of years.
#[derive(Debug, Clone, Serialize)]
pub struct YearSeries {
    pub years: Vec<i32>,
    pub groups: Vec<GroupSeries>,
    pub totals: Vec<usize>,
    pub cumulative: Vec<usize>,
}

impl YearSeries {
    fn build(
        years: RangeInclusive<i32>,
        events: impl IntoIterator<Item = (MethodGroup, i32)>,
    ) -> Self {
        let years: Vec<i32> = years.collect();
        let first = years.first().copied().unwrap_or(0);
        let mut counts = vec![vec![0usize; years.len()]; MethodGroup::ALL.len()];

        for (group, year) in events {
            let offset = year - first;
            if offset < 0 || offset as usize >= years.len() {
                continue;
            }
            counts[group as usize][offset as usize] += 1;
        }

        let groups: Vec<GroupSeries> = MethodGroup::ALL
            .iter()
            .zip(counts)
            .map(|(&group, counts)| GroupSeries {
                group,
                cumulative: running_sum(&counts),
                total: counts.iter().sum(),
                counts,
            })
            .collect();

        let totals: Vec<usize> = (0..years.len())
            .map(|i| groups.iter().map(|g| g.counts[i]).sum())
            .collect();

        Self {
            cumulative: running_sum(&totals),
            totals,
            groups,
            years,
        }
    }

    pub fn group(&self, group: MethodGroup) -> &GroupSeries {
        &self.groups[group as usize]
    }

    pub fn count(&self, group: MethodGroup, year: i32) -> usize {
        self.years
            .iter()
            .position(|&y| y == year)
            .map_or(0, |i| self.group(group).counts[i])
    }
}

fn running_sum(values: &[usize]) -> Vec<usize> {
    values
        .iter()
        .scan(0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// From the earliest confirmation year through `last_year`.
pub fn year_range(planets: &[PlanetRecord], last_year: i32) -> RangeInclusive<i32> {
    let first = planets.iter().map(|p| p.disc_year).min().unwrap_or(last_year);
    first.min(last_year)..=last_year
}

/// Confirmed planets by year of confirmation.
pub fn confirmed_per_year(planets: &[PlanetRecord], years: RangeInclusive<i32>) -> YearSeries {
    YearSeries::build(
        years,
        planets.iter().map(|p| (MethodGroup::of(&p.method), p.disc_year)),
    )
}

/// Confirmed planets by reconciled discovery year, with the open transit
/// candidates (TOI, recent K2 revisions, KOI) added to the transit group.
///
/// A candidate that matches a confirmed planet by position or by its
/// assigned name (an accepted overlap) is already counted through that
/// planet and is skipped.
pub fn discovered_per_year(catalogs: &CatalogSet, years: RangeInclusive<i32>) -> YearSeries {
    let confirmed = catalogs.confirmed.as_slice();
    let planets = confirmed
        .iter()
        .map(|p| (MethodGroup::of(&p.method), p.year_disc));

    let toi = open_candidates(&catalogs.toi, confirmed, |r| r.year_disc);
    let k2 = open_candidates(&catalogs.k2, confirmed, |r| r.year_disc.filter(|_| r.recent));
    let koi = open_candidates(&catalogs.koi, confirmed, |r| r.year_disc);

    let candidates = toi.chain(k2).chain(koi).map(|y| (MethodGroup::Transit, y));
    YearSeries::build(years, planets.chain(candidates))
}

/// Years of the Candidate-disposition rows not already in `confirmed`.
/// `year` returns `None` for rows that should not be counted.
fn open_candidates<'a, C: Candidate + 'a>(
    rows: &'a [C],
    confirmed: &'a [PlanetRecord],
    year: impl Fn(&C) -> Option<i32> + 'a,
) -> impl Iterator<Item = i32> + 'a {
    rows.iter()
        .filter(|r| r.disposition() == Disposition::Candidate)
        .filter(move |r| !is_confirmed(*r, confirmed))
        .filter_map(move |r| year(r))
}

fn is_confirmed<C: Candidate>(row: &C, confirmed: &[PlanetRecord]) -> bool {
    let named = row
        .planet_name()
        .is_some_and(|name| !match_by_name(name, confirmed).is_empty());
    named
        || !match_positional(row.position(), row.period(), confirmed, &Tolerance::default())
            .is_empty()
}

// ---------------------------------------------------------------------------
// Growth fit
// ---------------------------------------------------------------------------

/// Exponential fit `y = exp(intercept + rate * i)` over a cumulative series,
/// where `i` is the index into the series.
#[derive(Debug, Clone, Serialize)]
pub struct GrowthFit {
    pub rate: f64,
    pub intercept: f64,
    /// Years for the cumulative total to double; absent when not growing.
    pub doubling_time: Option<f64>,
    pub predicted: Vec<f64>,
}

impl GrowthFit {
    /// The final entry is treated as a partial year covering
    /// `fraction_of_final_year` and scaled up to a full year before fitting.
    /// Points are weighted by `ln y`, so zero and one carry no weight.
    /// Returns `None` with fewer than two usable points.
    pub fn fit(cumulative: &[usize], fraction_of_final_year: f64) -> Option<Self> {
        let mut ys: Vec<f64> = cumulative.iter().map(|&v| v as f64).collect();
        let n = ys.len();
        if n >= 2 && fraction_of_final_year > 0.0 && fraction_of_final_year < 1.0 {
            ys[n - 1] = ys[n - 2] + (ys[n - 1] - ys[n - 2]) / fraction_of_final_year;
        }

        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        let mut usable = 0;
        for (i, &y) in ys.iter().enumerate() {
            if y <= 1.0 {
                continue;
            }
            let x = i as f64;
            let ln_y = y.ln();
            // residuals are scaled by ln y, so the squared weight is (ln y)^2
            let w = ln_y * ln_y;
            sw += w;
            swx += w * x;
            swy += w * ln_y;
            swxx += w * x * x;
            swxy += w * x * ln_y;
            usable += 1;
        }
        let denom = sw * swxx - swx * swx;
        if usable < 2 || denom.abs() < f64::EPSILON {
            return None;
        }

        let rate = (sw * swxy - swx * swy) / denom;
        let intercept = (swy - rate * swx) / sw;
        Some(Self {
            rate,
            intercept,
            doubling_time: (rate > 0.0).then(|| std::f64::consts::LN_2 / rate),
            predicted: (0..n).map(|i| (intercept + rate * i as f64).exp()).collect(),
        })
    }
}

/// Share of `date`'s year that has elapsed before `date`.
pub fn fraction_of_year(date: NaiveDate) -> f64 {
    let leap = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some();
    let days_in_year = if leap { 366.0 } else { 365.0 };
    f64::from(date.ordinal0()) / days_in_year
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PerYearReport {
    pub as_of: NaiveDate,
    pub confirmed: YearSeries,
    pub discovered: YearSeries,
    pub confirmed_growth: Option<GrowthFit>,
    pub discovered_growth: Option<GrowthFit>,
}

/// Both series through `as_of`'s year, with growth fits that treat that
/// year as partial.
pub fn per_year_report(catalogs: &CatalogSet, as_of: NaiveDate) -> PerYearReport {
    let years = year_range(&catalogs.confirmed, as_of.year());
    let confirmed = confirmed_per_year(&catalogs.confirmed, years.clone());
    let discovered = discovered_per_year(catalogs, years);
    let fraction = fraction_of_year(as_of);

    PerYearReport {
        as_of,
        confirmed_growth: GrowthFit::fit(&confirmed.cumulative, fraction),
        discovered_growth: GrowthFit::fit(&discovered.cumulative, fraction),
        confirmed,
        discovered,
    }
}
