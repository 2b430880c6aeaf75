use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::error::ReconError;
use crate::exceptions::{ExceptionCategory, ExceptionConfig};
use crate::matcher::{match_by_name, match_names, match_positional, Tolerance};
use crate::model::{
    Candidate, CatalogKind, CatalogSet, CatalogSummary, Disposition, K2Candidate, KoiCandidate,
    Link, LinkVia, PlanetRecord, ReconMeta, ReconReport, Reconciled,
};
use crate::vintage::KoiReleaseHistory;

/// Years past the current one that a derived year may reach.
pub const YEAR_BUFFER: i32 = 1;

/// Nothing in these catalogs predates this.
pub const YEAR_FLOOR: i32 = 1900;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReconOptions {
    pub tolerance: Tolerance,
    pub year_floor: i32,
    /// Inclusive upper bound for every derived `year_disc`.
    pub year_ceiling: i32,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            year_floor: YEAR_FLOOR,
            year_ceiling: chrono::Utc::now().year() + YEAR_BUFFER,
        }
    }
}

impl ReconOptions {
    pub fn with_year_ceiling(mut self, year_ceiling: i32) -> Self {
        self.year_ceiling = year_ceiling;
        self
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Reconcile the three candidate catalogs against the confirmed table.
///
/// `input` is left untouched. Every catalog pass runs against the original
/// confirmed snapshot; their outcomes are applied only once all three passes
/// have succeeded, so an error leaves nothing half-written.
pub fn reconcile(
    input: &CatalogSet,
    history: &KoiReleaseHistory,
    exceptions: &ExceptionConfig,
    options: &ReconOptions,
) -> Result<Reconciled, ReconError> {
    let confirmed = &input.confirmed;

    let koi_years = koi_vintage_years(&input.koi, history)?;
    let k2_years = k2_initial_years(&input.k2);
    let toi_years: Vec<i32> = input.toi.iter().map(|t| t.year).collect();

    let koi = reconcile_catalog(&input.koi, &koi_years, confirmed, exceptions, options)?;
    let k2 = reconcile_catalog(&input.k2, &k2_years, confirmed, exceptions, options)?;
    let toi = reconcile_catalog(&input.toi, &toi_years, confirmed, exceptions, options)?;

    let mut out = input.clone();
    for planet in &mut out.confirmed {
        planet.year_disc = planet.disc_year;
    }
    for (row, &year) in out.koi.iter_mut().zip(&koi_years) {
        row.koi_year = Some(year);
        row.year_disc = Some(year);
    }
    for (row, &year) in out.k2.iter_mut().zip(&k2_years) {
        row.year_disc = Some(year);
    }
    for (row, &year) in out.toi.iter_mut().zip(&toi_years) {
        row.year_disc = Some(year);
    }

    let mut links = koi.links;
    links.extend(k2.links);
    links.extend(toi.links);
    settle_years(&mut out, &links);

    check_year_bounds(&out, options)?;

    let planets_lowered = out
        .confirmed
        .iter()
        .filter(|p| p.year_disc < p.disc_year)
        .count();

    info!(
        links = links.len(),
        planets_lowered,
        "reconciliation complete"
    );

    Ok(Reconciled {
        catalogs: out,
        links,
        report: ReconReport {
            meta: ReconMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                exceptions_version: exceptions.version,
                year_ceiling: options.year_ceiling,
                koi_releases: history.releases().len(),
            },
            koi: koi.summary,
            k2: k2.summary,
            toi: toi.summary,
            planets_lowered,
        },
    })
}

// ---------------------------------------------------------------------------
// Initial years
// ---------------------------------------------------------------------------

/// Vintage year for every KOI row, bound-checked against the release history.
pub fn koi_vintage_years(
    rows: &[KoiCandidate],
    history: &KoiReleaseHistory,
) -> Result<Vec<i32>, ReconError> {
    let (min, max) = (history.earliest_year(), history.latest_year());
    rows.iter()
        .map(|row| {
            let year = history.resolve(&row.id)?;
            if year < min || year > max {
                return Err(ReconError::OutOfBoundsYear {
                    table: "KOI vintage".into(),
                    id: row.id.clone(),
                    year,
                    min,
                    max,
                });
            }
            Ok(year)
        })
        .collect()
}

/// Earliest publication year across every revision sharing a K2 identifier.
pub fn k2_initial_years(rows: &[K2Candidate]) -> Vec<i32> {
    let mut earliest: HashMap<&str, i32> = HashMap::new();
    for row in rows {
        earliest
            .entry(row.id.as_str())
            .and_modify(|y| *y = (*y).min(row.year))
            .or_insert(row.year);
    }
    rows.iter().map(|row| earliest[row.id.as_str()]).collect()
}

// ---------------------------------------------------------------------------
// Per-catalog pass
// ---------------------------------------------------------------------------

/// Links and counts from one catalog, computed against a read-only snapshot.
#[derive(Debug)]
pub struct CatalogOutcome {
    pub links: Vec<Link>,
    pub summary: CatalogSummary,
}

/// Check every row of one candidate catalog against the confirmed table.
///
/// `years` holds each row's initial discovery year estimate, index-aligned
/// with `rows`.
pub fn reconcile_catalog<C: Candidate>(
    rows: &[C],
    years: &[i32],
    confirmed: &[PlanetRecord],
    exceptions: &ExceptionConfig,
    options: &ReconOptions,
) -> Result<CatalogOutcome, ReconError> {
    let catalog = C::CATALOG;
    let listed = exceptions.for_catalog(catalog);
    let mut used: HashSet<&str> = HashSet::new();
    let mut links = Vec::new();
    let mut summary = CatalogSummary {
        total: rows.len(),
        ..CatalogSummary::default()
    };

    for (index, (row, &year)) in rows.iter().zip(years).enumerate() {
        let id = row.id();

        match row.disposition() {
            Disposition::FalsePositive => {
                summary.false_positives += 1;
            }

            Disposition::Confirmed => {
                summary.confirmed += 1;

                if let Some(name) = row.planet_name() {
                    if match_by_name(name, confirmed).is_empty() {
                        return Err(ReconError::UnknownPlanetName {
                            catalog,
                            id: id.to_string(),
                            planet: name.to_string(),
                        });
                    }
                }

                let hits =
                    match_positional(row.position(), row.period(), confirmed, &options.tolerance);
                let mismatch = exceptions.lookup(catalog, ExceptionCategory::ConfirmedMismatch, id);
                let (planet_index, via) = if hits.len() == 1 {
                    (hits[0], LinkVia::Positional)
                } else if let Some(entry) = mismatch {
                    used.insert(id);
                    let Some(planet) = entry.planet.as_deref() else {
                        debug!(
                            %catalog,
                            id,
                            matches = hits.len(),
                            "listed mismatch left unlinked"
                        );
                        summary.unlinked_exceptions += 1;
                        continue;
                    };
                    let named = match_by_name(planet, confirmed);
                    if named.len() != 1 {
                        return Err(ReconError::OverrideTargetNotFound {
                            catalog,
                            id: id.to_string(),
                            planet: planet.to_string(),
                            found: named.len(),
                        });
                    }
                    (named[0], LinkVia::Override)
                } else if hits.is_empty() {
                    return Err(ReconError::MissingMatch {
                        catalog,
                        id: id.to_string(),
                    });
                } else {
                    return Err(ReconError::AmbiguousMatch {
                        catalog,
                        id: id.to_string(),
                        matches: match_names(&hits, confirmed),
                    });
                };

                let planet = &confirmed[planet_index];
                let link_year = year.min(planet.disc_year);
                debug!(%catalog, id, planet = %planet.name, year = link_year, ?via, "linked");

                summary.linked += 1;
                if via == LinkVia::Override {
                    summary.linked_by_override += 1;
                }
                links.push(Link {
                    catalog,
                    candidate_index: index,
                    candidate_id: id.to_string(),
                    planet_index,
                    planet_name: planet.name.clone(),
                    year: link_year,
                    via,
                });
            }

            Disposition::Candidate => {
                summary.candidates += 1;

                let mut hits =
                    match_positional(row.position(), row.period(), confirmed, &options.tolerance);
                if let Some(name) = row.planet_name() {
                    for i in match_by_name(name, confirmed) {
                        if !hits.contains(&i) {
                            hits.push(i);
                        }
                    }
                }
                if hits.is_empty() {
                    continue;
                }

                match exceptions.lookup(catalog, ExceptionCategory::CandidateOverlap, id) {
                    Some(_) => {
                        used.insert(id);
                        summary.overlaps_accepted += 1;
                        debug!(%catalog, id, matches = hits.len(), "listed overlap accepted");
                    }
                    None => {
                        return Err(ReconError::UnexpectedOverlap {
                            catalog,
                            id: id.to_string(),
                            matches: match_names(&hits, confirmed),
                        });
                    }
                }
            }
        }
    }

    summary.stale_exceptions = listed
        .confirmed_mismatch
        .keys()
        .chain(listed.candidate_overlap.keys())
        .filter(|k| !used.contains(k.as_str()))
        .cloned()
        .collect();
    for id in &summary.stale_exceptions {
        warn!(%catalog, id, "exception entry was not needed by this data");
    }

    info!(
        %catalog,
        total = summary.total,
        linked = summary.linked,
        overrides = summary.linked_by_override,
        overlaps = summary.overlaps_accepted,
        "catalog reconciled"
    );

    Ok(CatalogOutcome { links, summary })
}

// ---------------------------------------------------------------------------
// Year propagation
// ---------------------------------------------------------------------------

fn candidate_year_mut(
    out: &mut CatalogSet,
    catalog: CatalogKind,
    index: usize,
) -> &mut Option<i32> {
    match catalog {
        CatalogKind::Koi => &mut out.koi[index].year_disc,
        CatalogKind::K2 => &mut out.k2[index].year_disc,
        CatalogKind::Toi => &mut out.toi[index].year_disc,
    }
}

/// Pull linked planets and candidates down to a common minimum year.
///
/// A planet linked from several catalogs takes the smallest year among all
/// of them, and each linked row then takes the planet's year. K2 revisions
/// of one identifier share their minimum. Years only ever decrease, so this
/// reaches a fixed point.
fn settle_years(out: &mut CatalogSet, links: &[Link]) {
    loop {
        let mut changed = false;

        for link in links {
            let planet_year = out.confirmed[link.planet_index].year_disc;
            let slot = candidate_year_mut(out, link.catalog, link.candidate_index);
            let year = slot.map_or(link.year, |c| c.min(link.year)).min(planet_year);
            if *slot != Some(year) {
                *slot = Some(year);
                changed = true;
            }
            if planet_year != year {
                out.confirmed[link.planet_index].year_disc = year;
                changed = true;
            }
        }

        changed |= spread_k2_revisions(&mut out.k2);

        if !changed {
            break;
        }
    }
}

/// Give every revision of a K2 identifier the group's minimum year.
fn spread_k2_revisions(rows: &mut [K2Candidate]) -> bool {
    let mut earliest: BTreeMap<String, i32> = BTreeMap::new();
    for row in rows.iter() {
        if let Some(y) = row.year_disc {
            earliest
                .entry(row.id.clone())
                .and_modify(|e| *e = (*e).min(y))
                .or_insert(y);
        }
    }

    let mut changed = false;
    for row in rows.iter_mut() {
        if let Some(&y) = earliest.get(&row.id) {
            if row.year_disc != Some(y) {
                row.year_disc = Some(y);
                changed = true;
            }
        }
    }
    changed
}

// ---------------------------------------------------------------------------
// Sanity bound
// ---------------------------------------------------------------------------

fn check_year_bounds(out: &CatalogSet, options: &ReconOptions) -> Result<(), ReconError> {
    let (min, max) = (options.year_floor, options.year_ceiling);
    let check = |table: &str, id: &str, year: Option<i32>| -> Result<(), ReconError> {
        match year {
            Some(y) if (min..=max).contains(&y) => Ok(()),
            _ => Err(ReconError::OutOfBoundsYear {
                table: table.into(),
                id: id.into(),
                year: year.unwrap_or(i32::MIN),
                min,
                max,
            }),
        }
    };

    for p in &out.confirmed {
        check("confirmed", &p.name, Some(p.year_disc))?;
    }
    for r in &out.koi {
        check("KOI", &r.id, r.year_disc)?;
    }
    for r in &out.k2 {
        check("K2", &r.id, r.year_disc)?;
    }
    for r in &out.toi {
        check("TOI", &r.id, r.year_disc)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
