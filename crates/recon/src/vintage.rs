//! KOI vintage resolution: the year a KOI identifier first shows up in a
//! historical KOI catalog release.
//!
//! The two earliest releases predate the archive and are plain identifier
//! lists (`752.01`); archived releases use the zero-padded form (`K00752.01`).
//! Both are normalized to the display form `KOI-752.01` on the way in.

use std::collections::HashSet;

use crate::error::ReconError;

/// Normalize any KOI identifier spelling to `KOI-<number>`.
pub fn normalize_koi_name(raw: &str) -> String {
    let s = raw.trim();
    if s.starts_with("KOI-") {
        return s.to_string();
    }
    let digits = match s.strip_prefix('K') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        Some(_) => return s.to_string(),
        None if s.starts_with(|c: char| c.is_ascii_digit()) => s,
        None => return s.to_string(),
    };
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() || trimmed.starts_with('.') {
        format!("KOI-0{trimmed}")
    } else {
        format!("KOI-{trimmed}")
    }
}

/// One historical KOI release.
#[derive(Debug, Clone)]
pub struct KoiRelease {
    pub label: String,
    pub year: i32,
    members: HashSet<String>,
}

impl KoiRelease {
    pub fn new<I, S>(label: impl Into<String>, year: i32, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            label: label.into(),
            year,
            members: ids.into_iter().map(|id| normalize_koi_name(id.as_ref())).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Releases ordered oldest first.
#[derive(Debug, Clone)]
pub struct KoiReleaseHistory {
    releases: Vec<KoiRelease>,
}

impl KoiReleaseHistory {
    /// Releases must be given oldest first; equal years are fine (two 2015
    /// releases exist), going backwards is not.
    pub fn new(releases: Vec<KoiRelease>) -> Result<Self, ReconError> {
        if releases.is_empty() {
            return Err(ReconError::ConfigValidation(
                "KOI release history is empty".into(),
            ));
        }
        for pair in releases.windows(2) {
            if pair[1].year < pair[0].year {
                return Err(ReconError::ConfigValidation(format!(
                    "KOI release '{}' ({}) is listed after '{}' ({})",
                    pair[1].label, pair[1].year, pair[0].label, pair[0].year
                )));
            }
        }
        Ok(Self { releases })
    }

    pub fn releases(&self) -> &[KoiRelease] {
        &self.releases
    }

    pub fn earliest_year(&self) -> i32 {
        self.releases[0].year
    }

    pub fn latest_year(&self) -> i32 {
        self.releases[self.releases.len() - 1].year
    }

    /// Year of the first release listing `id`.
    pub fn resolve(&self, id: &str) -> Result<i32, ReconError> {
        let id = normalize_koi_name(id);
        self.releases
            .iter()
            .find(|r| r.contains(&id))
            .map(|r| r.year)
            .ok_or(ReconError::VintageNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconErrorKind;

    fn history() -> KoiReleaseHistory {
        KoiReleaseHistory::new(vec![
            KoiRelease::new("borucki-2011a", 2011, ["1.01", "2.01"]),
            KoiRelease::new("borucki-2011b", 2011, ["2.01", "3.01"]),
            KoiRelease::new("q1-q8", 2013, ["K00001.01", "K00004.01"]),
            KoiRelease::new("q1-q12", 2014, ["K00004.01", "K00005.01"]),
            KoiRelease::new("q1-q16", 2015, ["K00005.01", "K00142.01"]),
            KoiRelease::new("q1-q17-dr24", 2015, ["K00142.01", "K00200.01"]),
            KoiRelease::new("q1-q17-dr25-sup", 2016, ["K00200.01", "K00300.01"]),
            KoiRelease::new("q1-q17-dr25", 2018, ["K00300.01", "K07016.01"]),
        ])
        .unwrap()
    }

    #[test]
    fn normalize_forms() {
        assert_eq!(normalize_koi_name("K00752.01"), "KOI-752.01");
        assert_eq!(normalize_koi_name("K07016.01"), "KOI-7016.01");
        assert_eq!(normalize_koi_name("K01000.02"), "KOI-1000.02");
        assert_eq!(normalize_koi_name("752.01"), "KOI-752.01");
        assert_eq!(normalize_koi_name("0752.01"), "KOI-752.01");
        assert_eq!(normalize_koi_name("KOI-752.01"), "KOI-752.01");
        assert_eq!(normalize_koi_name("  K00001.01 "), "KOI-1.01");
        assert_eq!(normalize_koi_name("Kepler-9 b"), "Kepler-9 b");
    }

    #[test]
    fn pre_archive_release_wins() {
        let h = history();
        assert_eq!(h.resolve("KOI-1.01").unwrap(), 2011);
        assert_eq!(h.resolve("KOI-3.01").unwrap(), 2011);
    }

    #[test]
    fn first_of_two_same_year_releases() {
        let h = history();
        // KOI-142.01 is in both 2015 releases and not earlier
        assert_eq!(h.resolve("KOI-142.01").unwrap(), 2015);
        assert_eq!(h.resolve("KOI-200.01").unwrap(), 2015);
    }

    #[test]
    fn later_releases() {
        let h = history();
        assert_eq!(h.resolve("KOI-4.01").unwrap(), 2013);
        assert_eq!(h.resolve("KOI-300.01").unwrap(), 2016);
        assert_eq!(h.resolve("K07016.01").unwrap(), 2018);
    }

    #[test]
    fn unknown_koi_is_an_error() {
        let err = history().resolve("KOI-9999.01").unwrap_err();
        assert_eq!(err.kind(), ReconErrorKind::VintageNotFound);
        assert!(err.to_string().contains("KOI-9999.01"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let h = history();
        for id in ["KOI-1.01", "KOI-142.01", "KOI-300.01"] {
            assert_eq!(h.resolve(id).unwrap(), h.resolve(id).unwrap());
        }
    }

    #[test]
    fn bounds() {
        let h = history();
        assert_eq!(h.earliest_year(), 2011);
        assert_eq!(h.latest_year(), 2018);
        assert_eq!(h.releases().len(), 8);
        assert_eq!(h.releases()[2].len(), 2);
    }

    #[test]
    fn rejects_out_of_order_releases() {
        let err = KoiReleaseHistory::new(vec![
            KoiRelease::new("new", 2016, ["1.01"]),
            KoiRelease::new("old", 2013, ["1.01"]),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ReconErrorKind::ConfigValidation);
    }

    #[test]
    fn rejects_empty_history() {
        assert!(KoiReleaseHistory::new(Vec::new()).is_err());
    }
}
