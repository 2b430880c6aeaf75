use std::path::PathBuf;

use chrono::NaiveDate;
use exoplots_recon::engine::ReconOptions;
use exoplots_recon::model::{CatalogKind, LinkVia, Reconciled};
use exoplots_recon::per_year::{per_year_report, MethodGroup};
use exoplots_recon::{
    load_catalog_dir, reconcile, CatalogConfig, ExceptionConfig, LoadedCatalog, ReconErrorKind,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> CatalogConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("catalog.toml")).unwrap();
    CatalogConfig::from_toml(&toml).unwrap()
}

fn load() -> (CatalogConfig, LoadedCatalog) {
    let config = fixture_config();
    let loaded = load_catalog_dir(&config, &fixtures_dir()).unwrap();
    (config, loaded)
}

fn load_and_reconcile() -> Reconciled {
    let (config, loaded) = load();
    reconcile(
        &loaded.catalogs,
        &loaded.history,
        &loaded.exceptions,
        &config.recon_options(),
    )
    .unwrap()
}

fn planet_year(out: &Reconciled, name: &str) -> i32 {
    out.catalogs
        .confirmed
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no planet {name}"))
        .year_disc
}

// -------------------------------------------------------------------------
// Loading
// -------------------------------------------------------------------------

#[test]
fn fixture_tables_load() {
    let (_, loaded) = load();
    assert_eq!(loaded.catalogs.confirmed.len(), 6);
    assert_eq!(loaded.catalogs.koi.len(), 4);
    assert_eq!(loaded.catalogs.k2.len(), 5);
    assert_eq!(loaded.catalogs.toi.len(), 3);
    assert_eq!(loaded.history.releases().len(), 4);
    assert_eq!(loaded.exceptions.entry_count(), 26);

    assert_eq!(loaded.catalogs.koi[1].id, "KOI-142.01");
    assert_eq!(loaded.catalogs.toi[0].id, "TOI-700.03");
    let tess = &loaded.catalogs.confirmed[5];
    assert_eq!(tess.facility, "TESS");
}

#[test]
fn missing_table_file_is_io_error() {
    let mut config = fixture_config();
    config.tables.toi.file = "no-such-table.csv".into();
    let err = load_catalog_dir(&config, &fixtures_dir()).unwrap_err();
    assert_eq!(err.kind(), ReconErrorKind::Io);
    assert!(err.to_string().contains("no-such-table.csv"));
}

// -------------------------------------------------------------------------
// Reconciliation
// -------------------------------------------------------------------------

#[test]
fn end_to_end_years() {
    let out = load_and_reconcile();

    // KOI-377.01 first appeared in 2011; Kepler-9 b was published in 2010
    assert_eq!(planet_year(&out, "Kepler-9 b"), 2010);
    assert_eq!(out.catalogs.koi[0].koi_year, Some(2011));
    assert_eq!(out.catalogs.koi[0].year_disc, Some(2010));

    // KOI-142.01 only links through its exception entry, and pulls the planet back to 2011
    assert_eq!(planet_year(&out, "KOI-142 b"), 2011);
    assert_eq!(out.catalogs.koi[1].year_disc, Some(2011));

    // K2 revisions from 2017 and 2019 both take the planet's 2016
    assert_eq!(planet_year(&out, "K2-3 b"), 2016);
    assert_eq!(out.catalogs.k2[0].year_disc, Some(2016));
    assert_eq!(out.catalogs.k2[1].year_disc, Some(2016));

    // TOI alert predates the confirmation
    assert_eq!(planet_year(&out, "TOI-700 d"), 2019);

    // Untouched rows
    assert_eq!(planet_year(&out, "51 Peg b"), 1995);
    assert_eq!(planet_year(&out, "HAT-P-54 b"), 2015);
    assert_eq!(out.catalogs.k2[2].year_disc, Some(2016));
    assert_eq!(out.catalogs.koi[2].year_disc, Some(2014));
    assert_eq!(out.catalogs.koi[3].year_disc, Some(2013));
    assert_eq!(out.catalogs.toi[1].year_disc, Some(2019));

    assert_eq!(out.report.planets_lowered, 2);
}

#[test]
fn end_to_end_report() {
    let out = load_and_reconcile();
    assert_eq!(out.links.len(), 5);

    let koi = out.report.summary(CatalogKind::Koi);
    assert_eq!(koi.total, 4);
    assert_eq!(koi.linked, 2);
    assert_eq!(koi.linked_by_override, 1);
    assert_eq!(koi.false_positives, 1);
    assert_eq!(koi.stale_exceptions.len(), 11);
    assert!(koi.stale_exceptions.contains(&"KOI-377.01".to_string()));

    let k2 = out.report.summary(CatalogKind::K2);
    assert_eq!(k2.linked, 2);
    assert_eq!(k2.unlinked_exceptions, 1);
    assert_eq!(k2.overlaps_accepted, 1);
    assert_eq!(k2.stale_exceptions.len(), 12);

    let toi = out.report.summary(CatalogKind::Toi);
    assert_eq!((toi.confirmed, toi.candidates, toi.false_positives), (1, 1, 1));
    assert!(toi.stale_exceptions.is_empty());

    let overrides: Vec<_> = out.links.iter().filter(|l| l.via == LinkVia::Override).collect();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].candidate_id, "KOI-142.01");
    assert_eq!(overrides[0].planet_name, "KOI-142 b");

    assert_eq!(out.report.meta.year_ceiling, 2030);
    assert_eq!(out.report.meta.koi_releases, 4);
}

#[test]
fn input_is_left_untouched() {
    let (config, loaded) = load();
    let before: Vec<i32> = loaded.catalogs.confirmed.iter().map(|p| p.year_disc).collect();
    reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &config.recon_options())
        .unwrap();
    let after: Vec<i32> = loaded.catalogs.confirmed.iter().map(|p| p.year_disc).collect();
    assert_eq!(before, after);
    assert!(loaded.catalogs.koi.iter().all(|r| r.year_disc.is_none()));
}

// -------------------------------------------------------------------------
// Properties over the fixture run
// -------------------------------------------------------------------------

#[test]
fn linked_pairs_share_one_year() {
    let out = load_and_reconcile();
    for link in &out.links {
        let planet = out.catalogs.confirmed[link.planet_index].year_disc;
        let candidate = match link.catalog {
            CatalogKind::Koi => out.catalogs.koi[link.candidate_index].year_disc,
            CatalogKind::K2 => out.catalogs.k2[link.candidate_index].year_disc,
            CatalogKind::Toi => out.catalogs.toi[link.candidate_index].year_disc,
        };
        assert_eq!(candidate, Some(planet), "{} -> {}", link.candidate_id, link.planet_name);
    }
}

#[test]
fn years_never_rise() {
    let (config, loaded) = load();
    let out = reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &config.recon_options())
        .unwrap();

    for p in &out.catalogs.confirmed {
        assert!(p.year_disc <= p.disc_year, "{}", p.name);
    }
    for (row, orig) in out.catalogs.toi.iter().zip(&loaded.catalogs.toi) {
        assert!(row.year_disc.unwrap() <= orig.year);
    }
    for (row, orig) in out.catalogs.k2.iter().zip(&loaded.catalogs.k2) {
        assert!(row.year_disc.unwrap() <= orig.year);
    }
    for row in &out.catalogs.koi {
        assert!(row.year_disc.unwrap() <= row.koi_year.unwrap());
    }
}

#[test]
fn rerun_on_output_is_stable() {
    let (config, loaded) = load();
    let options = config.recon_options();
    let first = reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &options).unwrap();
    let second = reconcile(&first.catalogs, &loaded.history, &loaded.exceptions, &options).unwrap();

    let years = |r: &Reconciled| {
        let mut v: Vec<Option<i32>> = r.catalogs.confirmed.iter().map(|p| Some(p.year_disc)).collect();
        v.extend(r.catalogs.koi.iter().map(|x| x.year_disc));
        v.extend(r.catalogs.k2.iter().map(|x| x.year_disc));
        v.extend(r.catalogs.toi.iter().map(|x| x.year_disc));
        v
    };
    assert_eq!(years(&first), years(&second));
    assert_eq!(first.links.len(), second.links.len());
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

#[test]
fn without_exceptions_koi_142_is_missing() {
    let (config, loaded) = load();
    let err = reconcile(
        &loaded.catalogs,
        &loaded.history,
        &ExceptionConfig::empty(),
        &config.recon_options(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ReconErrorKind::MissingMatch);
    assert!(err.is_invariant_breach());
    assert!(err.to_string().contains("KOI-142.01"));
}

#[test]
fn tight_ceiling_rejects_recent_alerts() {
    let (_, loaded) = load();
    let options = ReconOptions::default().with_year_ceiling(2018);
    let err = reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &options)
        .unwrap_err();
    assert_eq!(err.kind(), ReconErrorKind::OutOfBoundsYear);
}

#[test]
fn koi_missing_from_history_is_fatal() {
    let mut config = fixture_config();
    config.koi_history.archived.pop();
    let loaded = load_catalog_dir(&config, &fixtures_dir()).unwrap();
    let err = reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &config.recon_options())
        .unwrap_err();
    assert_eq!(err.kind(), ReconErrorKind::VintageNotFound);
    assert!(err.to_string().contains("KOI-700.01"));
}

#[test]
fn exception_file_resolves_against_config_dir() {
    let tmp = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, tmp.path().join(path.file_name().unwrap())).unwrap();
    }
    std::fs::write(
        tmp.path().join("exceptions.toml"),
        r#"
version = 7

[koi.confirmed_mismatch]
"KOI-142.01" = { planet = "KOI-142 b", reason = "TTV period" }

[k2.confirmed_mismatch]
"EPIC 212672300.01" = { reason = "no counterpart in the confirmed table" }

[k2.candidate_overlap]
"EPIC 202126849.01" = { reason = "HAT-P-54 b" }
"#,
    )
    .unwrap();

    let mut config = fixture_config();
    config.exceptions = Some("exceptions.toml".into());
    let loaded = load_catalog_dir(&config, tmp.path()).unwrap();
    assert_eq!(loaded.exceptions.version, 7);

    let out = reconcile(&loaded.catalogs, &loaded.history, &loaded.exceptions, &config.recon_options())
        .unwrap();
    assert_eq!(out.report.meta.exceptions_version, 7);
    for kind in CatalogKind::ALL {
        assert!(out.report.summary(kind).stale_exceptions.is_empty(), "{kind}");
    }
}

#[test]
fn report_json_shape() {
    let out = load_and_reconcile();
    let val = serde_json::to_value(&out.report).unwrap();
    assert_eq!(val["koi"]["linked_by_override"], 1);
    assert_eq!(val["meta"]["exceptions_version"], 4);

    let links = serde_json::to_value(&out.links).unwrap();
    assert_eq!(links[0]["catalog"], "koi");
    assert_eq!(links[1]["via"], "override");
}

// -------------------------------------------------------------------------
// Per-year series
// -------------------------------------------------------------------------

#[test]
fn per_year_from_reconciled_tables() {
    let out = load_and_reconcile();
    let report = per_year_report(&out.catalogs, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());

    assert_eq!(report.confirmed.years.first(), Some(&1995));
    assert_eq!(report.confirmed.years.last(), Some(&2021));
    assert_eq!(report.confirmed.count(MethodGroup::Transit, 2020), 1);
    assert_eq!(report.confirmed.count(MethodGroup::Other, 2013), 1);

    // TOI-700 d moves to 2019 and joins the open TOI alerted that year
    assert_eq!(report.discovered.count(MethodGroup::Transit, 2019), 2);
    assert_eq!(report.discovered.count(MethodGroup::Transit, 2020), 0);
    // K2-3 b only; the accepted HAT-P-54 overlap is counted through its planet
    assert_eq!(report.discovered.count(MethodGroup::Transit, 2016), 1);
    assert_eq!(report.discovered.count(MethodGroup::Other, 2011), 1);
    assert_eq!(report.discovered.cumulative.last(), Some(&9));
    assert_eq!(report.confirmed.cumulative.last(), Some(&6));
}
