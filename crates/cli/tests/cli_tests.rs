// End-to-end tests for the exoplots binary: exit codes, written tables and
// the --json stdout contract.
//
// Run with: cargo test -p exoplots-cli --test cli_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

fn exoplots() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_exoplots"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn recon_fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn cli_fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn catalog_toml() -> String {
    recon_fixtures().join("catalog.toml").display().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Catalog config in `dir` pointing at the shared fixture tables with an
/// explicit exception table.
fn config_with_exceptions(dir: &std::path::Path, exceptions: &std::path::Path) -> PathBuf {
    let f = recon_fixtures();
    let p = |name: &str| f.join(name).display().to_string();
    let toml = format!(
        r#"
name = "cli-test"
year_ceiling = 2030
exceptions = '{}'

[tables.confirmed]
file = '{}'
[tables.koi]
file = '{}'
[tables.k2]
file = '{}'
[tables.toi]
file = '{}'

[[koi_history.pre_archive]]
file = '{}'
year = 2011
skip_rows = 2

[[koi_history.pre_archive]]
file = '{}'
year = 2011

[[koi_history.archived]]
file = '{}'
year = 2013

[[koi_history.archived]]
file = '{}'
year = 2014
"#,
        exceptions.display(),
        p("confirmed.csv"),
        p("koi.csv"),
        p("k2.csv"),
        p("toi.csv"),
        p("koi-2011a.txt"),
        p("koi-2011b.txt"),
        p("kois-q1-q8.csv"),
        p("kois-q1-q12.csv"),
    );
    let path = dir.join("catalog.toml");
    std::fs::write(&path, toml).unwrap();
    path
}

// ===========================================================================
// reconcile
// ===========================================================================

#[test]
fn reconcile_writes_annotated_tables() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("out");

    let output = exoplots()
        .args(["reconcile", &catalog_toml(), "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .expect("exoplots reconcile");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    for name in ["confirmed.csv", "koi.csv", "k2.csv", "toi.csv", "report.json"] {
        assert!(out_dir.join(name).exists(), "missing {name}");
    }

    let mut rdr = csv::Reader::from_path(out_dir.join("confirmed.csv")).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let name_i = headers.iter().position(|h| h == "pl_name").unwrap();
    let year_i = headers.iter().position(|h| h == "year_disc").unwrap();
    let koi_142 = rdr
        .records()
        .map(|r| r.unwrap())
        .find(|r| &r[name_i] == "KOI-142 b")
        .unwrap();
    assert_eq!(&koi_142[year_i], "2011");

    let k2 = std::fs::read_to_string(out_dir.join("k2.csv")).unwrap();
    assert!(k2.lines().next().unwrap().ends_with("year_disc"));
    assert_eq!(k2.lines().count(), 6);

    let summary = stderr(&output);
    assert!(summary.contains("KOI: 4 rows"), "stderr: {summary}");
    assert!(summary.contains("5 link(s)"), "stderr: {summary}");
}

#[test]
fn reconcile_json_is_single_document() {
    let output = exoplots()
        .args(["reconcile", &catalog_toml(), "--json"])
        .output()
        .expect("exoplots reconcile --json");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim()).expect("stdout must be JSON");
    assert_eq!(val["report"]["koi"]["linked"], 2);
    assert_eq!(val["report"]["k2"]["overlaps_accepted"], 1);
    assert_eq!(val["report"]["planets_lowered"], 2);
    assert_eq!(val["links"].as_array().unwrap().len(), 5);
    assert_eq!(val["links"][1]["via"], "override");
}

#[test]
fn reconcile_breach_exits_5() {
    let tmp = tempfile::tempdir().unwrap();
    // covers KOI-142.01 but not the unmatched K2 row EPIC 212672300.01
    let config = config_with_exceptions(tmp.path(), &cli_fixtures().join("small-exceptions.toml"));

    let output = exoplots()
        .args(["reconcile", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    let err = stderr(&output);
    assert!(err.contains("EPIC 212672300.01"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn reconcile_bad_exceptions_exit_3() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_with_exceptions(tmp.path(), &cli_fixtures().join("bad-exceptions.toml"));

    let output = exoplots()
        .args(["reconcile", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

#[test]
fn reconcile_invalid_config_exit_3() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("catalog.toml");
    std::fs::write(&path, "name = \"\"\n").unwrap();

    let output = exoplots()
        .args(["reconcile", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn reconcile_missing_config_exit_4() {
    let output = exoplots()
        .args(["reconcile", "does/not/exist.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn no_subcommand_is_usage_error() {
    let output = exoplots().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// per-year
// ===========================================================================

#[test]
fn per_year_writes_series() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("per_year.json");

    let output = exoplots()
        .args([
            "per-year",
            &catalog_toml(),
            "--as-of",
            "2021-01-01",
            "--output",
            path.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let val: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(val["as_of"], "2021-01-01");
    assert_eq!(val["confirmed"]["years"][0], 1995);
    assert_eq!(val["confirmed"]["cumulative"].as_array().unwrap().last().unwrap(), 6);
    assert_eq!(val["discovered"]["cumulative"].as_array().unwrap().last().unwrap(), 9);
    assert!(val["discovered_growth"]["rate"].as_f64().unwrap() > 0.0);
}

// ===========================================================================
// exceptions
// ===========================================================================

#[test]
fn exceptions_validate_builtin() {
    let output = exoplots().args(["exceptions", "validate"]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("26 entries"));
}

#[test]
fn exceptions_validate_rejects_archive_ids() {
    let path = cli_fixtures().join("bad-exceptions.toml");
    let output = exoplots()
        .args(["exceptions", "validate", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("K00142.01"));
}

#[test]
fn exceptions_list_tsv() {
    let path = cli_fixtures().join("small-exceptions.toml");
    let output = exoplots()
        .args(["exceptions", "list", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("koi\tconfirmed_mismatch\tKOI-142.01\tKOI-142 b\t"));
    assert!(lines[1].starts_with("k2\tcandidate_overlap\tEPIC 202126849.01\t"));
}

#[test]
fn exceptions_list_json() {
    let output = exoplots()
        .args(["exceptions", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let val: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    let entries = val.as_array().unwrap();
    assert_eq!(entries.len(), 26);
    let koi_142 = entries.iter().find(|e| e["id"] == "KOI-142.01").unwrap();
    assert_eq!(koi_142["catalog"], "koi");
    assert_eq!(koi_142["category"], "confirmed_mismatch");
    assert_eq!(koi_142["planet"], "KOI-142 b");
}
