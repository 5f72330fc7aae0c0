// Binary tests for `stmtbook`: exit codes, written files, --json contract.
// Run with: cargo test -p stmtbook-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn stmtbook() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stmtbook"));
    cmd.env_remove("STMTBOOK_ROOT");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures")
        .join(name)
}

fn place(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).unwrap()
}

/// A statement root holding the May 2025 fixtures in the scrape layout.
fn may_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    place(root, "scrapes/holdings/2025/MMW-2025-05-HLD.csv", &read_fixture("2025-05/holdings.csv"));
    place(root, "scrapes/holdings/2025/MMW-2025-04-HLD.csv", &read_fixture("2025-05/prior_holdings.csv"));
    place(root, "scrapes/income/2025/MMW-2025-05-INC.csv", &read_fixture("2025-05/income.csv"));
    place(root, "scrapes/activity/2025/MMW-2025-05-ACT.csv", &read_fixture("2025-05/activity.csv"));
    place(root, "scrapes/summary/2025/MMW-2025-05-SUM.csv", &read_fixture("2025-05/summary.csv"));
    place(root, "books/chart_of_accounts.csv", &read_fixture("chart_of_accounts.csv"));
    dir
}

fn run_may(root: &Path, extra: &[&str]) -> Output {
    stmtbook()
        .args(["run", "--root"])
        .arg(root)
        .args(["--year", "2025", "--month", "5"])
        .args(extra)
        .output()
        .expect("stmtbook run")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn combined(root: &Path) -> String {
    std::fs::read_to_string(root.join("entries/MMW-2025-05-ENT.csv")).unwrap()
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_writes_block_and_combined_files() {
    let dir = may_root();
    let output = run_may(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    for file in [
        "entries/dividends/2025/MMW-2025-05-DIV.csv",
        "entries/purchases/2025/MMW-2025-05-PUR.csv",
        "entries/sales/2025/MMW-2025-05-SAL.csv",
        "entries/unrealized/2025/MMW-2025-05-UNR.csv",
    ] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }

    let csv = combined(dir.path());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 21);
    assert!(lines[0].starts_with("Journal Date,Reference Number,Journal Number Prefix"));
    assert!(lines[1].starts_with("2025-05-15,DIV-2025-05-15,MMW-,10001,"));
    assert!(lines[20].starts_with("2025-05-31,UNR-2025-05-31-10005,MMW-,40003,"));
    assert!(stderr(&output).contains("reconciliation: expected 372.00, actual 372.00, difference 0.00: ok"));
}

#[test]
fn run_no_block_files_writes_only_combined() {
    let dir = may_root();
    let output = run_may(dir.path(), &["--no-block-files"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("entries/MMW-2025-05-ENT.csv").exists());
    assert!(!dir.path().join("entries/dividends").exists());
}

#[test]
fn run_is_idempotent() {
    let dir = may_root();
    assert!(run_may(dir.path(), &[]).status.success());
    let first = combined(dir.path());
    assert!(run_may(dir.path(), &[]).status.success());
    assert_eq!(first, combined(dir.path()));
}

#[test]
fn run_json_is_single_document() {
    let dir = may_root();
    let output = run_may(dir.path(), &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{stdout}"));
    assert_eq!(val["meta"]["period"], "2025-05");
    assert_eq!(val["validation"]["validated"], true);
    assert_eq!(val["blocks"].as_array().unwrap().len(), 4);
    assert!(val["failures"].as_array().unwrap().is_empty());
}

#[test]
fn run_output_file() {
    let dir = may_root();
    let out = dir.path().join("may.json");
    let output = run_may(dir.path(), &["--output", out.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
    let val: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(val["meta"]["engine_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn run_mismatch_exits_63_but_writes() {
    let dir = may_root();
    let summary = read_fixture("2025-05/summary.csv").replace(",372.00,6190.00,5000.00", ",400.00,6190.00,5000.00");
    place(dir.path(), "scrapes/summary/2025/MMW-2025-05-SUM.csv", &summary);

    let output = run_may(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(63), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("reconciliation mismatch: difference 28.00"));
    assert!(dir.path().join("entries/MMW-2025-05-ENT.csv").exists());
}

#[test]
fn run_malformed_income_exits_62() {
    let dir = may_root();
    let income = read_fixture("2025-05/income.csv").replace(",,,12.00", ",,,twelve");
    place(dir.path(), "scrapes/income/2025/MMW-2025-05-INC.csv", &income);

    let output = run_may(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(62), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("income row 1: cannot parse amount 'twelve'"));
    assert!(!dir.path().join("entries/dividends/2025/MMW-2025-05-DIV.csv").exists());
    assert!(dir.path().join("entries/purchases/2025/MMW-2025-05-PUR.csv").exists());
}

#[test]
fn run_malformed_chart_skips_only_trades() {
    let dir = may_root();
    place(dir.path(), "books/chart_of_accounts.csv", "Name,Type\nfoo,bar\n");

    let output = run_may(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(62), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("missing column 'Account Name'"));

    let root = dir.path();
    assert!(root.join("entries/dividends/2025/MMW-2025-05-DIV.csv").exists());
    assert!(root.join("entries/unrealized/2025/MMW-2025-05-UNR.csv").exists());
    assert!(!root.join("entries/purchases/2025/MMW-2025-05-PUR.csv").exists());
    assert!(!root.join("entries/sales/2025/MMW-2025-05-SAL.csv").exists());
    assert!(root.join("entries/MMW-2025-05-ENT.csv").exists());
}

#[test]
fn rerun_removes_entries_of_previous_run() {
    let dir = may_root();
    let root = dir.path();
    assert!(run_may(root, &[]).status.success());
    assert!(root.join("entries/dividends/2025/MMW-2025-05-DIV.csv").exists());

    // Income now malformed: the old dividend file must not survive.
    let income = read_fixture("2025-05/income.csv").replace(",,,12.00", ",,,twelve");
    place(root, "scrapes/income/2025/MMW-2025-05-INC.csv", &income);
    assert_eq!(run_may(root, &[]).status.code(), Some(62));
    assert!(!root.join("entries/dividends/2025/MMW-2025-05-DIV.csv").exists());
    assert!(!combined(root).contains("DIV-2025-05-15"));

    // No scrapes at all: nothing is left for the period.
    std::fs::remove_dir_all(root.join("scrapes")).unwrap();
    let output = run_may(root, &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("0 entries in 0 journals"));
    assert!(!root.join("entries/MMW-2025-05-ENT.csv").exists());
    assert!(!root.join("entries/purchases/2025/MMW-2025-05-PUR.csv").exists());
    assert!(!root.join("entries/unrealized/2025/MMW-2025-05-UNR.csv").exists());
}

#[test]
fn run_without_summary_passes_unless_strict() {
    let dir = may_root();
    std::fs::remove_file(dir.path().join("scrapes/summary/2025/MMW-2025-05-SUM.csv")).unwrap();

    let output = run_may(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("reconciliation: not possible, unavailable: summary"));

    let output = run_may(dir.path(), &["--strict"]);
    assert_eq!(output.status.code(), Some(63));
}

#[test]
fn run_empty_root_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_may(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!dir.path().join("entries").exists());
}

#[test]
fn run_rejects_bad_month() {
    let dir = tempfile::tempdir().unwrap();
    let output = stmtbook()
        .args(["run", "--root"])
        .arg(dir.path())
        .args(["--year", "2025", "--month", "13"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_uses_root_books_toml() {
    let dir = may_root();
    let config = std::fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/config/builtin.books.toml"),
    )
    .unwrap()
    .replace("prefix = \"MMW-\"", "prefix = \"BRK-\"");
    place(dir.path(), "books.toml", &config);

    let output = run_may(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(combined(dir.path()).contains(",BRK-,10001,"));
}

#[test]
fn run_invalid_config_exits_60() {
    let dir = may_root();
    place(dir.path(), "books.toml", "name = \"broken\"\n[accounts]\ncash = \"\"\n");
    let output = run_may(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(60), "stderr: {}", stderr(&output));
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_json() {
    let dir = may_root();
    let output = stmtbook()
        .args(["validate", "--json", "--root"])
        .arg(dir.path())
        .args(["--year", "2025", "--month", "5"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(val["period"], "2025-05");
    assert_eq!(val["validation"]["validated"], true);
    assert_eq!(val["summary"]["internally_consistent"], true);
    assert!(!dir.path().join("entries").exists());
}

#[test]
fn validate_without_holdings_fails() {
    let dir = may_root();
    std::fs::remove_file(dir.path().join("scrapes/holdings/2025/MMW-2025-05-HLD.csv")).unwrap();
    let output = stmtbook()
        .args(["validate", "--root"])
        .arg(dir.path())
        .args(["--year", "2025", "--month", "5"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(63));
    assert!(stderr(&output).contains("unavailable: holdings"));
}

// ===========================================================================
// config
// ===========================================================================

#[test]
fn config_show_round_trips_through_check() {
    let output = stmtbook().args(["config", "show"]).output().unwrap();
    assert!(output.status.success());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.toml");
    std::fs::write(&path, &output.stdout).unwrap();

    let output = stmtbook().args(["config", "check"]).arg(&path).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("4 baskets, 31 symbols"));
}

#[test]
fn config_check_rejects_shared_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.toml");
    std::fs::write(
        &path,
        r#"
name = "dup"

[[baskets]]
id = "1"
name = "One"
fmv_adjustment_account = "FMV 1"
unrealized_gain_account = "UG 1"
income_account = "Inc 1"
symbols = ["AAA"]

[[baskets]]
id = "2"
name = "Two"
fmv_adjustment_account = "FMV 2"
unrealized_gain_account = "UG 2"
income_account = "Inc 2"
symbols = ["AAA"]
"#,
    )
    .unwrap();

    let output = stmtbook().args(["config", "check"]).arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(60));
    assert!(stderr(&output).contains("config validation error"));
}

#[test]
fn config_check_missing_file_is_runtime_error() {
    let output = stmtbook()
        .args(["config", "check", "/nonexistent/books.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(61));
}
