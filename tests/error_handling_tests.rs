mod common;
use common::*;

fn mixed_dir() -> tempfile::TempDir {
    create_data_dir(&[
        ("good/nj.csv", "Newark,NJ,300000\nTrenton,NJ,90000\n"),
        ("good/ny.csv", "Albany,NY,100000\n"),
        ("bad/population.csv", "Big,XX,999999\nSomewhere,XX,many\n"),
        ("bad/fields.csv", "Lonely,YY\n"),
    ])
}

#[test]
fn test_abort_is_default_and_prints_no_report() {
    let dir = mixed_dir();

    let (stdout, stderr, exit_code) = run_cityfilter(&[&dir_arg(&dir), "1"]);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty(), "no partial report expected: {}", stdout);
    assert!(stderr.contains("cityfilter:"), "stderr: {}", stderr);
    assert!(stderr.contains("parse error in"), "stderr: {}", stderr);
}

#[test]
fn test_non_integer_population_aborts() {
    let dir = create_data_dir(&[("a.csv", "Albany,NY,100000\nBuffalo,NY,2.5e5\n")]);

    let (stdout, stderr, exit_code) = run_cityfilter(&[&dir_arg(&dir), "1"]);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("invalid population '2.5e5'"), "stderr: {}", stderr);
    assert!(stderr.contains("a.csv:2"), "stderr: {}", stderr);
}

#[test]
fn test_header_row_is_data_and_aborts() {
    let dir = create_data_dir(&[("a.csv", "city,state,population\nAlbany,NY,100000\n")]);

    let (_stdout, stderr, exit_code) = run_cityfilter(&[&dir_arg(&dir), "1"]);
    assert_eq!(exit_code, 1);
    assert!(stderr.contains("invalid population 'population'"));
}

#[test]
fn test_isolate_reports_surviving_files() {
    let dir = mixed_dir();

    let (stdout, stderr, exit_code) =
        run_cityfilter(&[&dir_arg(&dir), "95000", "--on-error", "isolate"]);
    assert_eq!(exit_code, 1, "failures still make the run unsuccessful");

    let report = parse_report(&stdout);
    assert_eq!(report.keys().collect::<Vec<_>>(), vec!["NJ", "NY"]);
    assert_eq!(report["NJ"], cities(&[("Newark", 300000)]));

    assert!(
        stderr.contains("2 file(s) failed and were left out of the report"),
        "stderr: {}",
        stderr
    );
    assert!(stderr.contains("population.csv:2"));
    assert!(stderr.contains("expected 3 fields, found 2"));
}

#[test]
fn test_isolate_without_failures_exits_zero() {
    let dir = create_data_dir(&[("a.csv", "Albany,NY,100000\n")]);

    let (stdout, stderr, exit_code) = run_cityfilter(&[&dir_arg(&dir), "1", "--on-error", "isolate"]);
    assert_eq!(exit_code, 0);
    assert_eq!(parse_report(&stdout).len(), 1);
    assert!(stderr.is_empty(), "stderr: {}", stderr);
}

#[test]
fn test_error_report_file() {
    let dir = mixed_dir();
    let report_dir = tempfile::tempdir().unwrap();
    let report_path = report_dir.path().join("errors.json");

    let (_stdout, _stderr, exit_code) = run_cityfilter(&[
        &dir_arg(&dir),
        "1",
        "--on-error",
        "isolate",
        "--error-report",
        report_path.to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 1);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(summary["parse"]["count"], 2);
    assert_eq!(summary["failures"].as_array().unwrap().len(), 2);
    assert_eq!(summary["failures"][0]["kind"], "parse");
}

#[cfg(unix)]
#[test]
fn test_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = create_data_dir(&[("ok.csv", "Albany,NY,100000\n"), ("locked.csv", "X,Y,1\n")]);
    let locked = dir.path().join("locked.csv");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::File::open(&locked).is_ok() {
        // Running as root; permissions are not enforced
        return;
    }

    let (stdout, stderr, exit_code) = run_cityfilter(&[&dir_arg(&dir), "1"]);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("cannot open"), "stderr: {}", stderr);

    let (stdout, _stderr, exit_code) =
        run_cityfilter(&[&dir_arg(&dir), "1", "--on-error", "isolate"]);
    assert_eq!(exit_code, 1);
    assert_eq!(parse_report(&stdout).len(), 1);
}
