// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Run the built binary; config files are ignored unless the caller opts in
pub fn run_cityfilter(args: &[&str]) -> (String, String, i32) {
    let mut full_args = vec!["--ignore-config"];
    full_args.extend_from_slice(args);
    run_cityfilter_in(&full_args, None, None)
}

/// Run the built binary with exactly these arguments
///
/// `home` replaces HOME and XDG_CONFIG_HOME so user config lookup is isolated.
pub fn run_cityfilter_in(
    args: &[&str],
    cwd: Option<&Path>,
    home: Option<&Path>,
) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cityfilter"));
    cmd.args(args)
        .env("NO_EMOJI", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if let Some(home) = home {
        cmd.env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join(".config"));
    }

    let output = cmd.output().expect("Failed to execute cityfilter");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Create a temp directory tree from (relative path, content) pairs
pub fn create_data_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (relative, content) in files {
        write_file(dir.path(), relative, content.as_bytes());
    }
    dir
}

pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, content).expect("Failed to write fixture file");
}

pub fn dir_arg(dir: &TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}

/// Parse report output into subdivision -> sorted (city, population)
///
/// Also checks that every header count matches the number of city lines.
pub fn parse_report(stdout: &str) -> BTreeMap<String, Vec<(String, u64)>> {
    let mut report: BTreeMap<String, Vec<(String, u64)>> = BTreeMap::new();
    let mut declared: BTreeMap<String, usize> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in stdout.lines() {
        if let Some(city_line) = line.strip_prefix("  - ") {
            let (city, population) = city_line
                .rsplit_once(": ")
                .expect("city line must be '<city>: <population>'");
            let subdivision = current.clone().expect("city line before any subdivision");
            report
                .entry(subdivision)
                .or_default()
                .push((city.to_string(), population.parse().expect("population")));
        } else {
            let (name, count) = line
                .rsplit_once(": ")
                .expect("subdivision line must be '<name>: <count>'");
            assert!(
                declared.insert(name.to_string(), count.parse().expect("count")).is_none(),
                "subdivision {} reported twice",
                name
            );
            report.entry(name.to_string()).or_default();
            current = Some(name.to_string());
        }
    }

    for (name, count) in &declared {
        assert_eq!(report[name].len(), *count, "count mismatch for {}", name);
    }
    report.values_mut().for_each(|cities| cities.sort());
    report
}

pub fn cities(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
    let mut cities: Vec<_> = pairs.iter().map(|(c, p)| (c.to_string(), *p)).collect();
    cities.sort();
    cities
}
