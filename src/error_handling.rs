use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error categories a run can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Traversal,  // Directory entry inaccessible
    SourceOpen, // File cannot be opened or read
    Parse,      // Wrong field count, non-integer population
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Traversal => "traversal",
            ErrorKind::SourceOpen => "source_open",
            ErrorKind::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Traversal => "traversal error",
            ErrorKind::SourceOpen => "cannot open",
            ErrorKind::Parse => "parse error in",
        };
        f.write_str(label)
    }
}

/// What a run does when a single task fails
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Any failure aborts the whole run and no report is produced
    #[default]
    Abort,
    /// A failing file is dropped from the report and listed in an error summary
    Isolate,
}

/// A failure tied to one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskError {
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub line: Option<u64>,
    pub message: String,
}

impl TaskError {
    pub fn traversal(path: &Path, message: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Traversal,
            path: path.to_path_buf(),
            line: None,
            message: message.to_string(),
        }
    }

    pub fn source_open(path: &Path, message: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::SourceOpen,
            path: path.to_path_buf(),
            line: None,
            message: message.to_string(),
        }
    }

    pub fn parse(path: &Path, line: Option<u64>, message: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: path.to_path_buf(),
            line,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for TaskError {}

/// Maximum number of example messages kept per error kind
const MAX_EXAMPLES: usize = 3;

/// Number of failures listed individually in the stderr summary
const MAX_LISTED: usize = 5;

/// Collects per-task failures from an isolated run and summarizes them
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Vec<TaskError>,
    error_counts: BTreeMap<ErrorKind, usize>,
    error_examples: BTreeMap<ErrorKind, Vec<String>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_error(&mut self, error: TaskError) {
        *self.error_counts.entry(error.kind).or_insert(0) += 1;

        let examples = self.error_examples.entry(error.kind).or_default();
        if examples.len() < MAX_EXAMPLES {
            examples.push(error.to_string());
        }

        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Human-readable lines for stderr, at most `MAX_LISTED` failures spelled out
    pub fn summary_lines(&self) -> Vec<String> {
        if self.errors.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![format!(
            "{} file(s) failed and were left out of the report",
            self.errors.len()
        )];
        for error in self.errors.iter().take(MAX_LISTED) {
            lines.push(format!("  {}", error));
        }
        if self.errors.len() > MAX_LISTED {
            lines.push(format!(
                "  ... and {} more",
                self.errors.len() - MAX_LISTED
            ));
        }
        lines
    }

    /// JSON summary keyed by error kind, `None` when nothing failed
    pub fn generate_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let mut summary = json!({});
        for (kind, count) in &self.error_counts {
            let examples = self.error_examples.get(kind).cloned().unwrap_or_default();
            summary[kind.as_str()] = json!({
                "count": count,
                "examples": examples,
            });
        }
        summary["failures"] = json!(self.errors);

        Some(
            serde_json::to_string_pretty(&summary)
                .unwrap_or_else(|_| "Error serializing summary".to_string()),
        )
    }

    pub fn write_summary_to_file(&self, path: &Path) -> Result<()> {
        if let Some(summary) = self.generate_summary() {
            std::fs::write(path, summary)
                .with_context(|| format!("Failed to write error report: {}", path.display()))?;
        }
        Ok(())
    }
}
