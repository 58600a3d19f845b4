use std::time::Duration;

/// Statistics collected during a pipeline run
///
/// Each stage thread keeps its own copy and hands it back when it exits;
/// the processor merges them after the completion barrier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub rows_read: usize,
    pub records_matched: usize,
    pub records_merged: usize,
    pub conduits_relayed: usize,
    pub subdivisions: usize,
    pub processing_time: Duration,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another stage's counters into this one
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.files_discovered += other.files_discovered;
        self.files_processed += other.files_processed;
        self.files_failed += other.files_failed;
        self.rows_read += other.rows_read;
        self.records_matched += other.records_matched;
        self.records_merged += other.records_merged;
        self.conduits_relayed += other.conduits_relayed;
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Files processed: {} total, {} ok",
            self.files_discovered, self.files_processed
        );

        if self.files_failed > 0 {
            output.push_str(&format!(", {} failed", self.files_failed));
        }

        output.push_str(&format!(
            "; Rows read: {} total, {} matched; {} subdivisions",
            self.rows_read, self.records_matched, self.subdivisions
        ));

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.rows_read > 0 {
            let rows_per_sec = (self.rows_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} rows/s)", rows_per_sec));
        }

        output
    }
}
