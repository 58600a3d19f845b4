//! Text report rendering
//!
//! One line per subdivision, `<name>: <city count>`, followed by one
//! indented line per matched city, `  - <city>: <population>`.

use crate::pipeline::SubdivisionEntry;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFormatter {
    sort: bool,
}

impl ReportFormatter {
    pub fn new(sort: bool) -> Self {
        Self { sort }
    }

    /// Render the report as lines, without trailing newlines
    pub fn format(&self, subdivisions: &[SubdivisionEntry]) -> Vec<String> {
        let mut entries = subdivisions.to_vec();
        if self.sort {
            sort_subdivisions(&mut entries);
        }

        let mut lines = Vec::new();
        for entry in &entries {
            lines.push(format!("{}: {}", entry.name, entry.cities.len()));
            for city in &entry.cities {
                lines.push(format!("  - {}: {}", city.name, city.population));
            }
        }
        lines
    }
}

/// Subdivisions by name; cities by descending population, then by name
pub fn sort_subdivisions(entries: &mut [SubdivisionEntry]) {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    for entry in entries.iter_mut() {
        entry
            .cities
            .sort_by(|a, b| b.population.cmp(&a.population).then_with(|| a.name.cmp(&b.name)));
    }
}
