//! Record source: loads one input file into raw rows
//!
//! Every row is data, including any header line. Rows must have exactly
//! three fields: city, subdivision, population.

use std::io::Read;
use std::path::Path;

use crate::decompression;
use crate::error_handling::TaskError;
use crate::pipeline::Record;

pub const FIELDS_PER_ROW: usize = 3;

/// One row as it appears on disk, population not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub city: String,
    pub subdivision: String,
    pub population: String,
}

impl RawRow {
    /// Parse the population field; anything but a signed integer is a parse error
    ///
    /// Negative populations are valid integers. They never reach a threshold.
    pub fn population_value(&self, path: &Path) -> Result<i64, TaskError> {
        self.population.parse::<i64>().map_err(|e| {
            TaskError::parse(
                path,
                Some(self.line),
                format!("invalid population '{}': {}", self.population, e),
            )
        })
    }

    /// The record to emit when `population` meets `threshold`
    pub fn qualify(self, population: i64, threshold: u64) -> Option<Record> {
        match u64::try_from(population) {
            Ok(population) if population >= threshold => Some(self.into_record(population)),
            _ => None,
        }
    }

    fn into_record(self, population: u64) -> Record {
        Record {
            subdivision: self.subdivision,
            city: self.city,
            population,
        }
    }
}

/// Open and fully load a file
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>, TaskError> {
    let path = path.as_ref();
    let reader = decompression::open_input(path).map_err(|e| TaskError::source_open(path, e))?;
    parse_rows(reader, path)
}

/// Parse comma-separated rows from any reader; `path` is only used in errors
pub fn parse_rows<R: Read>(reader: R, path: &Path) -> Result<Vec<RawRow>, TaskError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    // Byte records so that non-UTF-8 names pass through instead of failing the file
    for result in csv_reader.byte_records() {
        let record = result.map_err(|e| {
            if e.is_io_error() {
                TaskError::source_open(path, e)
            } else {
                TaskError::parse(path, e.position().map(|p| p.line()), e)
            }
        })?;

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != FIELDS_PER_ROW {
            return Err(TaskError::parse(
                path,
                Some(line),
                format!(
                    "expected {} fields, found {}",
                    FIELDS_PER_ROW,
                    record.len()
                ),
            ));
        }

        rows.push(RawRow {
            line,
            city: String::from_utf8_lossy(&record[0]).into_owned(),
            subdivision: String::from_utf8_lossy(&record[1]).into_owned(),
            population: String::from_utf8_lossy(&record[2]).into_owned(),
        });
    }

    Ok(rows)
}
