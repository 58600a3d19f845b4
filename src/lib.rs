// Core library for the cityfilter population filter

pub mod cli;
pub mod config;
pub mod config_file;
pub mod decompression;
pub mod error_handling;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod source;
pub mod stats;

pub use cli::Cli;
pub use config::CityFilterConfig;
pub use error_handling::{ErrorKind, ErrorPolicy, ErrorReporter, TaskError};
pub use pipeline::{
    Aggregate, CityEntry, MergeStrategy, PipelineConfig, PipelineOutcome, PipelineProcessor,
    Record, SharedAggregate, SubdivisionEntry,
};
pub use report::ReportFormatter;
pub use stats::ProcessingStats;
