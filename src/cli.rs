// Command-line interface definition

use clap::Parser;

use crate::error_handling::ErrorPolicy;
use crate::pipeline::MergeStrategy;

#[derive(Parser, Debug)]
#[command(name = "cityfilter")]
#[command(about = "List the cities of each subdivision whose population meets a threshold")]
#[command(
    long_about = "List the cities of each subdivision whose population meets a threshold\n\nEvery file below DIRECTORY is read as comma-separated rows of\n  city,subdivision,population\nGzip and zstd compressed files are decompressed transparently.\n\nEXAMPLES:\n  cityfilter data/ 100000\n  cityfilter data/ 50000 --sort --stats\n  cityfilter data/ 50000 --on-error isolate --error-report errors.json"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Root directory to search recursively for input files
    pub directory: String,

    /// Minimum population (inclusive) for a city to be reported
    pub threshold: u64,

    /// Number of filter workers (0 = number of CPUs)
    #[arg(long = "filter-workers", default_value_t = 3, help_heading = "Performance Options")]
    pub filter_workers: usize,

    /// Number of aggregation workers (0 = number of CPUs)
    #[arg(long = "aggregate-workers", default_value_t = 2, help_heading = "Performance Options")]
    pub aggregate_workers: usize,

    /// Capacity of the task queue between the dispatcher and the filter workers
    #[arg(long = "task-buffer", default_value_t = 10, help_heading = "Performance Options")]
    pub task_buffer: usize,

    /// Capacity of each per-file result conduit
    #[arg(long = "conduit-buffer", default_value_t = 100, help_heading = "Performance Options")]
    pub conduit_buffer: usize,

    /// Capacity of the queue of published conduits waiting for the relay
    #[arg(long = "relay-buffer", default_value_t = 100, help_heading = "Performance Options")]
    pub relay_buffer: usize,

    /// Capacity of the queue feeding the aggregation workers (0 = direct handoff)
    #[arg(long = "aggregate-buffer", default_value_t = 0, help_heading = "Performance Options")]
    pub aggregate_buffer: usize,

    /// How aggregation workers merge into the shared result
    #[arg(
        long = "merge",
        value_enum,
        default_value = "shared",
        help_heading = "Performance Options"
    )]
    pub merge: MergeStrategy,

    /// What to do when a file cannot be read or parsed
    #[arg(
        long = "on-error",
        value_enum,
        default_value = "abort",
        help_heading = "Error Handling"
    )]
    pub on_error: ErrorPolicy,

    /// Write a JSON summary of failed files (with --on-error isolate)
    #[arg(long = "error-report", help_heading = "Error Handling")]
    pub error_report: Option<String>,

    /// Sort subdivisions by name and cities by descending population
    #[arg(long = "sort", help_heading = "Output Options")]
    pub sort: bool,

    /// Print processing statistics to stderr
    #[arg(short = 's', long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Disable statistics (overrides --stats from a config file)
    #[arg(long = "no-stats", help_heading = "Output Options", overrides_with = "stats")]
    pub no_stats: bool,

    /// Plain "cityfilter:" prefixes instead of emoji in diagnostics
    #[arg(long = "no-emoji", help_heading = "Output Options")]
    pub no_emoji: bool,

    /// Specify custom configuration file path
    #[arg(long = "config-file", help_heading = "Configuration Options")]
    pub config_file: Option<String>,

    /// Ignore configuration file
    #[arg(long = "ignore-config", help_heading = "Configuration Options")]
    pub ignore_config: bool,

    /// Show configuration file and exit
    #[arg(long = "show-config", help_heading = "Configuration Options")]
    pub show_config: bool,
}

impl Cli {
    /// Resolve inverted boolean flags to their actual values
    pub fn resolve_boolean_flags(&mut self) {
        if self.no_stats {
            self.stats = false;
        }
    }
}
