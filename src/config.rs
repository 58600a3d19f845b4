use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error_handling::ErrorPolicy;
use crate::pipeline::{MergeStrategy, PipelineConfig};

/// Main configuration struct for cityfilter
#[derive(Debug, Clone)]
pub struct CityFilterConfig {
    pub input: InputConfig,
    pub processing: ProcessingConfig,
    pub performance: PerformanceConfig,
    pub output: OutputConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub root: PathBuf,
}

/// Processing configuration
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub threshold: u64,
    pub on_error: ErrorPolicy,
}

/// Performance configuration, worker counts already resolved
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub filter_workers: usize,
    pub aggregate_workers: usize,
    pub task_buffer: usize,
    pub conduit_buffer: usize,
    pub relay_buffer: usize,
    pub aggregate_buffer: usize,
    pub merge: MergeStrategy,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sort: bool,
    pub stats: bool,
    pub no_emoji: bool,
    pub error_report: Option<PathBuf>,
}

impl CityFilterConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            input: InputConfig {
                root: PathBuf::from(&cli.directory),
            },
            processing: ProcessingConfig {
                threshold: cli.threshold,
                on_error: cli.on_error,
            },
            performance: PerformanceConfig {
                filter_workers: resolve_workers(cli.filter_workers),
                aggregate_workers: resolve_workers(cli.aggregate_workers),
                task_buffer: cli.task_buffer,
                conduit_buffer: cli.conduit_buffer,
                relay_buffer: cli.relay_buffer,
                aggregate_buffer: cli.aggregate_buffer,
                merge: cli.merge,
            },
            output: OutputConfig {
                sort: cli.sort,
                stats: cli.stats,
                no_emoji: cli.no_emoji || std::env::var("NO_EMOJI").is_ok(),
                error_report: cli.error_report.as_ref().map(PathBuf::from),
            },
        }
    }

    /// Usage-level checks that clap cannot express
    pub fn validate(&self) -> Result<()> {
        let root = &self.input.root;
        if root.as_os_str().is_empty() {
            return Err(anyhow!("Directory argument must not be empty"));
        }
        // A missing root is left to the walk, which reports it as a traversal error
        if root.exists() && !root.is_dir() {
            return Err(anyhow!("Not a directory: {}", root.display()));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let performance = &self.performance;
        PipelineConfig {
            threshold: self.processing.threshold,
            filter_workers: performance.filter_workers,
            aggregate_workers: performance.aggregate_workers,
            task_buffer: performance.task_buffer,
            conduit_buffer: performance.conduit_buffer,
            relay_buffer: performance.relay_buffer,
            aggregate_buffer: performance.aggregate_buffer,
            error_policy: self.processing.on_error,
            merge_strategy: performance.merge,
        }
    }

    pub fn format_error_message(&self, message: &str) -> String {
        format_error_message(message, self.output.no_emoji)
    }

    pub fn format_warning_message(&self, message: &str) -> String {
        format_warning_message(message, self.output.no_emoji)
    }

    pub fn format_info_message(&self, message: &str) -> String {
        format_info_message(message, self.output.no_emoji)
    }
}

fn resolve_workers(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

pub fn format_error_message(message: &str, no_emoji: bool) -> String {
    let prefix = if no_emoji { "cityfilter:" } else { "⚠️ " };
    format!("{} {}", prefix, message)
}

pub fn format_warning_message(message: &str, no_emoji: bool) -> String {
    let prefix = if no_emoji { "cityfilter:" } else { "⚠️ " };
    format!("{} warning: {}", prefix, message)
}

pub fn format_info_message(message: &str, no_emoji: bool) -> String {
    let prefix = if no_emoji { "cityfilter:" } else { "🔹" };
    format!("{} {}", prefix, message)
}

/// Warning formatting for places without a config, honoring NO_EMOJI only
pub fn format_warning_message_auto(message: &str) -> String {
    format_warning_message(message, std::env::var("NO_EMOJI").is_ok())
}
