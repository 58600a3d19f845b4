//! Type definitions for the filter pipeline
//!
//! Contains the task and record types that flow between stages, the
//! conduit message wrapper, and the pipeline configuration.

use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error_handling::{ErrorPolicy, TaskError};

/// Filter one input file against a population threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub path: PathBuf,
    pub threshold: u64,
}

/// A row that passed the population predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub subdivision: String,
    pub city: String,
    pub population: u64,
}

/// Message carried by a per-task output conduit
#[derive(Debug)]
pub enum ConduitMessage {
    Record(Record),
    /// Terminal message for a task that failed under `ErrorPolicy::Isolate`
    Failed(TaskError),
}

pub type ConduitSender = Sender<ConduitMessage>;
pub type ConduitReceiver = Receiver<ConduitMessage>;

/// How aggregation workers fold records into the shared aggregate
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Every record is merged under the aggregate lock as it is drained
    #[default]
    Shared,
    /// Each worker builds a private partition, merged once when it exits
    Partitioned,
}

/// Configuration for the filter pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub threshold: u64,
    pub filter_workers: usize,
    pub aggregate_workers: usize,
    pub task_buffer: usize,
    pub conduit_buffer: usize,
    pub relay_buffer: usize,
    /// Zero gives a rendezvous handoff between the relay and the aggregators
    pub aggregate_buffer: usize,
    pub error_policy: ErrorPolicy,
    pub merge_strategy: MergeStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            filter_workers: 3,
            aggregate_workers: 2,
            task_buffer: 10,
            conduit_buffer: 100,
            relay_buffer: 100,
            aggregate_buffer: 0,
            error_policy: ErrorPolicy::Abort,
            merge_strategy: MergeStrategy::Shared,
        }
    }
}

impl PipelineConfig {
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_workers(mut self, filter_workers: usize, aggregate_workers: usize) -> Self {
        self.filter_workers = filter_workers;
        self.aggregate_workers = aggregate_workers;
        self
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    pub fn with_merge_strategy(mut self, merge_strategy: MergeStrategy) -> Self {
        self.merge_strategy = merge_strategy;
        self
    }
}

/// Run-wide abort signal shared by every stage
///
/// Tripped on the first fatal error or on a shutdown request. Stages poll it
/// between units of work; the channels do the rest of the unwinding.
#[derive(Debug, Clone, Default)]
pub(crate) struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
