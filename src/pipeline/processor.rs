//! Pipeline processor
//!
//! Wires the dispatcher, filter workers, relay and aggregation workers
//! together, waits for every stage and assembles the outcome.

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error_handling::TaskError;
use crate::platform::Ctrl;
use crate::stats::ProcessingStats;

use super::aggregator::{aggregator_thread, AggregatorOutput};
use super::dispatcher::dispatcher_thread;
use super::relay::relay_thread;
use super::tracker::{SharedAggregate, SubdivisionEntry};
use super::types::{AbortFlag, PipelineConfig};
use super::worker::{filter_worker_thread, FilterWorkerConfig};

/// Result of a completed run
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Subdivisions in first-merged order
    pub subdivisions: Vec<SubdivisionEntry>,
    pub stats: ProcessingStats,
    /// Tasks left out of the aggregate, sorted by path
    pub failures: Vec<TaskError>,
}

/// Main pipeline processor
pub struct PipelineProcessor {
    config: PipelineConfig,
}

impl PipelineProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline over `root`
    ///
    /// Returns only after every stage thread has exited. Under
    /// `ErrorPolicy::Abort` the first failure is returned and no outcome
    /// is produced.
    pub fn run(&self, root: &Path, ctrl_rx: Receiver<Ctrl>) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let config = &self.config;
        let abort = AbortFlag::default();
        let aggregate = SharedAggregate::new();

        let (task_sender, task_receiver) = bounded(config.task_buffer);
        let (publish_sender, publish_receiver) = bounded(config.relay_buffer);
        let (aggregate_sender, aggregate_receiver) = bounded(config.aggregate_buffer);

        // Consumers first, so every queue has a reader before anything is sent
        let mut aggregator_handles = Vec::with_capacity(config.aggregate_workers.max(1));
        for worker_id in 0..config.aggregate_workers.max(1) {
            let receiver = aggregate_receiver.clone();
            let aggregate = aggregate.clone();
            let policy = config.error_policy;
            let strategy = config.merge_strategy;

            let handle = thread::spawn(move || {
                aggregator_thread(worker_id, receiver, aggregate, policy, strategy)
            });
            aggregator_handles.push(handle);
        }
        drop(aggregate_receiver);

        let relay_handle = thread::spawn(move || relay_thread(publish_receiver, aggregate_sender));

        let mut filter_handles = Vec::with_capacity(config.filter_workers.max(1));
        for worker_id in 0..config.filter_workers.max(1) {
            let receiver = task_receiver.clone();
            let publisher = publish_sender.clone();
            let worker_config = FilterWorkerConfig {
                conduit_buffer: config.conduit_buffer,
                error_policy: config.error_policy,
            };
            let worker_abort = abort.clone();

            let handle = thread::spawn(move || {
                filter_worker_thread(worker_id, receiver, publisher, worker_config, worker_abort)
            });
            filter_handles.push(handle);
        }
        // The workers now hold the only ends; closing follows from their exit
        drop(task_receiver);
        drop(publish_sender);

        let dispatcher_handle = {
            let root = root.to_path_buf();
            let threshold = config.threshold;
            let abort = abort.clone();
            thread::spawn(move || dispatcher_thread(root, threshold, task_sender, abort, ctrl_rx))
        };

        // Completion barrier: every stage is joined before anything is reported
        let mut stats = ProcessingStats::new();
        let mut failures = Vec::new();
        let mut first_error = None;

        let mut record = |result: Result<ProcessingStats>| match result {
            Ok(stage_stats) => stats.merge(&stage_stats),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        };

        record(join_stage("Dispatcher", dispatcher_handle));
        for (idx, handle) in filter_handles.into_iter().enumerate() {
            record(join_stage(&format!("Filter worker {}", idx), handle));
        }
        record(join_stage("Relay", relay_handle));
        for (idx, handle) in aggregator_handles.into_iter().enumerate() {
            let output = join_stage(&format!("Aggregation worker {}", idx), handle).map(
                |AggregatorOutput {
                     stats,
                     failures: worker_failures,
                 }| {
                    failures.extend(worker_failures);
                    stats
                },
            );
            record(output);
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        let subdivisions = aggregate.snapshot();
        stats.subdivisions = subdivisions.len();
        stats.processing_time = start.elapsed();
        failures.sort_by(|a: &TaskError, b: &TaskError| a.path.cmp(&b.path));

        Ok(PipelineOutcome {
            subdivisions,
            stats,
            failures,
        })
    }
}

/// Join a stage thread, turning a panic into an error
fn join_stage<T>(name: &str, handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{} thread panicked", name))?
}
