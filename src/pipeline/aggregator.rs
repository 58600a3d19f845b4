//! Aggregation worker thread
//!
//! Takes conduits off the aggregate queue, drains each one to exhaustion and
//! merges its records into the shared aggregate.

use anyhow::Result;
use crossbeam_channel::Receiver;

use crate::error_handling::{ErrorPolicy, TaskError};
use crate::stats::ProcessingStats;

use super::tracker::{Aggregate, SharedAggregate};
use super::types::{ConduitMessage, ConduitReceiver, MergeStrategy, Record};

/// What an aggregation worker hands back when it exits
#[derive(Debug, Default)]
pub(crate) struct AggregatorOutput {
    pub stats: ProcessingStats,
    pub failures: Vec<TaskError>,
}

/// Where merged records go: straight to the shared aggregate, or to a
/// private partition that is folded in once at exit
struct MergeTarget {
    shared: SharedAggregate,
    partition: Option<Aggregate>,
    merged: usize,
}

impl MergeTarget {
    fn new(shared: SharedAggregate, strategy: MergeStrategy) -> Self {
        let partition = match strategy {
            MergeStrategy::Shared => None,
            MergeStrategy::Partitioned => Some(Aggregate::new()),
        };
        Self {
            shared,
            partition,
            merged: 0,
        }
    }

    fn merge(&mut self, record: Record) {
        match self.partition.as_mut() {
            Some(partition) => {
                partition.insert(record);
            }
            None => {
                self.shared.merge_record(record);
            }
        }
        self.merged += 1;
    }

    /// Publish any private partition; returns the number of records merged
    fn finish(self) -> usize {
        if let Some(partition) = self.partition {
            self.shared.absorb(partition);
        }
        self.merged
    }
}

/// Aggregation worker thread: ends when the aggregate queue is closed
///
/// Every conduit taken is drained until its producer closes it, even after
/// an abort, so that no filter worker stays blocked on a full conduit.
pub(crate) fn aggregator_thread(
    _worker_id: usize,
    aggregate_receiver: Receiver<ConduitReceiver>,
    aggregate: SharedAggregate,
    policy: ErrorPolicy,
    strategy: MergeStrategy,
) -> Result<AggregatorOutput> {
    let mut target = MergeTarget::new(aggregate, strategy);
    let mut failures = Vec::new();

    while let Ok(conduit) = aggregate_receiver.recv() {
        match policy {
            ErrorPolicy::Abort => {
                for message in conduit.iter() {
                    match message {
                        ConduitMessage::Record(record) => target.merge(record),
                        ConduitMessage::Failed(error) => failures.push(error),
                    }
                }
            }
            ErrorPolicy::Isolate => match drain_staged(&conduit) {
                Ok(records) => records.into_iter().for_each(|r| target.merge(r)),
                Err(error) => failures.push(error),
            },
        }
    }

    let mut stats = ProcessingStats::new();
    stats.records_merged = target.finish();
    Ok(AggregatorOutput { stats, failures })
}

/// Drain a conduit fully, holding its records back until it closes cleanly
///
/// A failed task contributes nothing to the aggregate, including the records
/// it produced before the failure.
fn drain_staged(conduit: &ConduitReceiver) -> Result<Vec<Record>, TaskError> {
    let mut staged = Vec::new();
    let mut failure = None;

    for message in conduit.iter() {
        match message {
            ConduitMessage::Record(record) => staged.push(record),
            ConduitMessage::Failed(error) => failure = Some(error),
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(staged),
    }
}
