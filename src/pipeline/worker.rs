//! Filter worker thread
//!
//! Loads each task's file, publishes a fresh output conduit and streams the
//! rows that meet the threshold into it.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error_handling::{ErrorPolicy, TaskError};
use crate::source;
use crate::stats::ProcessingStats;

use super::types::{AbortFlag, ConduitMessage, ConduitReceiver, ConduitSender, Task};

/// Per-worker settings shared by every task the worker picks up
#[derive(Debug, Clone)]
pub(crate) struct FilterWorkerConfig {
    pub conduit_buffer: usize,
    pub error_policy: ErrorPolicy,
}

/// Whether the worker should keep taking tasks
#[derive(Debug, PartialEq, Eq)]
enum TaskFlow {
    Continue,
    Stop,
}

/// Filter worker thread: consumes tasks until the task queue is closed
pub(crate) fn filter_worker_thread(
    worker_id: usize,
    task_receiver: Receiver<Task>,
    publish_sender: Sender<ConduitReceiver>,
    config: FilterWorkerConfig,
    abort: AbortFlag,
) -> Result<ProcessingStats> {
    let mut stats = ProcessingStats::new();

    while let Ok(task) = task_receiver.recv() {
        if abort.is_tripped() {
            break;
        }

        match filter_task(&task, &publish_sender, &config, &abort, &mut stats) {
            Ok(TaskFlow::Continue) => {}
            Ok(TaskFlow::Stop) => break,
            Err(error) => {
                abort.trip();
                return Err(error)
                    .with_context(|| format!("filter worker {} aborted the run", worker_id));
            }
        }
    }

    Ok(stats)
}

/// Process one task. `Err` is only returned under `ErrorPolicy::Abort`.
fn filter_task(
    task: &Task,
    publish_sender: &Sender<ConduitReceiver>,
    config: &FilterWorkerConfig,
    abort: &AbortFlag,
    stats: &mut ProcessingStats,
) -> Result<TaskFlow, TaskError> {
    let loaded = match source::load_rows(&task.path) {
        Err(error) if config.error_policy == ErrorPolicy::Abort => return Err(error),
        other => other,
    };

    let (conduit_sender, conduit_receiver) = bounded(config.conduit_buffer);

    // Publish before producing so the conduit can be drained while we fill it
    if publish_sender.send(conduit_receiver).is_err() {
        return Ok(TaskFlow::Stop);
    }

    let rows = match loaded {
        Ok(rows) => rows,
        Err(error) => return Ok(isolate_failure(&conduit_sender, error, stats)),
    };

    for row in rows {
        if abort.is_tripped() {
            return Ok(TaskFlow::Stop);
        }
        stats.rows_read += 1;

        let population = match row.population_value(&task.path) {
            Ok(population) => population,
            Err(error) => match config.error_policy {
                ErrorPolicy::Abort => return Err(error),
                ErrorPolicy::Isolate => {
                    return Ok(isolate_failure(&conduit_sender, error, stats));
                }
            },
        };

        if let Some(record) = row.qualify(population, task.threshold) {
            if conduit_sender.send(ConduitMessage::Record(record)).is_err() {
                // Nobody will ever drain this conduit
                return Ok(TaskFlow::Stop);
            }
            stats.records_matched += 1;
        }
    }

    stats.files_processed += 1;
    Ok(TaskFlow::Continue)
}

/// Report a failed task on its own conduit; the conduit closes when dropped
fn isolate_failure(
    conduit_sender: &ConduitSender,
    error: TaskError,
    stats: &mut ProcessingStats,
) -> TaskFlow {
    stats.files_failed += 1;
    match conduit_sender.send(ConduitMessage::Failed(error)) {
        Ok(()) => TaskFlow::Continue,
        Err(_) => TaskFlow::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorKind;
    use crate::pipeline::types::Record;
    use crossbeam_channel::unbounded;
    use std::fs;
    use std::path::Path;

    fn write_file(dir: &Path, name: &str, content: &str) -> Task {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        Task {
            path,
            threshold: 95000,
        }
    }

    fn drain(conduit: ConduitReceiver) -> Vec<ConduitMessage> {
        conduit.iter().collect()
    }

    fn run_worker(
        tasks: Vec<Task>,
        policy: ErrorPolicy,
    ) -> (Result<ProcessingStats>, Vec<Vec<ConduitMessage>>) {
        let (task_sender, task_receiver) = unbounded();
        for task in tasks {
            task_sender.send(task).unwrap();
        }
        drop(task_sender);

        let (publish_sender, publish_receiver) = unbounded();
        let result = filter_worker_thread(
            0,
            task_receiver,
            publish_sender,
            FilterWorkerConfig {
                conduit_buffer: 100,
                error_policy: policy,
            },
            AbortFlag::default(),
        );
        let conduits = publish_receiver.iter().map(drain).collect();
        (result, conduits)
    }

    #[test]
    fn test_emits_matching_rows_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_file(
            dir.path(),
            "nj.csv",
            "Trenton,NJ,90000\nNewark,NJ,300000\nCamden,NJ,95000\n",
        );

        let (result, conduits) = run_worker(vec![task], ErrorPolicy::Abort);
        let stats = result.unwrap();
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.records_matched, 2);
        assert_eq!(stats.files_processed, 1);

        assert_eq!(conduits.len(), 1);
        let records: Vec<Record> = conduits
            .into_iter()
            .flatten()
            .map(|m| match m {
                ConduitMessage::Record(r) => r,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        let cities: Vec<_> = records.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["Newark", "Camden"]);
    }

    #[test]
    fn test_one_conduit_per_task_even_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.csv", "Trenton,NJ,90000\n");
        let b = write_file(dir.path(), "b.csv", "");

        let (result, conduits) = run_worker(vec![a, b], ErrorPolicy::Abort);
        assert_eq!(result.unwrap().files_processed, 2);
        assert_eq!(conduits.len(), 2);
        assert!(conduits.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_abort_policy_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(dir.path(), "bad.csv", "Newark,NJ,300000\nAlbany,NY,lots\n");
        let good = write_file(dir.path(), "good.csv", "Albany,NY,100000\n");

        let (result, _conduits) = run_worker(vec![bad, good], ErrorPolicy::Abort);
        let err = result.unwrap_err();
        let task_error = err.downcast_ref::<TaskError>().expect("TaskError");
        assert_eq!(task_error.kind, ErrorKind::Parse);
        assert_eq!(task_error.line, Some(2));
    }

    #[test]
    fn test_abort_policy_open_failure_publishes_nothing() {
        let task = Task {
            path: "/no/such/file.csv".into(),
            threshold: 0,
        };
        let (result, conduits) = run_worker(vec![task], ErrorPolicy::Abort);
        assert!(result.is_err());
        assert!(conduits.is_empty());
    }

    #[test]
    fn test_isolate_policy_reports_on_conduit_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(dir.path(), "bad.csv", "Newark,NJ,300000\nAlbany,NY,lots\n");
        let short = write_file(dir.path(), "short.csv", "Albany,NY\n");
        let good = write_file(dir.path(), "good.csv", "Albany,NY,100000\n");

        let (result, conduits) = run_worker(vec![bad, short, good], ErrorPolicy::Isolate);
        let stats = result.unwrap();
        assert_eq!(stats.files_failed, 2);
        assert_eq!(stats.files_processed, 1);
        assert_eq!(conduits.len(), 3);

        // Newark was already emitted before the bad row was reached
        assert!(matches!(conduits[0][0], ConduitMessage::Record(_)));
        assert!(matches!(conduits[0].last(), Some(ConduitMessage::Failed(_))));
        assert!(matches!(&conduits[1][..], [ConduitMessage::Failed(e)] if e.kind == ErrorKind::Parse));
        assert!(matches!(&conduits[2][..], [ConduitMessage::Record(r)] if r.city == "Albany"));
    }

    #[test]
    fn test_negative_population_skipped_under_abort() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_file(dir.path(), "nj.csv", "Ghost,NJ,-5\nNewark,NJ,300000\n");

        let (result, conduits) = run_worker(vec![task], ErrorPolicy::Abort);
        let stats = result.unwrap();
        assert_eq!(stats.rows_read, 2);
        assert_eq!(stats.records_matched, 1);
        assert!(matches!(&conduits[0][..], [ConduitMessage::Record(r)] if r.city == "Newark"));
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        #[test]
        fn prop_emits_exactly_rows_at_or_above_threshold(
            populations in proptest::collection::vec(0u64..10_000, 0..80),
            threshold in 0u64..10_000,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let content: String = populations
                .iter()
                .enumerate()
                .map(|(i, p)| format!("c{},S{},{}\n", i, i % 3, p))
                .collect();
            let mut task = write_file(dir.path(), "rows.csv", &content);
            task.threshold = threshold;

            let (result, conduits) = run_worker(vec![task], ErrorPolicy::Abort);
            proptest::prop_assert_eq!(result.unwrap().rows_read, populations.len());

            let emitted: Vec<u64> = conduits
                .into_iter()
                .flatten()
                .map(|m| match m {
                    ConduitMessage::Record(r) => r.population,
                    ConduitMessage::Failed(e) => panic!("unexpected failure {}", e),
                })
                .collect();
            let expected: Vec<u64> = populations.into_iter().filter(|p| *p >= threshold).collect();
            proptest::prop_assert_eq!(emitted, expected);
        }
    }

    #[test]
    fn test_tripped_abort_stops_worker() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_file(dir.path(), "a.csv", "Newark,NJ,300000\n");
        let (task_sender, task_receiver) = unbounded();
        task_sender.send(task).unwrap();
        drop(task_sender);

        let abort = AbortFlag::default();
        abort.trip();
        let (publish_sender, publish_receiver) = unbounded();
        let stats = filter_worker_thread(
            1,
            task_receiver,
            publish_sender,
            FilterWorkerConfig {
                conduit_buffer: 1,
                error_policy: ErrorPolicy::Abort,
            },
            abort,
        )
        .unwrap();

        assert_eq!(stats.files_processed, 0);
        assert!(publish_receiver.try_recv().is_err());
    }
}
