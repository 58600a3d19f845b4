//! Task dispatcher thread
//!
//! Walks the input tree and feeds one task per file to the filter workers.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};

use crate::error_handling::TaskError;
use crate::platform::Ctrl;
use crate::stats::ProcessingStats;

use super::types::{AbortFlag, Task};

/// Dispatcher thread: the only writer and the only closer of the task queue
///
/// The queue closes when `task_sender` is dropped on return, which is the
/// filter workers' signal that no more work is coming.
pub(crate) fn dispatcher_thread(
    root: PathBuf,
    threshold: u64,
    task_sender: Sender<Task>,
    abort: AbortFlag,
    ctrl_rx: Receiver<Ctrl>,
) -> Result<ProcessingStats> {
    let mut stats = ProcessingStats::new();

    if let Err(e) = std::fs::metadata(&root) {
        abort.trip();
        return Err(TaskError::traversal(&root, e).into());
    }

    for entry in walk_pattern(&root)? {
        if abort.is_tripped() {
            break;
        }

        if let Ok(Ctrl::Shutdown { .. }) = ctrl_rx.try_recv() {
            abort.trip();
            return Err(anyhow!("Processing terminated by signal"));
        }

        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                abort.trip();
                return Err(TaskError::traversal(e.path(), e.error()).into());
            }
        };

        if path.is_dir() {
            continue;
        }

        if task_sender.send(Task { path, threshold }).is_err() {
            // Every filter worker is gone
            break;
        }
        stats.files_discovered += 1;
    }

    Ok(stats)
}

/// Recursive walk over every entry below `root`
fn walk_pattern(root: &Path) -> Result<glob::Paths> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = Path::new(&escaped).join("**").join("*");
    let pattern = pattern.to_string_lossy();

    glob::glob(&pattern).with_context(|| format!("Invalid traversal pattern: {}", pattern))
}
