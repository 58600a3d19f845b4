//! Conduit relay thread
//!
//! Forwards published conduits, in publication order, from the publish queue
//! to the aggregate queue. It never opens a conduit.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};

use crate::stats::ProcessingStats;

use super::types::ConduitReceiver;

/// Relay thread: ends when the publish queue is closed and drained
///
/// Dropping `aggregate_sender` on return closes the aggregate queue.
pub(crate) fn relay_thread(
    publish_receiver: Receiver<ConduitReceiver>,
    aggregate_sender: Sender<ConduitReceiver>,
) -> Result<ProcessingStats> {
    let mut stats = ProcessingStats::new();

    while let Ok(conduit) = publish_receiver.recv() {
        if aggregate_sender.send(conduit).is_err() {
            // All aggregation workers are gone
            break;
        }
        stats.conduits_relayed += 1;
    }

    Ok(stats)
}
