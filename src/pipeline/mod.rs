//! Concurrent filter pipeline
//!
//! Stage layout, each stage connected by a bounded channel:
//!
//! ```text
//! dispatcher -> task queue -> filter workers -(conduits)-> publish queue
//!     -> relay -> aggregate queue -> aggregation workers -> shared aggregate
//! ```
//!
//! Every filter task writes into its own conduit, published before the first
//! record is produced. Aggregation workers drain whole conduits, so records
//! from one file are never interleaved with another file's inside a worker.

mod aggregator;
mod dispatcher;
mod processor;
mod relay;
mod tracker;
mod types;
mod worker;

pub use processor::{PipelineOutcome, PipelineProcessor};
pub use tracker::{Aggregate, CityEntry, SharedAggregate, SubdivisionEntry};
pub use types::{
    ConduitMessage, ConduitReceiver, ConduitSender, MergeStrategy, PipelineConfig, Record, Task,
};
