//! On-the-fly ZIP archives of directories.
//!
//! ## Architecture
//!
//! - [`resolver`]: maps an identifier to a directory under the base directory
//! - [`producer`]: starts and owns the child process that writes the ZIP stream
//! - [`forwarder`]: pumps the child's output to a [`ChunkSink`](crate::io::ChunkSink)
//! - [`job`]: ties the three together for one request and guarantees cleanup
//!
//! Nothing is written to disk and at most one chunk per download is held in
//! memory at a time.

mod forwarder;
mod job;
mod producer;
mod resolver;

pub use forwarder::{ForwardOptions, ForwardStats, forward};
pub use job::{ArchiveJob, JobOutcome, JobReport, JobState};
pub use producer::{ArchiveProducer, CommandProducer, ProducerHandle};
pub use resolver::{ArchiveRequest, ArchiveResolver};
