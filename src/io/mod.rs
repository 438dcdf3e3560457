mod channel;

pub use channel::{ChannelSink, ResponseBody, response_channel};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// The downstream side went away; nothing more can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("response sink is closed")]
pub struct SinkClosed;

/// Destination for forwarded archive chunks
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Write one chunk, waiting for the downstream to accept it
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    /// Resolve once the downstream is gone
    async fn closed(&self);
}
