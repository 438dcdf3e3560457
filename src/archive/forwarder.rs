//! Relays producer output to a response sink in bounded chunks.
//!
//! ## Loop
//!
//! 1. Fill a chunk of up to `chunk_size` bytes from the producer
//! 2. Write it to the sink, waiting for the client to take it
//! 3. Optionally pause, then go back to 1 until end-of-stream
//!
//! Client disconnects only show up on the sink, so the read in step 1 and
//! the pause in step 3 both race against [`ChunkSink::closed`]. A client that
//! leaves is noticed even while the producer is silent, and nothing more is
//! read from the producer once a write has failed.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::io::ChunkSink;

/// Pump loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOptions {
    pub chunk_size: usize,
    pub delay: Option<Duration>,
    pub idle_timeout: Option<Duration>,
}

impl From<&ArchiveConfig> for ForwardOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            delay: config.delay,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Counters kept while forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    /// Chunks accepted by the sink.
    pub chunks: u64,
    /// Bytes accepted by the sink.
    pub bytes: u64,
}

/// Forward everything `output` produces into `sink`.
///
/// Returns `Ok(())` once the producer reaches end-of-stream. `stats` is updated
/// as chunks are written, so it is accurate on every exit path.
///
/// # Errors
///
/// - [`ArchiveError::StreamInterrupted`] when the sink closes
/// - [`ArchiveError::ProducerRead`] when reading the producer fails
/// - [`ArchiveError::ProducerStalled`] when the idle timeout elapses
pub async fn forward<R, S>(
    output: &mut R,
    sink: &mut S,
    options: &ForwardOptions,
    stats: &mut ForwardStats,
) -> Result<(), ArchiveError>
where
    R: AsyncRead + Unpin + ?Sized,
    S: ChunkSink + ?Sized,
{
    loop {
        let chunk = tokio::select! {
            chunk = read_chunk(output, options.chunk_size, options.idle_timeout) => chunk,
            _ = sink.closed() => return Err(ArchiveError::StreamInterrupted),
        };
        let chunk = chunk.map_err(|e| match (e.kind(), options.idle_timeout) {
            (io::ErrorKind::TimedOut, Some(idle)) => ArchiveError::ProducerStalled(idle),
            _ => ArchiveError::ProducerRead(e),
        })?;

        if chunk.is_empty() {
            return Ok(());
        }

        tracing::debug!("Sending archive chunk {} ...", stats.chunks + 1);
        let len = chunk.len() as u64;
        sink.send_chunk(chunk)
            .await
            .map_err(|_| ArchiveError::StreamInterrupted)?;
        stats.chunks += 1;
        stats.bytes += len;

        if let Some(delay) = options.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = sink.closed() => return Err(ArchiveError::StreamInterrupted),
            }
        }
    }
}

/// Read until `chunk_size` bytes are buffered or the producer hits
/// end-of-stream. An empty chunk means end-of-stream.
async fn read_chunk<R>(
    output: &mut R,
    chunk_size: usize,
    idle_timeout: Option<Duration>,
) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;

    while filled < chunk_size {
        let read = output.read(&mut buf[filled..]);
        let n = match idle_timeout {
            Some(idle) => tokio::time::timeout(idle, read)
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??,
            None => read.await?,
        };
        if n == 0 {
            break;
        }
        filled += n;
    }

    buf.truncate(filled);
    Ok(Bytes::from(buf))
}
