use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use futures::stream;
use tokio::sync::mpsc;

use super::{ChunkSink, SinkClosed};

/// Chunks allowed in flight between the forwarder and the HTTP body.
///
/// One is enough to keep the pipe busy while still applying backpressure to
/// the producer.
const CHANNEL_CAPACITY: usize = 1;

/// Sink that hands chunks to an HTTP response body through a bounded channel.
///
/// When the client disconnects the server drops the body, which drops the
/// receiver and makes every further send fail.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

/// Receiving half of a [`ChannelSink`], turned into a response body.
pub struct ResponseBody {
    rx: mpsc::Receiver<Bytes>,
}

/// Create a connected sink / body pair
pub fn response_channel() -> (ChannelSink, ResponseBody) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (ChannelSink { tx }, ResponseBody { rx })
}

impl ResponseBody {
    /// Receive the next chunk directly, without going through a body
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    pub fn into_body(self) -> Body {
        let chunks = stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        });
        Body::from_stream(chunks)
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(chunk).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}
