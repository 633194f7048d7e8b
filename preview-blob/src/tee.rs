//! Stream duplication.
//!
//! `tee` reads a source `ByteStream` exactly once and hands every chunk to two
//! independent branches. Chunks are `Bytes`, so each branch gets a refcounted
//! view of the same allocation rather than a copy.
//!
//! The pump only moves on once both live branches accepted a chunk, so the two
//! branches must be consumed concurrently (e.g. with `tokio::try_join!`).
//! A dropped branch is simply skipped from then on.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::ByteStream;

type Chunk = Result<Bytes, std::io::Error>;

/// Split `source` into two branches, each buffering up to `capacity` chunks
pub fn tee(source: ByteStream, capacity: usize) -> (ByteStream, ByteStream) {
    let capacity = capacity.max(1);
    let (left_tx, left_rx) = mpsc::channel(capacity);
    let (right_tx, right_rx) = mpsc::channel(capacity);

    tokio::spawn(pump(source, [Some(left_tx), Some(right_tx)]));

    (branch(left_rx), branch(right_rx))
}

fn branch(mut rx: mpsc::Receiver<Chunk>) -> ByteStream {
    Box::pin(async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield chunk;
        }
    })
}

async fn pump(mut source: ByteStream, mut outputs: [Option<mpsc::Sender<Chunk>>; 2]) {
    while outputs.iter().any(Option::is_some) {
        let Some(item) = source.next().await else {
            return;
        };

        match item {
            Ok(chunk) => {
                for slot in outputs.iter_mut() {
                    forward(slot, Ok(chunk.clone())).await;
                }
            }
            Err(err) => {
                // io::Error is not Clone, rebuild it per branch
                let kind = err.kind();
                let message = err.to_string();
                for slot in outputs.iter_mut() {
                    forward(slot, Err(std::io::Error::new(kind, message.clone()))).await;
                }
                return;
            }
        }
    }
}

async fn forward(slot: &mut Option<mpsc::Sender<Chunk>>, item: Chunk) {
    if let Some(tx) = slot {
        if tx.send(item).await.is_err() {
            *slot = None;
        }
    }
}
