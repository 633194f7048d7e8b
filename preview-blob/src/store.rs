use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use tokio::sync::RwLock;

use crate::{ArtifactMetadata, ArtifactResult, ByteStream};

/// Durable artifact storage - the authoritative tier
///
/// Writes are atomic per path: a reader sees either the previous artifact or the
/// complete new one. Concurrent writers to one path race, the last one wins.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact from a stream, returning once it is durable
    async fn put(
        &self,
        path: &str,
        metadata: &ArtifactMetadata,
        stream: ByteStream,
    ) -> ArtifactResult<PutResult>;

    /// Open an artifact, `None` if nothing is stored at `path`
    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>>;

    /// Backend label for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: ArtifactStore + ?Sized> ArtifactStore for Arc<T> {
    async fn put(
        &self,
        path: &str,
        metadata: &ArtifactMetadata,
        stream: ByteStream,
    ) -> ArtifactResult<PutResult> {
        (**self).put(path, metadata, stream).await
    }

    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        (**self).get(path).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub size_bytes: u64,
    pub etag: Option<String>,
}

/// Artifact read back from durable storage
pub struct StoredArtifact {
    pub metadata: ArtifactMetadata,
    pub stream: ByteStream,
}

/// Read a whole stream into one buffer.
///
/// A stream of a single chunk (a replayed spool, a cache hit) is returned as is.
pub(crate) async fn collect_stream(mut stream: ByteStream) -> ArtifactResult<Bytes> {
    let first = match stream.next().await {
        Some(chunk) => chunk?,
        None => return Ok(Bytes::new()),
    };
    let Some(second) = stream.next().await else {
        return Ok(first);
    };

    let mut buf = BytesMut::from(&first[..]);
    buf.extend_from_slice(&second?);
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

pub(crate) fn single_chunk(data: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok::<_, std::io::Error>(data) }))
}

/// In-process store, for tests and local development
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, (ArtifactMetadata, Bytes)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(
        &self,
        path: &str,
        metadata: &ArtifactMetadata,
        stream: ByteStream,
    ) -> ArtifactResult<PutResult> {
        let data = collect_stream(stream).await?;
        let size_bytes = data.len() as u64;

        self.objects
            .write()
            .await
            .insert(path.to_string(), (metadata.clone(), data));

        Ok(PutResult {
            size_bytes,
            etag: None,
        })
    }

    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        let objects = self.objects.read().await;
        Ok(objects.get(path).map(|(metadata, data)| StoredArtifact {
            metadata: metadata.clone(),
            stream: single_chunk(data.clone()),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_single_chunk_is_not_copied() {
        let data = Bytes::from(vec![7u8; 4096]);
        let collected = collect_stream(single_chunk(data.clone())).await.unwrap();

        assert_eq!(collected.as_ptr(), data.as_ptr());
    }

    #[tokio::test]
    async fn test_collect_joins_chunks() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"Tes")),
            Ok(Bytes::from_static(b"ting")),
            Ok(Bytes::from_static(b"123")),
        ];

        let collected = collect_stream(Box::pin(stream::iter(items))).await.unwrap();
        assert_eq!(collected, Bytes::from_static(b"Testing123"));

        let empty = collect_stream(Box::pin(stream::empty::<Result<Bytes, std::io::Error>>())).await.unwrap();
        assert!(empty.is_empty());
    }
}
