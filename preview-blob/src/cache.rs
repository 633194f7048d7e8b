use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::StreamExt;

use crate::store::single_chunk;
use crate::{ArtifactConfig, ArtifactMetadata, ArtifactResult, ByteStream, StoredArtifact};

/// Best-effort fast tier in front of the durable store.
///
/// Entries may vanish at any time. A cache is never the only copy of an artifact.
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    /// Look up a cached artifact
    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>>;

    /// Populate an entry; it only becomes visible once the whole stream was read.
    /// A put that stores nothing still drops the previous entry at `path`.
    async fn put(&self, path: &str, metadata: &ArtifactMetadata, stream: ByteStream) -> ArtifactResult<()>;

    /// Drop the entry at `path`, if any
    async fn invalidate(&self, path: &str) -> ArtifactResult<()>;
}

#[async_trait]
impl<T: ArtifactCache + ?Sized> ArtifactCache for Arc<T> {
    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        (**self).get(path).await
    }

    async fn put(&self, path: &str, metadata: &ArtifactMetadata, stream: ByteStream) -> ArtifactResult<()> {
        (**self).put(path, metadata, stream).await
    }

    async fn invalidate(&self, path: &str) -> ArtifactResult<()> {
        (**self).invalidate(path).await
    }
}

struct CacheEntry {
    metadata: ArtifactMetadata,
    data: Bytes,
    inserted_at: Instant,
}

/// In-process cache with a TTL and an entry bound
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    max_entry_bytes: u64,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize, max_entry_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            max_entry_bytes,
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(
            config.cache_ttl,
            config.cache_max_entries,
            config.cache_max_entry_bytes,
        )
    }

    /// Number of entries, expired ones included until they are evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }

    /// Read a stream into one buffer, `None` once it outgrows `max_entry_bytes`
    async fn read_bounded(&self, mut stream: ByteStream) -> ArtifactResult<Option<Bytes>> {
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut len = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            len += chunk.len() as u64;
            if len > self.max_entry_bytes {
                return Ok(None);
            }
            chunks.push(chunk);
        }

        Ok(Some(match chunks.len() {
            1 => chunks.swap_remove(0),
            _ => Bytes::from(chunks.concat::<u8>()),
        }))
    }

    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        self.entries.retain(|_, entry| !self.is_expired(entry));

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.inserted_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl ArtifactCache for MemoryCache {
    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        if let Some(entry) = self.entries.get(path) {
            if !self.is_expired(&entry) {
                return Ok(Some(StoredArtifact {
                    metadata: entry.metadata.clone(),
                    stream: single_chunk(entry.data.clone()),
                }));
            }
        }

        self.entries.remove_if(path, |_, entry| self.is_expired(entry));
        Ok(None)
    }

    async fn put(&self, path: &str, metadata: &ArtifactMetadata, stream: ByteStream) -> ArtifactResult<()> {
        let data = match self.read_bounded(stream).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(path, limit = self.max_entry_bytes, "artifact too large for cache, skipping");
                self.entries.remove(path);
                return Ok(());
            }
            Err(err) => {
                self.entries.remove(path);
                return Err(err);
            }
        };

        self.entries.remove(path);
        self.make_room();
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                metadata: metadata.clone(),
                data,
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, path: &str) -> ArtifactResult<()> {
        self.entries.remove(path);
        Ok(())
    }
}
