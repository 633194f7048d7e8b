use std::sync::Arc;

use futures_util::{stream, StreamExt};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::digest::sha256_hex;
use crate::spool::Spool;
use crate::tee::tee;
use crate::{
    ArtifactCache, ArtifactConfig, ArtifactError, ArtifactKey, ArtifactMetadata, ArtifactResult, ArtifactStore,
    ByteStream, OpenedArtifact, Tier, UploadReceipt,
};

/// The artifact data path: verified uploads into durable storage plus a
/// best-effort cache copy, and cache-first downloads.
///
/// Uploads are verified before anything is written. The body is teed once:
/// one branch feeds the SHA-256, the other is spooled. Only when the digest
/// matches is the spool replayed into the durable store. The old cache entry is
/// then dropped and the cache is refilled on a detached task.
pub struct ArtifactAdapter {
    store: Arc<dyn ArtifactStore>,
    cache: Option<Arc<dyn ArtifactCache>>,
    cache_writes: TaskTracker,
    config: ArtifactConfig,
}

impl ArtifactAdapter {
    /// Create an adapter over a durable store, without a cache tier
    pub fn new<S: ArtifactStore + 'static>(store: S, config: ArtifactConfig) -> Self {
        Self {
            store: Arc::new(store),
            cache: None,
            cache_writes: TaskTracker::new(),
            config,
        }
    }

    /// Put a cache tier in front of the store
    pub fn with_cache<C: ArtifactCache + 'static>(mut self, cache: C) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Verify and store an artifact.
    ///
    /// Returns once the durable write completed. The cache write may still be
    /// running; its outcome never affects the result.
    pub async fn upload(
        &self,
        key: &ArtifactKey,
        body: ByteStream,
        declared_checksum: &str,
    ) -> ArtifactResult<UploadReceipt> {
        let path = key.path();
        let body = require_body(body).await?;

        let (digest_branch, spool_branch) = tee(body, self.config.tee_capacity);
        let (actual, spool) = tokio::try_join!(
            sha256_hex(digest_branch),
            Spool::collect(spool_branch, self.config.max_artifact_bytes),
        )?;

        if actual != declared_checksum {
            tracing::warn!(%path, declared = declared_checksum, %actual, "checksum mismatch, upload rejected");
            return Err(ArtifactError::ChecksumMismatch {
                expected: declared_checksum.to_string(),
                actual,
            });
        }

        let metadata = ArtifactMetadata::for_artifact(key, actual, spool.len());
        let put = self.store.put(&path, &metadata, spool.replay()).await?;

        // storage holds the new bytes now; a stale cache entry must not outlive that
        self.invalidate_cache(&path).await;
        self.spawn_cache_write(&path, &metadata, &spool);

        tracing::info!(%path, size = spool.len(), store = self.store.name(), "artifact stored");

        Ok(UploadReceipt {
            path,
            checksum: metadata.checksum,
            size_bytes: put.size_bytes,
            etag: put.etag,
        })
    }

    /// Open an artifact, cache tier first
    pub async fn download(&self, key: &ArtifactKey) -> ArtifactResult<OpenedArtifact> {
        let path = key.path();

        if let Some(cache) = &self.cache {
            match cache.get(&path).await {
                Ok(Some(hit)) => {
                    tracing::debug!(%path, "cache hit");
                    return Ok(OpenedArtifact {
                        metadata: hit.metadata,
                        stream: hit.stream,
                        tier: Tier::Cache,
                    });
                }
                Ok(None) => tracing::debug!(%path, "cache miss"),
                Err(err) => tracing::debug!(%path, error = %err, "cache lookup failed, treating as miss"),
            }
        }

        match self.store.get(&path).await? {
            Some(stored) => Ok(OpenedArtifact {
                metadata: stored.metadata,
                stream: stored.stream,
                tier: Tier::Storage,
            }),
            None => {
                tracing::debug!(%path, "artifact not found");
                Err(ArtifactError::not_found(path))
            }
        }
    }

    /// Wait for every cache write started so far
    pub async fn flush_cache_writes(&self) {
        self.cache_writes.close();
        self.cache_writes.wait().await;
        self.cache_writes.reopen();
    }

    /// Number of cache writes still running
    pub fn pending_cache_writes(&self) -> usize {
        self.cache_writes.len()
    }

    /// Get configuration
    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// Check if a cache tier is configured
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    async fn invalidate_cache(&self, path: &str) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate(path).await {
                tracing::debug!(%path, error = %err, "cache invalidation failed, ignoring");
            }
        }
    }

    fn spawn_cache_write(&self, path: &str, metadata: &ArtifactMetadata, spool: &Spool) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        let path = path.to_string();
        let metadata = metadata.clone();
        let body = spool.replay();
        let span = tracing::debug_span!("cache_write", %path);

        self.cache_writes.spawn(
            async move {
                if let Err(err) = cache.put(&path, &metadata, body).await {
                    tracing::debug!(error = %err, "cache write failed, ignoring");
                }
            }
            .instrument(span),
        );
    }
}

/// Fail with `MissingBody` when the stream ends before yielding a single byte
async fn require_body(mut body: ByteStream) -> ArtifactResult<ByteStream> {
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if !chunk.is_empty() {
            return Ok(Box::pin(stream::once(async move { Ok::<_, std::io::Error>(chunk) }).chain(body)));
        }
    }
    Err(ArtifactError::MissingBody)
}
