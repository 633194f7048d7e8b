use std::time::Duration;

/// Configuration for the artifact data path
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    /// Max size accepted for a single upload. Uploads are held in memory until
    /// verified, so this bounds memory per in-flight upload.
    pub max_artifact_bytes: u64,

    /// Chunks buffered per branch when an upload body is teed
    pub tee_capacity: usize,

    /// Lifetime of a cache entry
    pub cache_ttl: Duration,

    /// Upper bound on cached artifacts
    pub cache_max_entries: usize,

    /// Artifacts larger than this are not cached
    pub cache_max_entry_bytes: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: 256 * 1024 * 1024, // 256MB
            tee_capacity: 16,
            cache_ttl: Duration::from_secs(3600),
            cache_max_entries: 1024,
            cache_max_entry_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl ArtifactConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max artifact size
    pub fn with_max_artifact_bytes(mut self, bytes: u64) -> Self {
        self.max_artifact_bytes = bytes;
        self
    }

    /// Set per-branch tee buffer, at least one chunk
    pub fn with_tee_capacity(mut self, chunks: usize) -> Self {
        self.tee_capacity = chunks.max(1);
        self
    }

    /// Set cache entry lifetime
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set max cached entries
    pub fn with_cache_max_entries(mut self, entries: usize) -> Self {
        self.cache_max_entries = entries;
        self
    }

    /// Set max size of a single cache entry
    pub fn with_cache_max_entry_bytes(mut self, bytes: u64) -> Self {
        self.cache_max_entry_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_upload_limit_fits_in_memory() {
        let config = ArtifactConfig::default();

        assert_eq!(config.max_artifact_bytes, 256 * 1024 * 1024);
        assert!(config.cache_max_entry_bytes <= config.max_artifact_bytes);
        assert_eq!(ArtifactConfig::new().with_tee_capacity(0).tee_capacity, 1);
    }
}
