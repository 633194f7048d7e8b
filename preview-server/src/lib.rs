//! Bootstrap for the preview artifact server: turns a [`ServerConfig`] into a
//! ready-to-listen [`PreviewApp`].

pub mod config;

pub use config::{ConfigValues, ServerConfig, StorageBackend, ENV_PREFIX};

use anyhow::{Context, Result};
use preview_axum::{preview, PreviewApp};
use preview_blob::{ArtifactAdapter, FsStore, MemoryCache, MemoryStore, S3CompatibleStore};

pub async fn build(config: &ServerConfig) -> Result<PreviewApp> {
    let artifacts = config.artifacts.clone();

    let adapter = match &config.storage {
        StorageBackend::Memory => ArtifactAdapter::new(MemoryStore::new(), artifacts),
        StorageBackend::Fs { root } => {
            let store = FsStore::new(root.clone())
                .await
                .with_context(|| format!("failed to open storage root {}", root.display()))?;
            ArtifactAdapter::new(store, artifacts)
        }
        StorageBackend::S3(s3) => {
            let store = S3CompatibleStore::new(s3.clone())
                .await
                .with_context(|| format!("failed to configure bucket {}", s3.bucket))?;
            ArtifactAdapter::new(store, artifacts)
        }
    };

    let adapter = if config.cache_enabled {
        adapter.with_cache(MemoryCache::from_config(&config.artifacts))
    } else {
        adapter
    };

    tracing::info!(
        storage = config.storage.label(),
        cache = adapter.has_cache(),
        max_artifact_bytes = config.artifacts.max_artifact_bytes,
        "artifact adapter ready"
    );

    Ok(preview(adapter, config.publish_token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let mut values = ConfigValues::new();
        values.set("publish.token", "tok");
        for (k, v) in pairs {
            values.set(*k, *v);
        }
        ServerConfig::from_values(&values)
    }

    #[tokio::test]
    async fn test_build_memory_with_cache() -> anyhow::Result<()> {
        let app = build(&config_from(&[])?).await?;

        assert!(app.state.adapter.has_cache());
        assert_eq!(&*app.state.publish_token, "tok");
        Ok(())
    }

    #[tokio::test]
    async fn test_build_fs_creates_root() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("artifacts");
        let root_str = root.to_string_lossy().into_owned();

        let app = build(&config_from(&[
            ("storage.backend", "fs"),
            ("storage.root", root_str.as_str()),
            ("cache.enabled", "false"),
        ])?)
        .await?;

        assert!(root.is_dir());
        assert!(!app.state.adapter.has_cache());
        Ok(())
    }
}
