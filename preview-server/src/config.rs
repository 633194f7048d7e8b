//! # Server configuration
//!
//! Configuration is a flat string key/value store, filled from environment
//! variables and then parsed into a typed [`ServerConfig`] once at startup.
//! Handlers never read the environment themselves.
//!
//! Variables carry the `PREVIEW__` prefix; the rest is lowercased and `__`
//! becomes `.`:
//!
//! ```bash
//! export PREVIEW__PUBLISH__TOKEN=s3cret        # publish.token
//! export PREVIEW__HTTP__PORT=8080              # http.port
//! export PREVIEW__STORAGE__BACKEND=fs          # storage.backend
//! export PREVIEW__STORAGE__ROOT=/var/lib/builds
//! ```
//!
//! | Key | Default |
//! |---|---|
//! | `http.host` | `127.0.0.1` |
//! | `http.port` | `3030` |
//! | `publish.token` | required |
//! | `storage.backend` | `memory` (`memory`, `fs`, `s3`) |
//! | `storage.root` | `./data` |
//! | `s3.bucket` | required for `s3` |
//! | `s3.region` | `us-east-1` |
//! | `s3.endpoint`, `s3.access_key_id`, `s3.secret_access_key` | unset |
//! | `s3.force_path_style` | `false` |
//! | `cache.enabled` | `true` |
//! | `cache.ttl_secs`, `cache.max_entries`, `cache.max_entry_bytes` | see `ArtifactConfig` |
//! | `upload.max_bytes` | see `ArtifactConfig` |

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use preview_blob::{ArtifactConfig, S3Config};

pub const ENV_PREFIX: &str = "PREVIEW__";

#[derive(Debug, Clone, Default)]
pub struct ConfigValues {
    values: HashMap<String, String>,
}

impl ConfigValues {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `PREVIEW__*` variable of the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars(), ENV_PREFIX)
    }

    /// Load prefixed variables from any `(name, value)` source.
    pub fn from_vars<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                // PREVIEW__HTTP__PORT → http.port
                let normalized = stripped.to_lowercase().replace("__", ".");
                config.set(normalized, value);
            }
        }
        config
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key, treating blank values as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_parsed<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| anyhow!("invalid value {raw:?} for {key}: {e}"))
            })
            .transpose()
    }
}

/// Where durable artifacts live
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Memory,
    Fs { root: PathBuf },
    S3(S3Config),
}

impl StorageBackend {
    pub fn label(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Fs { .. } => "fs",
            StorageBackend::S3(_) => "s3",
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub publish_token: String,
    pub storage: StorageBackend,
    pub cache_enabled: bool,
    pub artifacts: ArtifactConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("publish_token", &"<redacted>")
            .field("storage", &self.storage.label())
            .field("cache_enabled", &self.cache_enabled)
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_values(&ConfigValues::from_env())
    }

    pub fn from_values(values: &ConfigValues) -> anyhow::Result<Self> {
        let publish_token = values
            .get("publish.token")
            .context("publish.token is required (set PREVIEW__PUBLISH__TOKEN)")?
            .to_string();

        let storage = match values.get("storage.backend").unwrap_or("memory") {
            "memory" => StorageBackend::Memory,
            "fs" => StorageBackend::Fs {
                root: PathBuf::from(values.get("storage.root").unwrap_or("./data")),
            },
            "s3" => StorageBackend::S3(Self::s3_config(values)?),
            other => bail!("unknown storage.backend {other:?} (expected memory, fs or s3)"),
        };

        let defaults = ArtifactConfig::default();
        let mut artifacts = ArtifactConfig::new()
            .with_max_artifact_bytes(
                values
                    .get_parsed("upload.max_bytes")?
                    .unwrap_or(defaults.max_artifact_bytes),
            )
            .with_cache_max_entries(
                values
                    .get_parsed("cache.max_entries")?
                    .unwrap_or(defaults.cache_max_entries),
            )
            .with_cache_max_entry_bytes(
                values
                    .get_parsed("cache.max_entry_bytes")?
                    .unwrap_or(defaults.cache_max_entry_bytes),
            );
        if let Some(secs) = values.get_parsed::<u64>("cache.ttl_secs")? {
            artifacts = artifacts.with_cache_ttl(Duration::from_secs(secs));
        }

        Ok(Self {
            host: values.get("http.host").unwrap_or("127.0.0.1").to_string(),
            port: values.get_parsed("http.port")?.unwrap_or(3030),
            publish_token,
            storage,
            cache_enabled: values.get_parsed("cache.enabled")?.unwrap_or(true),
            artifacts,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn s3_config(values: &ConfigValues) -> anyhow::Result<S3Config> {
        let bucket = values
            .get("s3.bucket")
            .context("s3.bucket is required when storage.backend is s3")?;

        let mut s3 = S3Config::new(bucket);
        if let Some(region) = values.get("s3.region") {
            s3.region = region.to_string();
        }
        s3.endpoint_url = values.get("s3.endpoint").map(str::to_string);
        s3.access_key_id = values.get("s3.access_key_id").map(str::to_string);
        s3.secret_access_key = values.get("s3.secret_access_key").map(str::to_string);
        s3.force_path_style = values.get_parsed("s3.force_path_style")?.unwrap_or(false);
        Ok(s3)
    }
}
