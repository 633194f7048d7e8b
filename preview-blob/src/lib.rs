//! # preview-blob: artifact storage data path
//!
//! `preview-blob` stores build artifacts keyed by (project, pull request, build)
//! and serves them back. It owns the parts of an artifact service that are not
//! about HTTP:
//!
//! - **Verified uploads**: the caller declares a SHA-256; the body is checked
//!   against it before anything is persisted
//! - **Streaming-first**: bodies travel as `ByteStream`s, read from the client once
//!   and fanned out with [`tee`](crate::tee::tee) and a [`Spool`](crate::spool::Spool)
//! - **Two tiers**: an authoritative [`ArtifactStore`] (memory, filesystem, S3)
//!   and a best-effort [`ArtifactCache`] populated in the background
//! - **Cache-first reads**: downloads try the cache, then the store
//!
//! ## Quick Start
//!
//! ```rust
//! use preview_blob::prelude::*;
//! use preview_blob::digest::sha256_hex_bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> ArtifactResult<()> {
//! let adapter = ArtifactAdapter::new(MemoryStore::new(), ArtifactConfig::default())
//!     .with_cache(MemoryCache::from_config(&ArtifactConfig::default()));
//!
//! let key = ArtifactKey::new("test", "1", "123");
//! let body = futures_util::stream::once(async { Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"Testing123")) });
//! let checksum = sha256_hex_bytes(b"Testing123");
//!
//! adapter.upload(&key, Box::pin(body), &checksum).await?;
//! let opened = adapter.download(&key).await?;
//! assert_eq!(opened.metadata.content_type, "application/java-archive");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────┐
//! │       HTTP / CLI / jobs        │  ← Transport only
//! ├────────────────────────────────┤
//! │        ArtifactAdapter         │  ← Verify, store, cache, look up
//! ├───────────────┬────────────────┤
//! │ ArtifactStore │ ArtifactCache  │  ← Storage primitives
//! └───────────────┴────────────────┘
//! ```

pub mod adapter;
pub mod cache;
mod config;
pub mod digest;
mod error;
mod fs_store;
mod s3_store;
pub mod spool;
pub mod store;
pub mod tee;
mod types;

// Re-export main types for clean API
pub use adapter::ArtifactAdapter;
pub use cache::{ArtifactCache, MemoryCache};
pub use config::ArtifactConfig;
pub use error::{ArtifactError, ArtifactResult};
pub use fs_store::FsStore;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{ArtifactStore, MemoryStore, PutResult, StoredArtifact};
pub use types::{
    ArtifactKey, ArtifactMetadata, ByteStream, OpenedArtifact, Tier, UploadReceipt, ARTIFACT_CACHE_CONTROL,
    ARTIFACT_CONTENT_TYPE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArtifactAdapter, ArtifactCache, ArtifactConfig, ArtifactError, ArtifactKey, ArtifactMetadata,
        ArtifactResult, ArtifactStore, ByteStream, MemoryCache, MemoryStore,
    };
}
