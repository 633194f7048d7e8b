use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of bytes for artifact content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content type every artifact is served with
pub const ARTIFACT_CONTENT_TYPE: &str = "application/java-archive";

/// Artifacts are immutable per key from the client's point of view, cache them for a year
pub const ARTIFACT_CACHE_CONTROL: &str = "public, max-age=31536000";

const KEY_SEPARATOR: char = '/';

/// Identifies one build artifact: (project, pull request, build)
///
/// The parts are opaque caller-supplied strings. No charset or length rules are applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub project: String,
    pub pull_request: String,
    pub build: String,
}

impl ArtifactKey {
    pub fn new<P, R, B>(project: P, pull_request: R, build: B) -> Self
    where
        P: Into<String>,
        R: Into<String>,
        B: Into<String>,
    {
        Self {
            project: project.into(),
            pull_request: pull_request.into(),
            build: build.into(),
        }
    }

    /// Storage path shared by the durable store and the cache tier
    pub fn path(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.project,
            self.pull_request,
            self.build,
            sep = KEY_SEPARATOR
        )
    }

    /// Parse a storage path back into its key, `None` unless it has three parts
    pub fn from_path(path: &str) -> Option<Self> {
        let mut parts = path.splitn(3, KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(project), Some(pull_request), Some(build)) => Some(Self::new(project, pull_request, build)),
            _ => None,
        }
    }

    /// Download filename offered to clients
    pub fn filename(&self) -> String {
        format!("{}-{}.jar", self.project, self.build)
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename())
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Content metadata recorded next to the artifact bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub content_type: String,
    pub content_disposition: String,
    pub cache_control: String,
    /// Lowercase hex SHA-256 of the stored bytes
    pub checksum: String,
    pub size_bytes: u64,
    pub uploaded_at: i64,
}

impl ArtifactMetadata {
    /// Metadata for a freshly verified upload
    pub fn for_artifact<S: Into<String>>(key: &ArtifactKey, checksum: S, size_bytes: u64) -> Self {
        Self {
            content_type: ARTIFACT_CONTENT_TYPE.to_string(),
            content_disposition: key.content_disposition(),
            cache_control: ARTIFACT_CACHE_CONTROL.to_string(),
            checksum: checksum.into(),
            size_bytes,
            uploaded_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Which tier served a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cache,
    Storage,
}

/// An artifact opened for reading
pub struct OpenedArtifact {
    pub metadata: ArtifactMetadata,
    pub stream: ByteStream,
    pub tier: Tier,
}

impl std::fmt::Debug for OpenedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedArtifact")
            .field("metadata", &self.metadata)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

/// Receipt returned once an upload is durably stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub path: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}
