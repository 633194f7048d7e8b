use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{ArtifactError, ArtifactMetadata, ArtifactResult, ArtifactStore, ByteStream, PutResult, StoredArtifact};

/// Filesystem store: one file per artifact under `root/{project}/{pr}/{build}`.
///
/// Each file starts with a single JSON line holding the metadata, followed by
/// the raw artifact bytes. Files are written under a temporary name in the
/// target directory and renamed into place, so readers never observe a partial
/// artifact and metadata always matches the bytes next to it.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn new<P: Into<PathBuf>>(root: P) -> ArtifactResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> ArtifactResult<PathBuf> {
        let mut out = self.root.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['\\', '\0']) {
                return Err(ArtifactError::invalid_key(
                    path,
                    format!("unsafe path segment {segment:?}"),
                ));
            }
            out.push(segment);
        }
        Ok(out)
    }

    async fn write_file(
        tmp: &Path,
        metadata: &ArtifactMetadata,
        mut stream: ByteStream,
    ) -> ArtifactResult<u64> {
        let mut file = BufWriter::new(File::create(tmp).await?);

        let mut header = serde_json::to_vec(metadata)?;
        header.push(b'\n');
        file.write_all(&header).await?;

        let mut size = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.get_ref().sync_all().await?;
        Ok(size)
    }

    async fn open(&self, path: &str) -> ArtifactResult<Option<(ArtifactMetadata, BufReader<File>)>> {
        let target = self.object_path(path)?;
        let file = match File::open(&target).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut reader = BufReader::new(file);
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let metadata: ArtifactMetadata = serde_json::from_str(header.trim_end())?;

        Ok(Some((metadata, reader)))
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn put(
        &self,
        path: &str,
        metadata: &ArtifactMetadata,
        stream: ByteStream,
    ) -> ArtifactResult<PutResult> {
        let target = self.object_path(path)?;
        let dir = target.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir).await?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let size_bytes = match Self::write_file(&tmp, metadata, stream).await {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(err);
            }
        };

        if let Err(err) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        Ok(PutResult {
            size_bytes,
            etag: None,
        })
    }

    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        Ok(self.open(path).await?.map(|(metadata, reader)| StoredArtifact {
            metadata,
            stream: Box::pin(ReaderStream::new(reader)),
        }))
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
