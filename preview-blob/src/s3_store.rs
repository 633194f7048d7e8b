use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use tokio_util::io::ReaderStream;

use crate::store::collect_stream;
use crate::{
    ArtifactError, ArtifactKey, ArtifactMetadata, ArtifactResult, ArtifactStore, ByteStream, PutResult, StoredArtifact,
    ARTIFACT_CACHE_CONTROL, ARTIFACT_CONTENT_TYPE,
};

const META_SHA256: &str = "sha256";
const META_UPLOADED_AT: &str = "uploaded-at";

/// Connection settings for an S3-compatible bucket (AWS, R2, MinIO, RustFS, ...)
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

/// Durable store backed by an S3-compatible bucket
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> ArtifactResult<Self> {
        if config.bucket.is_empty() {
            return Err(ArtifactError::backend(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "S3 bucket name is empty",
            )));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region));

        // Static keys win over the default provider chain when both are given
        if let (Some(id), Some(secret)) = (config.access_key_id, config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(id, secret, None, None, "preview-blob"));
        }
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(config.force_path_style)
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    /// Wrap an already configured client
    pub fn from_client<S: Into<String>>(client: Client, bucket: S) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> ArtifactError {
        ArtifactError::backend(err)
    }

    /// Metadata of a fetched object. Headers missing on objects written by other
    /// tools fall back to the values an upload would have recorded.
    fn metadata_from_parts(
        path: &str,
        content_type: Option<&str>,
        content_disposition: Option<&str>,
        cache_control: Option<&str>,
        user: Option<&std::collections::HashMap<String, String>>,
        content_length: Option<i64>,
        last_modified: Option<i64>,
    ) -> ArtifactMetadata {
        let checksum = user
            .and_then(|m| m.get(META_SHA256))
            .cloned()
            .unwrap_or_default();
        let uploaded_at = user
            .and_then(|m| m.get(META_UPLOADED_AT))
            .and_then(|v| v.parse().ok())
            .or(last_modified)
            .unwrap_or_default();

        ArtifactMetadata {
            content_type: content_type.unwrap_or(ARTIFACT_CONTENT_TYPE).to_string(),
            content_disposition: content_disposition
                .map(str::to_string)
                .or_else(|| ArtifactKey::from_path(path).map(|key| key.content_disposition()))
                .unwrap_or_else(|| "attachment".to_string()),
            cache_control: cache_control.unwrap_or(ARTIFACT_CACHE_CONTROL).to_string(),
            checksum,
            size_bytes: content_length.unwrap_or(0).max(0) as u64,
            uploaded_at,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3CompatibleStore {
    async fn put(
        &self,
        path: &str,
        metadata: &ArtifactMetadata,
        stream: ByteStream,
    ) -> ArtifactResult<PutResult> {
        // a replayed spool is one chunk, so this hands over the spooled buffer itself
        let data = collect_stream(stream).await?;
        let size_bytes = data.len() as u64;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(AwsByteStream::from(data))
            .content_type(&metadata.content_type)
            .content_disposition(&metadata.content_disposition)
            .cache_control(&metadata.cache_control)
            .metadata(META_SHA256, &metadata.checksum)
            .metadata(META_UPLOADED_AT, metadata.uploaded_at.to_string())
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(PutResult {
            size_bytes,
            etag: result.e_tag,
        })
    }

    async fn get(&self, path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        let result = match self.client.get_object().bucket(&self.bucket).key(path).send().await {
            Ok(output) => output,
            Err(err) => {
                let missing = err.as_service_error().is_some_and(|e| e.is_no_such_key())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    return Ok(None);
                }
                return Err(Self::map_aws_error(err));
            }
        };

        let metadata = Self::metadata_from_parts(
            path,
            result.content_type(),
            result.content_disposition(),
            result.cache_control(),
            result.metadata(),
            result.content_length(),
            result.last_modified().map(|dt| dt.secs()),
        );
        let reader = result.body.into_async_read();

        Ok(Some(StoredArtifact {
            metadata,
            stream: Box::pin(ReaderStream::new(reader)),
        }))
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
