use axum::extract::rejection::PathRejection;
use preview_blob::ArtifactKey;
use serde::Deserialize;

use crate::error::HttpError;
use crate::PreviewAxumError;

/// Path parameters of `/upload/{project}/{pr}/{build}` and `/download/{project}/{pr}/{build}`
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPath {
    pub project: String,
    pub pr: String,
    pub build: String,
}

impl From<ArtifactPath> for ArtifactKey {
    fn from(path: ArtifactPath) -> Self {
        ArtifactKey::new(path.project, path.pr, path.build)
    }
}

pub(crate) fn map_path_rejection(rejection: PathRejection) -> PreviewAxumError {
    tracing::debug!(error = %rejection, "artifact path rejected");
    HttpError::InvalidPath.into()
}
