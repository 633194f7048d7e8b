use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use preview_blob::ArtifactError;
use serde_json::json;

/// Failures raised by the HTTP layer itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    Unauthorized,
    RouteNotFound,
    InvalidPath,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::Unauthorized => f.write_str("invalid publish token"),
            HttpError::RouteNotFound => f.write_str("no route for request"),
            HttpError::InvalidPath => f.write_str("artifact path could not be decoded"),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    fn reply(self) -> (StatusCode, &'static str) {
        match self {
            HttpError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid authentication!"),
            HttpError::RouteNotFound => (StatusCode::NOT_FOUND, "Route not found!"),
            HttpError::InvalidPath => (StatusCode::BAD_REQUEST, "Invalid artifact key!"),
        }
    }
}

/// Status and client message for expected artifact outcomes, `None` for faults
fn artifact_reply(err: &ArtifactError) -> Option<(StatusCode, &'static str)> {
    let reply = match err {
        ArtifactError::NotFound { .. } => (StatusCode::NOT_FOUND, "Build not found!"),
        ArtifactError::MissingBody => (StatusCode::BAD_REQUEST, "No body provided!"),
        ArtifactError::MissingChecksum => (StatusCode::BAD_REQUEST, "Missing \"x-checksum\" header!"),
        ArtifactError::ChecksumMismatch { .. } => (StatusCode::BAD_REQUEST, "Checksum mismatch!"),
        ArtifactError::InvalidKey { .. } => (StatusCode::BAD_REQUEST, "Invalid artifact key!"),
        ArtifactError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "Artifact too large!"),
        _ => return None,
    };
    Some(reply)
}

#[derive(Debug)]
pub struct PreviewAxumError(pub anyhow::Error);

impl From<anyhow::Error> for PreviewAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ArtifactError> for PreviewAxumError {
    fn from(e: ArtifactError) -> Self {
        Self(anyhow::Error::new(e))
    }
}

impl From<HttpError> for PreviewAxumError {
    fn from(e: HttpError) -> Self {
        Self(anyhow::Error::new(e))
    }
}

impl IntoResponse for PreviewAxumError {
    fn into_response(self) -> Response {
        // Expected outcomes keep their status even when wrapped in anyhow contexts
        let expected = self.0.chain().find_map(|e| {
            if let Some(http) = e.downcast_ref::<HttpError>() {
                return Some(http.reply());
            }
            e.downcast_ref::<ArtifactError>().and_then(artifact_reply)
        });

        if let Some((status, message)) = expected {
            return (status, Json(json!({ "error": message }))).into_response();
        }

        // Everything else is a fault: log it in full, tell the client nothing
        tracing::error!(error = ?self.0, "Unknown error occurred");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Unknown error occurred" })),
        )
            .into_response()
    }
}
