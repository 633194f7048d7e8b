use axum::{
    body::{Body, HttpBody},
    extract::{rejection::PathRejection, Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use futures::TryStreamExt;
use preview_blob::{ArtifactError, ArtifactKey, ArtifactMetadata};
use serde_json::{json, Value};

use crate::error::HttpError;
use crate::middlewares::require_publish_token;
use crate::params::{map_path_rejection, ArtifactPath};
use crate::{PreviewAxumError, PreviewState};

/// Header carrying the uploader's hex SHA-256 of the body
pub const CHECKSUM_HEADER: &str = "x-checksum";

/// Router for the artifact routes; every other method/path is a route-not-found
pub fn artifact_router(state: PreviewState) -> Router<()> {
    let upload = routing::post(upload_artifact)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_publish_token))
        .fallback(route_not_found);

    let download = routing::get(download_artifact).fallback(route_not_found);

    Router::new()
        .route("/upload/{project}/{pr}/{build}", upload)
        .route("/download/{project}/{pr}/{build}", download)
        .fallback(route_not_found)
        .with_state(state)
}

async fn upload_artifact(
    State(state): State<PreviewState>,
    path: Result<Path<ArtifactPath>, PathRejection>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, PreviewAxumError> {
    let Path(path) = path.map_err(map_path_rejection)?;
    let key = ArtifactKey::from(path);

    if body.size_hint().exact() == Some(0) {
        return Err(ArtifactError::MissingBody.into());
    }

    // A non-UTF-8 value can never equal a hex digest; let verification reject it
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .ok_or(ArtifactError::MissingChecksum)?;

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    state.adapter.upload(&key, Box::pin(stream), &checksum).await?;

    Ok(Json(json!({ "message": "Success!" })))
}

async fn download_artifact(
    State(state): State<PreviewState>,
    path: Result<Path<ArtifactPath>, PathRejection>,
) -> Result<Response, PreviewAxumError> {
    let Path(path) = path.map_err(map_path_rejection)?;
    let key = ArtifactKey::from(path);

    let opened = state.adapter.download(&key).await?;
    let headers = artifact_headers(&opened.metadata)?;

    Ok((headers, Body::from_stream(opened.stream)).into_response())
}

async fn route_not_found() -> PreviewAxumError {
    HttpError::RouteNotFound.into()
}

fn artifact_headers(metadata: &ArtifactMetadata) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(&metadata.content_type)?);
    headers.insert(CONTENT_DISPOSITION, HeaderValue::from_str(&metadata.content_disposition)?);
    headers.insert(CACHE_CONTROL, HeaderValue::from_str(&metadata.cache_control)?);

    if metadata.size_bytes > 0 {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.size_bytes));
    }
    if !metadata.checksum.is_empty() {
        headers.insert(ETAG, HeaderValue::from_str(&format!("\"{}\"", metadata.checksum))?);
        headers.insert(
            HeaderName::from_static(CHECKSUM_HEADER),
            HeaderValue::from_str(&metadata.checksum)?,
        );
    }

    Ok(headers)
}
