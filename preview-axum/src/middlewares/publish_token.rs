use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::HttpError;
use crate::{PreviewAxumError, PreviewState};

/// Shared-secret gate for publishing routes.
///
/// The `authorization` header must equal the configured publish token byte for
/// byte. A plain equality check: no scheme prefix, no constant-time comparison.
pub async fn require_publish_token(State(state): State<PreviewState>, request: Request, next: Next) -> Response {
    let presented = request.headers().get(AUTHORIZATION).map(|v| v.as_bytes());

    if presented != Some(state.publish_token.as_bytes()) {
        tracing::debug!(path = %request.uri().path(), "publish token rejected");
        return PreviewAxumError::from(HttpError::Unauthorized).into_response();
    }

    next.run(request).await
}
