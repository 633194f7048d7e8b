use std::sync::Arc;

use preview_blob::ArtifactAdapter;

/// Per-process state shared by every request
#[derive(Clone)]
pub struct PreviewState {
    pub adapter: Arc<ArtifactAdapter>,
    pub publish_token: Arc<str>,
}

impl PreviewState {
    pub fn new<T: Into<String>>(adapter: ArtifactAdapter, publish_token: T) -> Self {
        Self {
            adapter: Arc::new(adapter),
            publish_token: Arc::from(publish_token.into()),
        }
    }
}
