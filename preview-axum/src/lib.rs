//! preview-axum: HTTP surface for preview build artifacts.
//!
//! Exposes an [`ArtifactAdapter`](preview_blob::ArtifactAdapter) over axum:
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/upload/{project}/{pr}/{build}` | publish token + `x-checksum` required |
//! | GET | `/download/{project}/{pr}/{build}` | public |
//!
//! Anything else answers `404 {"error":"Route not found!"}`.

pub mod app;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::{HttpError, PreviewAxumError};
pub use state::PreviewState;

pub use app::{preview, PreviewApp};
