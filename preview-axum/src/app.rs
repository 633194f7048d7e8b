use std::future::Future;

use axum::Router;
use preview_blob::ArtifactAdapter;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rest;
use crate::PreviewState;

#[derive(Clone)]
pub struct PreviewApp {
    pub state: PreviewState,
    pub router: Router<()>,
}

impl PreviewApp {
    pub fn new<T: Into<String>>(adapter: ArtifactAdapter, publish_token: T) -> Self {
        let state = PreviewState::new(adapter, publish_token);
        let router = rest::artifact_router(state.clone()).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

        Self { state, router }
    }

    /// Serve until Ctrl-C / SIGTERM
    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        self.listen_with_shutdown(addr, shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests and pending cache writes
    pub async fn listen_with_shutdown<A, F>(self, addr: A, signal: F) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        self.state.adapter.flush_cache_writes().await;
        tracing::info!("shut down");
        Ok(())
    }
}

pub fn preview<T: Into<String>>(adapter: ArtifactAdapter, publish_token: T) -> PreviewApp {
    PreviewApp::new(adapter, publish_token)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
