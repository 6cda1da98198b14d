//! HTTP server for the Prometheus metrics endpoint.

use crate::collector::CollectorStatus;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Shared state for the metrics server.
pub struct MetricsState {
    registry: MetricsRegistry,
    status: Option<CollectorStatus>,
}

impl MetricsState {
    /// Records the latest collector status and refreshes every metric.
    pub fn update(&mut self, status: &CollectorStatus) {
        self.registry.update(&MetricsSnapshot::from_status(status));
        self.status = Some(status.clone());
    }

    pub fn status(&self) -> Option<&CollectorStatus> {
        self.status.as_ref()
    }
}

/// HTTP server exposing `/metrics`, `/status` and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<RwLock<MetricsState>>,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                status: None,
            })),
        }
    }

    /// Returns the shared state for updating metrics.
    pub fn state(&self) -> Arc<RwLock<MetricsState>> {
        Arc::clone(&self.state)
    }

    fn router(state: Arc<RwLock<MetricsState>>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/status", get(status_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    let state = state.read().await;

    match state.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Latest collector status as JSON; 503 until the first update.
async fn status_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> Response {
    let state = state.read().await;
    match state.status() {
        Some(status) => Json(status.clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "collector not started").into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
    }

    #[test]
    fn test_config_with_port() {
        assert_eq!(MetricsServerConfig::with_port(8080).bind_addr.port(), 8080);
    }

    #[test]
    fn test_state_update_records_status() {
        let registry = MetricsRegistry::new().unwrap();
        let server = MetricsServer::new(MetricsServerConfig::default(), registry);
        let state = server.state();
        let status = CollectorStatus {
            frames_processed: 9,
            ..Default::default()
        };

        state.blocking_write().update(&status);

        let guard = state.blocking_read();
        assert_eq!(guard.status().map(|s| s.frames_processed), Some(9));
        assert!(guard
            .registry
            .encode()
            .unwrap()
            .contains("true_entropy_frames_processed_total 9"));
    }
}
