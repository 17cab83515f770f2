//! Health and metrics listener
//!
//! Optional; bound only when `admin.listen_addr` / `ADMIN_ADDR` is set.
//!
//! Endpoints:
//! - GET /health: per-account status and overall fleet health
//! - GET /metrics: Prometheus text exposition

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use fleet::{FleetHealth, StatusReceiver};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Concurrent admin requests served at once; the rest queue.
const MAX_CONNECTIONS: usize = 64;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    statuses: Vec<StatusReceiver>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

impl AdminState {
    pub fn new(statuses: Vec<StatusReceiver>, prometheus: PrometheusHandle) -> Self {
        Self {
            statuses,
            prometheus,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(MAX_CONNECTIONS))
        .with_state(state)
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn spawn(
    addr: SocketAddr,
    state: AdminState,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind admin listener to {addr}"))?;
    info!(addr = %addr, "admin listener ready");

    let app = build_router(state);
    Ok(tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await;
        if let Err(e) = served {
            error!(error = %e, "admin listener failed");
        }
    }))
}

/// 200 when at least one account is connected, 503 otherwise.
async fn health_handler(State(state): State<AdminState>) -> impl IntoResponse {
    let health = FleetHealth::from_receivers(&state.statuses);
    let code = if health.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let body = serde_json::json!({
        "status": health.status,
        "connected": health.connected,
        "total": health.total,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "accounts": health.accounts,
    });
    (
        code,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

async fn metrics_handler(State(state): State<AdminState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fleet::{AccountStatus, ConnectionStatus};
    use tokio::sync::watch;
    use tower::ServiceExt;

    /// Create a PrometheusHandle for tests without installing a global recorder.
    fn test_prometheus_handle() -> PrometheusHandle {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle()
    }

    fn channels(
        statuses: &[ConnectionStatus],
    ) -> (Vec<watch::Sender<AccountStatus>>, Vec<StatusReceiver>) {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut initial =
                    AccountStatus::new(i + 1, "0x1234567890abcdef1234567890abcdef12345678");
                initial.status = *status;
                watch::channel(initial)
            })
            .unzip()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_every_account() {
        let (_senders, receivers) =
            channels(&[ConnectionStatus::Connected, ConnectionStatus::Authenticating]);
        let app = build_router(AdminState::new(receivers, test_prometheus_handle()));

        let (code, json) = get_json(app, "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["connected"], 1);
        assert_eq!(json["total"], 2);
        assert_eq!(json["accounts"][0]["index"], 1);
        assert_eq!(json["accounts"][0]["address"], "0x1234...5678");
        assert_eq!(json["accounts"][0]["status"], "connected");
        assert_eq!(json["accounts"][1]["status"], "authenticating");
        assert!(json["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn health_follows_status_updates() {
        let (senders, receivers) = channels(&[ConnectionStatus::Authenticating]);
        let app = build_router(AdminState::new(receivers, test_prometheus_handle()));

        let (code, json) = get_json(app.clone(), "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "unhealthy");

        senders[0].send_modify(|s| {
            s.status = ConnectionStatus::Connected;
            s.last_points = Some(4821);
        });
        let (code, json) = get_json(app, "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["accounts"][0]["last_points"], 4821);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_prometheus_format() {
        let (_senders, receivers) = channels(&[ConnectionStatus::Connected]);
        let app = build_router(AdminState::new(receivers, test_prometheus_handle()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn listener_stops_on_cancel() {
        let (_senders, receivers) = channels(&[ConnectionStatus::Connected]);
        let cancel = CancellationToken::new();
        let task = spawn(
            "127.0.0.1:0".parse().unwrap(),
            AdminState::new(receivers, test_prometheus_handle()),
            cancel.clone(),
        )
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("listener should stop")
            .unwrap();
    }
}
