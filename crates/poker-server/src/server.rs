//! Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use poker_service::PlanningService;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::websocket::connection::ConnectionId;
use crate::websocket::hub::Hub;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Realtime hub.
    pub hub: Arc<Hub>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// Build the Axum router with all routes.
///
/// `/session/...` paths serve the client's `index.html` so deep links into a
/// planning load the app; everything else falls through to the static dir.
pub fn build_router(state: AppState) -> Router {
    let index = ServeFile::new(state.config.static_dir.join("index.html"));
    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route_service("/session/", index.clone())
        .route_service("/session/{*rest}", index)
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until the returned handle is shut down.
pub async fn start(
    config: ServerConfig,
    service: Arc<PlanningService>,
    metrics: Option<PrometheusHandle>,
) -> Result<ServerHandle, std::io::Error> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let hub = Arc::new(Hub::new(service));
    let reporter = hub.spawn_session_reporter(
        Duration::from_secs(config.report_interval_secs.max(1)),
        shutdown.child_token(),
    );

    let router = build_router(AppState {
        hub,
        config: Arc::new(config),
        start_time: Instant::now(),
        metrics,
    });

    info!(%addr, "planning poker server listening");

    let token = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(err) = result {
            error!(error = %err, "server terminated with error");
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown,
        server,
        reporter,
    })
}

/// Handle returned by [`start`]. Keeps the server and reporter tasks.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: CancellationToken,
    server: JoinHandle<()>,
    reporter: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address (useful with port `0`).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop accepting connections and wait for background tasks to finish.
    pub async fn shutdown(self) {
        info!("shutting down");
        self.shutdown.cancel();
        let _ = self.server.await;
        let _ = self.reporter.await;
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = Arc::clone(&state.hub);
    let queue = state.config.max_send_queue;
    ws.on_upgrade(move |socket| run_ws_session(socket, ConnectionId::new(), hub, queue))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.hub.connection_count(),
        state.hub.service().active_plannings(),
    ))
}

/// GET /metrics
///
/// Empty when no recorder is installed.
async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
