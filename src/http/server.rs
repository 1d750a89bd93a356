//! HTTP server setup and handlers.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (correlation ID, tracing, timeout)
//! - Bind server to listener, serve with graceful shutdown
//! - Dispatch sync requests through the resilient invoker
//! - Report dependency health

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::health::active::HealthMonitor;
use crate::health::state::{DependencyHealth, HealthRegistry};
use crate::http::request::{RequestId, RequestIdExt, RequestIdLayer};
use crate::http::response::{self, HealthDown, HealthUp, SyncReply, SYNC_COMPLETED};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{self, OutcomeCounter};
use crate::resilience::retries::Invoker;
use crate::upstream::client::SyncClient;
use crate::upstream::types::UpstreamError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<SyncClient>,
    pub invoker: Arc<Invoker>,
    pub health: Arc<HealthRegistry>,
    pub shutdown: Arc<Shutdown>,
}

/// HTTP server for the sync gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    client: Arc<SyncClient>,
    shutdown: Arc<Shutdown>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig, shutdown: Arc<Shutdown>) -> Result<Self, UpstreamError> {
        let dependency = Arc::new(DependencyHealth::new(config.upstream.name.clone()));
        let mut registry = HealthRegistry::new();
        registry.register(dependency.clone());

        let client = Arc::new(SyncClient::new(
            &config.upstream,
            &config.health_check,
            dependency,
        )?);
        let outcomes = Arc::new(OutcomeCounter::default());
        let invoker = Arc::new(Invoker::new(config.retries.clone(), outcomes));

        let state = AppState {
            client: client.clone(),
            invoker,
            health: Arc::new(registry),
            shutdown: shutdown.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            client,
            shutdown,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/event/sync", post(sync_event))
            .route("/health", get(health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .request_id()
                        .map(RequestId::as_str)
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            // Outermost so every response carries the correlation header,
            // including timeouts.
            .layer(RequestIdLayer)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.client.clone(), self.config.health_check.clone());
            let monitor_shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Sync endpoint: forward the event payload through the resilient invoker.
async fn sync_event(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(payload): Json<Value>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id
        .map(|Extension(id)| id)
        .unwrap_or_else(RequestId::sentinel);

    metrics::record_sync_call();
    tracing::info!(request_id = %request_id, "Event sync requested");

    let mut cancel = state.shutdown.subscribe();
    let result = state
        .invoker
        .invoke(
            &request_id,
            || state.client.sync_event(&request_id, &payload),
            &mut cancel,
        )
        .await;

    match result {
        Ok(()) => {
            metrics::record_request("/api/event/sync", 200, start);
            (
                StatusCode::OK,
                Json(SyncReply {
                    message: SYNC_COMPLETED,
                }),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                error = %error,
                "Final event synchronization failure"
            );
            let reply = response::sync_failure(&error);
            metrics::record_request("/api/event/sync", 503, start);
            reply.into_response()
        }
    }
}

/// Health endpoint: report reachability of all declared dependencies.
async fn health(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    let start = Instant::now();
    let unreachable = state.health.unreachable();

    if unreachable.is_empty() {
        metrics::record_request("/health", 200, start);
        (
            StatusCode::OK,
            Json(HealthUp::new(state.health.service_names())),
        )
            .into_response()
    } else {
        let request_id = request_id
            .map(|Extension(id)| id)
            .unwrap_or_else(RequestId::sentinel);
        tracing::warn!(
            request_id = %request_id,
            unreachable = ?unreachable,
            "Health check reporting DOWN"
        );
        metrics::record_request("/health", 500, start);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthDown::new(format!(
                "unreachable dependencies: {}",
                unreachable.join(", ")
            ))),
        )
            .into_response()
    }
}
