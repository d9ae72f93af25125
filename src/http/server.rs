//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (request ID, tracing, CORS)
//! - Bind server to listener
//! - Dispatch requests to the routing table
//! - Forward `/sse` and `/api` requests to the backend
//! - Answer `/health` locally
//! - Stop accepting on shutdown and wait for open connections, up to a deadline

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::json;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::proxy::{BackendTarget, Forwarder, Pipeline};
use crate::routing::{Route, Router as ProxyRouter};
use crate::security::{cors_middleware, CorsPolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub forwarder: Arc<Forwarder>,
    pub sse_pipeline: Arc<Pipeline>,
    pub api_pipeline: Arc<Pipeline>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let target = BackendTarget::from_config(&config.backend)
            .map_err(|e| ConfigError::Validation(vec![e]))?;
        let cors = Arc::new(
            CorsPolicy::from_config(&config.cors).map_err(|e| ConfigError::Validation(vec![e]))?,
        );

        let state = AppState {
            router: Arc::new(ProxyRouter::new()),
            forwarder: Arc::new(Forwarder::new(target, cors.clone(), &config.timeouts)),
            sse_pipeline: Arc::new(Pipeline::sse()),
            api_pipeline: Arc::new(Pipeline::api(Duration::from_secs(
                config.timeouts.api_request_secs,
            ))),
        };

        let router = Self::build_router(state, cors);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, cors: Arc<CorsPolicy>) -> Router {
        let request_layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID));

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(request_layers)
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    ///
    /// Event streams never finish on their own, so draining is bounded by
    /// `shutdown_grace_secs`. Connections still open at the deadline are left
    /// behind; they end when the runtime shuts down.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let mut drain_deadline = shutdown.resubscribe();

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = async {
                let _ = drain_deadline.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Drain deadline elapsed, returning with connections still open"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up the route and either answers locally or forwards.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let route = state
        .router
        .match_request(request.method(), request.uri().path());

    let pipeline = match route {
        Route::Health => {
            metrics::record_request(route.as_str(), 200, start_time);
            return health_response();
        }
        Route::NotFound => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "No route matched"
            );
            metrics::record_request(route.as_str(), 404, start_time);
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
        Route::Sse => state.sse_pipeline.clone(),
        Route::Api => state.api_pipeline.clone(),
    };

    let kind = pipeline.kind();
    match state.forwarder.forward(request, &pipeline).await {
        Ok(response) => {
            metrics::record_request(kind.as_str(), response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(
                pipeline = %kind,
                backend = %state.forwarder.target(),
                kind = e.kind(),
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(kind.as_str(), e.kind());
            let response = e.into_response_for(kind);
            metrics::record_request(kind.as_str(), response.status().as_u16(), start_time);
            response
        }
    }
}

fn health_response() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}
