//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the two rate limiters and the order store from config
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit, metrics)
//! - Own the limiter cleanup task for the server's lifetime
//! - Serve until the shutdown broadcast fires

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{AdminConfig, GuardConfig};
use crate::http::handlers;
use crate::observability::metrics;
use crate::orders::OrderStore;
use crate::security::rate_limit::{CleanupTask, RateLimiter};

/// How long shutdown waits for the cleanup task to exit on its own.
const CLEANUP_STOP_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Guards the admin login route.
    pub auth_limiter: Arc<RateLimiter>,
    /// Guards the public order route.
    pub api_limiter: Arc<RateLimiter>,
    pub orders: OrderStore,
    pub admin: Arc<AdminConfig>,
    pub count_successful_submissions: bool,
}

impl AppState {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            auth_limiter: Arc::new(RateLimiter::from_config("auth", &config.auth_limiter, &config.cleanup)),
            api_limiter: Arc::new(RateLimiter::from_config("api", &config.api_limiter, &config.cleanup)),
            orders: OrderStore::new(),
            admin: Arc::new(config.admin.clone()),
            count_successful_submissions: config.api.count_successful_submissions,
        }
    }
}

/// HTTP server for the storefront guard.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GuardConfig) -> Self {
        let state = AppState::from_config(&config);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GuardConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/admin/login", post(handlers::login))
            .route("/api/orders", post(handlers::create_order))
            .route("/api/orders/{id}", get(handlers::get_order))
            .merge(admin::setup_admin_router(state.clone()))
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            auth_max_attempts = self.state.auth_limiter.max_attempts(),
            api_max_attempts = self.state.api_limiter.max_attempts(),
            "HTTP server starting"
        );

        let cleanup = CleanupTask::new(
            vec![self.state.auth_limiter.clone(), self.state.api_limiter.clone()],
            self.config.cleanup.interval(),
        )
        .spawn(shutdown.resubscribe());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if result.is_err() {
            cleanup.abort();
        } else if !cleanup.stop(CLEANUP_STOP_GRACE).await {
            tracing::warn!("Rate limiter cleanup was aborted during shutdown");
        }
        result?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Shared handler state, including both limiters.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Count every response by matched route and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16());
    response
}
