//! # SocialGraph HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Store counters
//! - `POST /users` - Register
//! - `POST /login` - Verify credentials
//! - `GET|PATCH /users/{username}` - Profile view and edit
//! - `POST /follow`, `POST /unfollow` - Relationship mutation
//! - `GET /users/{username}/following|followers|recommendations`
//! - `GET /mutual?a=&b=&limit=` - Mutual connections
//! - `GET /search?q=&limit=` - User search
//! - `GET /popular?limit=` - Popular users
//!
//! ## Security Configuration
//!
//! Taken from [`Config`]: `cors_origins` (comma-separated, `*` for all,
//! default localhost only), `rate_limit` (requests per second, 0 disables)
//! and `api_key` (Bearer authentication when set).

mod auth;
mod handlers;
mod middleware;
mod types;

pub use handlers::ApiError;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ErrorResponse, FollowRequest, FollowResponse, HealthResponse, LoginRequest, RegisterRequest,
    StatusResponse, UnfollowResponse, UpdateRequest,
};

use crate::config::Config;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use socialgraph_core::{Session, SharedSession, SocialError};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (2 MB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the session.
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
}

impl AppState {
    /// Create new app state with a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: SharedSession::new(session),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];

/// Build the CORS layer.
///
/// - `Some("*")`: allow all origins
/// - `None`: localhost only
/// - otherwise: the comma-separated origins that parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if an API key is configured)
pub fn create_router(state: AppState, config: &Config) -> Router {
    let cors = build_cors_layer(config.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(config.rate_limit);
    match rate_limiter {
        Some(_) => tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit),
        None => tracing::info!("Rate limiting disabled"),
    }

    let api_key: Option<auth::ApiKey> = config.api_key.as_deref().map(Arc::from);
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set SOCIALGRAPH_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/users", post(handlers::register_handler))
        .route("/login", post(handlers::login_handler))
        .route(
            "/users/{username}",
            get(handlers::profile_handler).patch(handlers::update_handler),
        )
        .route("/users/{username}/following", get(handlers::following_handler))
        .route("/users/{username}/followers", get(handlers::followers_handler))
        .route(
            "/users/{username}/recommendations",
            get(handlers::recommend_handler),
        )
        .route("/follow", post(handlers::follow_handler))
        .route("/unfollow", post(handlers::unfollow_handler))
        .route("/mutual", get(handlers::mutual_handler))
        .route("/search", get(handlers::search_handler))
        .route("/popular", get(handlers::popular_handler));

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, session: Session, config: &Config) -> Result<(), SocialError> {
    let state = AppState::new(session);
    let router = create_router(state, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SocialError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("SocialGraph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SocialError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
