/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use cargodesk_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = cargodesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use cargodesk_shared::auth::middleware::authenticate;
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, error::ApiError, middleware::security::security_headers, routes};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                            # Health check (public)
/// └── /v1/
///     ├── POST /register                 # public
///     ├── POST /token                    # public
///     ├── POST /token/refresh            # public
///     ├── /users                         # JWT
///     │   ├── GET  /me
///     │   ├── GET|POST /
///     │   ├── GET|PUT|PATCH|DELETE /:id
///     │   ├── PATCH /:id/approve
///     │   └── PATCH /:id/reject
///     ├── /organizations                 # JWT
///     │   ├── GET|POST /
///     │   └── GET|PUT|PATCH|DELETE /:id
///     ├── /cargo-requests                # JWT
///     │   ├── GET|POST /
///     │   ├── GET|PUT|PATCH|DELETE /:id
///     │   └── PATCH /:id/update_status
///     └── GET /analytics                 # JWT
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. Compression
/// 3. CORS
/// 4. Logging (tower-http TraceLayer)
/// 5. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/token", post(routes::auth::token))
        .route("/token/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .route(
            "/users",
            get(routes::users::list).post(routes::users::create),
        )
        .route(
            "/users/:id",
            get(routes::users::retrieve)
                .put(routes::users::update)
                .patch(routes::users::update)
                .delete(routes::users::delete),
        )
        .route("/users/:id/approve", patch(routes::users::approve))
        .route("/users/:id/reject", patch(routes::users::reject))
        .route(
            "/organizations",
            get(routes::organizations::list).post(routes::organizations::create),
        )
        .route(
            "/organizations/:id",
            get(routes::organizations::retrieve)
                .put(routes::organizations::update)
                .patch(routes::organizations::update)
                .delete(routes::organizations::delete),
        )
        .route(
            "/cargo-requests",
            get(routes::cargo_requests::list).post(routes::cargo_requests::create),
        )
        .route(
            "/cargo-requests/:id",
            get(routes::cargo_requests::retrieve)
                .put(routes::cargo_requests::update)
                .patch(routes::cargo_requests::update)
                .delete(routes::cargo_requests::delete),
        )
        .route(
            "/cargo-requests/:id/update_status",
            patch(routes::cargo_requests::update_status),
        )
        .route("/analytics", get(routes::analytics::report))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn_with_state(
            state.config.api.production,
            security_headers,
        ))
        .with_state(state)
}

/// CORS: permissive when any origin is allowed, an allow-list otherwise
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token, loads the caller's current user row and
/// injects the resulting `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, req.headers(), state.jwt_secret()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
