//! Route configuration and setup.
//!
//! Share endpoints live in [handlers](crate::handlers); health checks in [health](health).

mod health;

use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use filedrop_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Request bodies here are small JSON documents; the file bytes themselves
/// never pass through this service.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .route("/upload", post(handlers::upload::create_upload))
        .route(
            "/download/{file_id}",
            get(handlers::download::resolve_download),
        )
        .route("/internal/cleanup", post(handlers::cleanup::run_cleanup))
        .route("/health", get(health::health_check))
        .route(
            "/ready",
            get({
                let state = state.clone();
                move || async { health::readiness_check(state).await }
            }),
        )
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::ApiDoc::openapi()) }),
        )
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
