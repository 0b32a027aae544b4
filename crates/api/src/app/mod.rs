//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and order directory wiring, seed loading
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Loads `SEED_ORDERS_PATH` into the order directory when configured.
pub fn build_app(config: &ApiConfig) -> Result<Router, services::SeedError> {
    let services = services::AppServices::in_memory(config.page_limits);
    if let Some(path) = &config.seed_orders_path {
        let orders = services::load_seed_orders(path)?;
        tracing::info!(path = %path.display(), orders = orders.len(), "seeded order directory");
        services.seed_orders(orders);
    }
    Ok(build_app_with(config, services))
}

/// Build the router around already-wired services.
pub fn build_app_with(config: &ApiConfig, services: services::AppServices) -> Router {
    let jwt = Arc::new(rma_auth::Hs256JwtValidator::new(
        config.jwt_secret.clone().into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
