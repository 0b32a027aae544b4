use axum::{routing::get, Router};

pub mod return_authorizations;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(return_authorizations::router())
}
