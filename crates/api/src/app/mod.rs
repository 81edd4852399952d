//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service graph (directory, token codec, resolver)
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request DTOs and response view structs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `GET /` and the login route skip authentication; everything else under
/// `/api/v1` passes through the auth middleware.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        resolver: services.resolver.clone(),
    };

    let public = Router::new().route("/auth/login", post(routes::auth::login));

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/", get(routes::system::health))
        .nest("/api/v1", public.merge(protected))
        .layer(Extension(services))
}
