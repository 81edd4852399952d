use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod common;
pub mod connections;
pub mod management;
pub mod pipelines;
pub mod reports;
pub mod repositories;
pub mod schedules;
pub mod status;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .nest("/users", users::router())
        .nest("/management", management::router())
        .nest("/connections", connections::router())
        .nest("/pipelines", pipelines::router())
        .nest("/schedules", schedules::router())
        .nest("/repositories", repositories::router())
        .nest("/status", status::router())
        .nest("/reports", reports::router())
}
