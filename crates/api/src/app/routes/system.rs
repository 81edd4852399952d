use axum::{Json, extract::Extension, response::IntoResponse};

use flowdeck_auth::TenantContext;

use crate::context::CurrentUser;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "flowdeck",
        "status": "ok",
    }))
}

/// Echo of the authorization snapshot for the current request.
pub async fn whoami(
    Extension(context): Extension<TenantContext>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "username": user.username(),
        "org_id": context.org_id(),
        "focused_team": context.focused_team(),
        "global_capabilities": context.global_capabilities().names(),
    }))
}
