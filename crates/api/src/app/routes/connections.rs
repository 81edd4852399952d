use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_core::ConnectionId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_connections).post(create_connection))
        .route(
            "/:id",
            get(get_connection)
                .put(update_connection)
                .delete(delete_connection),
        )
}

pub async fn list_connections(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    let scope = context.scope_filter();
    let items: Vec<dto::ConnectionView> = services
        .directory
        .connections()
        .filter(|c| scope.permits(c.org_id, c.team_id))
        .into_iter()
        .map(dto::ConnectionView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_connection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ConnectionId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scope = context.visibility();
    match services.directory.connections().get(id) {
        Some(c) if scope.permits(c.org_id, c.team_id) => {
            (StatusCode::OK, Json(dto::ConnectionView::from(c))).into_response()
        }
        _ => not_found(),
    }
}

pub async fn create_connection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateConnectionRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() || body.kind.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "connection name and kind must not be empty",
        );
    }
    let team = match common::target_team(&services, &context, body.team_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_CONNECTIONS, team.id) {
        return errors::auth_error_to_response(e);
    }

    let record = services.directory.connections().insert_with(|id| {
        flowdeck_infra::ConnectionRecord {
            id,
            name: body.name.clone(),
            kind: body.kind.clone(),
            config: body.config.clone().unwrap_or_else(|| serde_json::json!({})),
            org_id: team.org_id,
            team_id: team.id,
        }
    });
    tracing::info!(connection = %record.name, team_id = %team.id, "connection created");
    (StatusCode::CREATED, Json(dto::ConnectionView::from(record))).into_response()
}

pub async fn update_connection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateConnectionRequest>,
) -> axum::response::Response {
    let id: ConnectionId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.connections().get(id) {
        Some(c) if context.visibility().permits(c.org_id, c.team_id) => c,
        _ => return not_found(),
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_CONNECTIONS, existing.team_id) {
        return errors::auth_error_to_response(e);
    }

    let updated = services.directory.connections().update(id, |c| {
        if let Some(name) = &body.name {
            c.name = name.clone();
        }
        if let Some(kind) = &body.kind {
            c.kind = kind.clone();
        }
        if let Some(config) = &body.config {
            c.config = config.clone();
        }
    });
    match updated {
        Some(c) => (StatusCode::OK, Json(dto::ConnectionView::from(c))).into_response(),
        None => not_found(),
    }
}

pub async fn delete_connection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ConnectionId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.connections().get(id) {
        Some(c) if context.visibility().permits(c.org_id, c.team_id) => c,
        _ => return not_found(),
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_CONNECTIONS, existing.team_id) {
        return errors::auth_error_to_response(e);
    }

    services.directory.connections().remove(id);
    tracing::info!(connection = %existing.name, "connection deleted");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "connection deleted"})),
    )
        .into_response()
}

fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "Connection not found")
}
