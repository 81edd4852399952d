use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_core::LocationId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_repositories).post(create_repository))
        .route("/:id", get(get_repository))
}

pub async fn list_repositories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    let scope = context.scope_filter();
    let items: Vec<dto::RepositoryView> = services
        .directory
        .locations()
        .filter(|l| scope.permits(l.org_id, l.team_id))
        .into_iter()
        .map(dto::RepositoryView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_repository(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scope = context.visibility();
    match services.directory.locations().get(id) {
        Some(l) if scope.permits(l.org_id, l.team_id) => {
            (StatusCode::OK, Json(dto::RepositoryView::from(l))).into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Code location not found"),
    }
}

pub async fn create_repository(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateRepositoryRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() || body.repo_url.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "code location name and repo_url must not be empty",
        );
    }
    let team = match common::target_team(&services, &context, body.team_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_CONNECTIONS, team.id) {
        return errors::auth_error_to_response(e);
    }

    let record = services.directory.locations().insert_with(|id| {
        flowdeck_infra::LocationRecord {
            id,
            name: body.name.clone(),
            repo_url: body.repo_url.clone(),
            branch: body.branch.clone().unwrap_or_else(|| "main".to_string()),
            org_id: team.org_id,
            team_id: team.id,
        }
    });
    tracing::info!(location = %record.name, team_id = %team.id, "code location registered");
    (StatusCode::CREATED, Json(dto::RepositoryView::from(record))).into_response()
}
