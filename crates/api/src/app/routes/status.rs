use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_infra::RunState;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const DEFAULT_RUN_LIMIT: usize = 50;
const MAX_RUN_LIMIT: usize = 200;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/runs", get(recent_runs))
}

/// GET /api/v1/status/summary - counts of what the caller can see.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::VIEW_TELEMETRY) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.scope_filter();
    let connections = services
        .directory
        .connections()
        .filter(|c| scope.permits(c.org_id, c.team_id))
        .len();
    let pipelines = services
        .directory
        .pipelines()
        .filter(|p| scope.permits(p.org_id, p.team_id))
        .len();
    let schedules = services
        .directory
        .schedules()
        .filter(|s| scope.permits(s.org_id, s.team_id))
        .len();

    let runs = services
        .directory
        .runs()
        .filter(|r| scope.permits(r.org_id, r.team_id));
    let today = Utc::now().date_naive();
    let active_runs = runs.iter().filter(|r| r.state == RunState::Running).count();
    let failed_today = runs
        .iter()
        .filter(|r| r.state == RunState::Failed && r.started_at.date_naive() == today)
        .count();

    (
        StatusCode::OK,
        Json(dto::StatusSummary {
            connections,
            pipelines,
            schedules,
            active_runs,
            failed_today,
        }),
    )
        .into_response()
}

/// GET /api/v1/status/runs?limit=N - newest runs first.
pub async fn recent_runs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Query(query): Query<dto::RunsQuery>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::VIEW_TELEMETRY) {
        return errors::auth_error_to_response(e);
    }

    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).min(MAX_RUN_LIMIT);
    let scope = context.scope_filter();
    let mut runs = services
        .directory
        .runs()
        .filter(|r| scope.permits(r.org_id, r.team_id));
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    runs.truncate(limit);

    let items: Vec<dto::RunView> = runs.into_iter().map(dto::RunView::from).collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
