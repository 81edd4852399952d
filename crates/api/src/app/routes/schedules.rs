use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_core::ScheduleId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_schedules).post(create_schedule))
        .route(
            "/:id",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
}

pub async fn list_schedules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    let scope = context.scope_filter();
    let items: Vec<dto::ScheduleView> = services
        .directory
        .schedules()
        .filter(|s| scope.permits(s.org_id, s.team_id))
        .into_iter()
        .map(dto::ScheduleView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ScheduleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scope = context.visibility();
    match services.directory.schedules().get(id) {
        Some(s) if scope.permits(s.org_id, s.team_id) => {
            (StatusCode::OK, Json(dto::ScheduleView::from(s))).into_response()
        }
        _ => not_found(),
    }
}

pub async fn create_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateScheduleRequest>,
) -> axum::response::Response {
    if body.slug.trim().is_empty() || body.cron.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "schedule slug and cron must not be empty",
        );
    }
    let team = match common::target_team(&services, &context, body.team_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::EDIT_PIPELINES, team.id) {
        return errors::auth_error_to_response(e);
    }

    let record = services.directory.schedules().insert_with(|id| {
        flowdeck_infra::ScheduleRecord {
            id,
            slug: body.slug.clone(),
            cron: body.cron.clone(),
            timezone: body.timezone.clone().unwrap_or_else(|| "UTC".to_string()),
            org_id: team.org_id,
            team_id: team.id,
        }
    });
    tracing::info!(schedule = %record.slug, team_id = %team.id, "schedule created");
    (StatusCode::CREATED, Json(dto::ScheduleView::from(record))).into_response()
}

pub async fn update_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateScheduleRequest>,
) -> axum::response::Response {
    let id: ScheduleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.schedules().get(id) {
        Some(s) if context.visibility().permits(s.org_id, s.team_id) => s,
        _ => return not_found(),
    };
    if let Err(e) = context.require_in_team(Capability::EDIT_PIPELINES, existing.team_id) {
        return errors::auth_error_to_response(e);
    }

    let updated = services.directory.schedules().update(id, |s| {
        if let Some(cron) = &body.cron {
            s.cron = cron.clone();
        }
        if let Some(timezone) = &body.timezone {
            s.timezone = timezone.clone();
        }
    });
    match updated {
        Some(s) => (StatusCode::OK, Json(dto::ScheduleView::from(s))).into_response(),
        None => not_found(),
    }
}

pub async fn delete_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ScheduleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.schedules().get(id) {
        Some(s) if context.visibility().permits(s.org_id, s.team_id) => s,
        _ => return not_found(),
    };
    if let Err(e) = context.require_in_team(Capability::EDIT_PIPELINES, existing.team_id) {
        return errors::auth_error_to_response(e);
    }

    services.directory.schedules().remove(id);
    tracing::info!(schedule = %existing.slug, "schedule deleted");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "schedule deleted"})),
    )
        .into_response()
}

fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "Schedule not found")
}
