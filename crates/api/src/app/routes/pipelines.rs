use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_core::{LocationId, PipelineId, ScheduleId, TeamId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_pipelines).post(create_pipeline))
        .route(
            "/:id",
            get(get_pipeline).put(update_pipeline).delete(delete_pipeline),
        )
}

pub async fn list_pipelines(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    let scope = context.scope_filter();
    let items: Vec<dto::PipelineView> = services
        .directory
        .pipelines()
        .filter(|p| scope.permits(p.org_id, p.team_id))
        .into_iter()
        .map(dto::PipelineView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PipelineId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scope = context.visibility();
    match services.directory.pipelines().get(id) {
        Some(p) if scope.permits(p.org_id, p.team_id) => {
            (StatusCode::OK, Json(dto::PipelineView::from(p))).into_response()
        }
        _ => not_found(),
    }
}

pub async fn create_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreatePipelineRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "pipeline name must not be empty",
        );
    }
    let team = match common::target_team(&services, &context, body.team_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if !context.has(Capability::EDIT_PIPELINES, Some(team.id)) {
        return denial(team.id);
    }
    if let Some(location_id) = body.location_id {
        if let Err(resp) = check_location(&services, location_id, team.id) {
            return resp;
        }
    }
    if let Some(schedule_id) = body.schedule_id {
        if let Err(resp) = check_schedule(&services, schedule_id, team.id) {
            return resp;
        }
    }

    let record = services.directory.pipelines().insert_with(|id| {
        flowdeck_infra::PipelineRecord {
            id,
            name: body.name.clone(),
            description: body.description.clone(),
            org_id: team.org_id,
            team_id: team.id,
            location_id: body.location_id,
            schedule_id: body.schedule_id,
        }
    });
    tracing::info!(pipeline = %record.name, team_id = %team.id, "pipeline created");
    (StatusCode::CREATED, Json(dto::PipelineView::from(record))).into_response()
}

pub async fn update_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePipelineRequest>,
) -> axum::response::Response {
    let id: PipelineId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.pipelines().get(id) {
        Some(p) if context.visibility().permits(p.org_id, p.team_id) => p,
        _ => return not_found(),
    };
    if !context.has(Capability::EDIT_PIPELINES, Some(existing.team_id)) {
        return denial(existing.team_id);
    }
    if let Some(location_id) = body.location_id {
        if let Err(resp) = check_location(&services, location_id, existing.team_id) {
            return resp;
        }
    }
    if let Some(schedule_id) = body.schedule_id {
        if let Err(resp) = check_schedule(&services, schedule_id, existing.team_id) {
            return resp;
        }
    }

    let updated = services.directory.pipelines().update(id, |p| {
        if let Some(name) = &body.name {
            p.name = name.clone();
        }
        if let Some(description) = &body.description {
            p.description = Some(description.clone());
        }
        if let Some(location_id) = body.location_id {
            p.location_id = Some(location_id);
        }
        if let Some(schedule_id) = body.schedule_id {
            p.schedule_id = Some(schedule_id);
        }
    });
    match updated {
        Some(p) => (StatusCode::OK, Json(dto::PipelineView::from(p))).into_response(),
        None => not_found(),
    }
}

pub async fn delete_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PipelineId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let existing = match services.directory.pipelines().get(id) {
        Some(p) if context.visibility().permits(p.org_id, p.team_id) => p,
        _ => return not_found(),
    };
    if !context.has(Capability::EDIT_PIPELINES, Some(existing.team_id)) {
        return denial(existing.team_id);
    }

    services.directory.pipelines().remove(id);
    tracing::info!(pipeline = %existing.name, "pipeline deleted");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "pipeline deleted"})),
    )
        .into_response()
}

/// Pipeline denials name the team so a developer holding edit rights
/// elsewhere can see which membership is missing.
fn denial(team: TeamId) -> axum::response::Response {
    errors::json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        format!("missing capability 'edit-pipelines' for team {team}"),
    )
}

fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "Pipeline not found")
}

fn check_location(
    services: &AppServices,
    location_id: LocationId,
    team_id: TeamId,
) -> Result<(), axum::response::Response> {
    match services.directory.locations().get(location_id) {
        Some(l) if l.team_id == team_id => Ok(()),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "code location is not in the target team",
        )),
    }
}

fn check_schedule(
    services: &AppServices,
    schedule_id: ScheduleId,
    team_id: TeamId,
) -> Result<(), axum::response::Response> {
    match services.directory.schedules().get(schedule_id) {
        Some(s) if s.team_id == team_id => Ok(()),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "schedule is not in the target team",
        )),
    }
}
