use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use flowdeck_auth::{Capability, TenantContext};
use flowdeck_core::{OrgId, TeamId, UserId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/orgs", get(list_orgs).post(create_org))
        .route("/orgs/:id", get(get_org))
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/:id", get(get_team))
        .route("/teams/:id/members", get(list_members).post(add_member))
        .route("/teams/:id/members/:user_id", delete(remove_member))
}

// -------------------------
// Organizations
// -------------------------

pub async fn list_orgs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::PLATFORM_ADMIN) {
        return errors::auth_error_to_response(e);
    }

    let items: Vec<dto::OrgView> = services
        .directory
        .orgs()
        .list()
        .into_iter()
        .map(dto::OrgView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_org(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrgId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let visible = context.visibility().permits_org(id);
    match services.directory.orgs().get(id) {
        Some(org) if visible => (StatusCode::OK, Json(dto::OrgView::from(org))).into_response(),
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Organization not found"),
    }
}

pub async fn create_org(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateOrgRequest>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::PLATFORM_ADMIN) {
        return errors::auth_error_to_response(e);
    }
    if body.name.trim().is_empty() || body.code.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "organization name and code must not be empty",
        );
    }

    match services.directory.create_org(&body.name, &body.code) {
        Ok(org) => {
            tracing::info!(code = %org.code, "organization created");
            (StatusCode::CREATED, Json(dto::OrgView::from(org))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

// -------------------------
// Teams
// -------------------------

pub async fn list_teams(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    let scope = context.scope_filter();
    let items: Vec<dto::TeamView> = services
        .directory
        .teams()
        .filter(|t| scope.permits(t.org_id, t.id))
        .into_iter()
        .map(dto::TeamView::from)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_team(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TeamId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scope = context.visibility();
    match services.directory.teams().get(id) {
        Some(team) if scope.permits(team.org_id, team.id) => {
            (StatusCode::OK, Json(dto::TeamView::from(team))).into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Team not found"),
    }
}

/// POST /api/v1/management/teams - creates the team and provisions its
/// three default roles.
pub async fn create_team(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateTeamRequest>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_TEAMS) {
        return errors::auth_error_to_response(e);
    }
    if body.name.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "team name must not be empty",
        );
    }

    let org_id = match context.org_id().or(body.org_id) {
        Some(org) => org,
        None => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "org_id is required for platform-wide callers",
            );
        }
    };

    match services.directory.create_team(&body.name, org_id) {
        Ok((team, roles)) => {
            tracing::info!(team = %team.name, org_id = %org_id, "team created");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "team": dto::TeamView::from(team),
                    "provisioned_roles": roles.into_iter().map(dto::RoleView::from).collect::<Vec<_>>(),
                })),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

// -------------------------
// Members
// -------------------------

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TeamId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let team = match common::target_team(&services, &context, id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_USERS, team.id) {
        return errors::auth_error_to_response(e);
    }

    let items: Vec<dto::MembershipView> = services
        .directory
        .memberships()
        .filter(|m| m.team_id == team.id)
        .into_iter()
        .map(|m| {
            let username = services
                .directory
                .users()
                .get(m.user_id)
                .map(|u| u.username)
                .unwrap_or_default();
            let role = services.directory.role_name(m.role_id).unwrap_or_default();
            dto::membership_view(m, username, role)
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddMemberRequest>,
) -> axum::response::Response {
    let id: TeamId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let team = match common::target_team(&services, &context, id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_USERS, team.id) {
        return errors::auth_error_to_response(e);
    }

    match services.directory.add_member(team.id, body.user_id, body.role_id) {
        Ok(m) => {
            tracing::info!(team_id = %team.id, user_id = %m.user_id, "member added");
            let username = services
                .directory
                .users()
                .get(m.user_id)
                .map(|u| u.username)
                .unwrap_or_default();
            let role = services.directory.role_name(m.role_id).unwrap_or_default();
            (
                StatusCode::CREATED,
                Json(dto::membership_view(m, username, role)),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /api/v1/management/teams/:id/members/:user_id - deactivates the
/// membership; the row stays for history.
pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> axum::response::Response {
    let id: TeamId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let user_id: UserId = match user_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let team = match common::target_team(&services, &context, id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = context.require_in_team(Capability::MANAGE_USERS, team.id) {
        return errors::auth_error_to_response(e);
    }

    match services.directory.deactivate_member(team.id, user_id) {
        Some(_) => {
            tracing::info!(team_id = %team.id, user_id = %user_id, "membership deactivated");
            (
                StatusCode::OK,
                Json(serde_json::json!({"status": "membership deactivated"})),
            )
                .into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Membership not found"),
    }
}
