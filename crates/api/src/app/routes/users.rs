use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{Capability, TenantContext, hash_password};
use flowdeck_core::{TeamId, UserId};
use flowdeck_infra::NewUser;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/roles", get(list_roles))
        .route("/:id", get(get_user).put(update_user).delete(deactivate_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.visibility();
    let items: Vec<dto::UserView> = services
        .directory
        .users()
        .filter(|u| common::user_in_scope(&scope, u))
        .into_iter()
        .map(|u| {
            let role = services.directory.role_name(u.role_id).unwrap_or_default();
            dto::user_view(u, role)
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }
    if body.username.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "username must not be empty",
        );
    }
    if body.password.len() < 8 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password must be at least 8 characters",
        );
    }

    // Org-scoped callers always create into their own org.
    let org_id = context.org_id().or(body.org_id);

    let created = services.directory.create_user(NewUser {
        username: body.username,
        full_name: body.full_name,
        email: body.email,
        role_id: body.role_id,
        org_id,
        default_team_id: body.default_team_id,
        password_hash: hash_password(&body.password),
    });
    let user = match created {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    tracing::info!(username = %user.username, "user created");
    let role = services.directory.role_name(user.role_id).unwrap_or_default();
    (StatusCode::CREATED, Json(dto::user_view(user, role))).into_response()
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.visibility();
    match services.directory.users().get(id) {
        Some(u) if common::user_in_scope(&scope, &u) => {
            let role = services.directory.role_name(u.role_id).unwrap_or_default();
            (StatusCode::OK, Json(dto::user_view(u, role))).into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found"),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.visibility();
    let visible = services
        .directory
        .users()
        .get(id)
        .is_some_and(|u| common::user_in_scope(&scope, &u));
    if !visible {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found");
    }
    if let Some(role_id) = body.role_id {
        if services.directory.roles().get(role_id).is_none() {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "unknown role");
        }
    }

    let updated = services.directory.users().update(id, |u| {
        if let Some(full_name) = body.full_name.clone() {
            u.full_name = full_name;
        }
        if let Some(email) = body.email.clone() {
            u.email = email;
        }
        if let Some(role_id) = body.role_id {
            u.role_id = role_id;
        }
        if let Some(team) = body.default_team_id {
            u.default_team_id = Some(team);
        }
    });
    match updated {
        Some(u) => {
            let role = services.directory.role_name(u.role_id).unwrap_or_default();
            (StatusCode::OK, Json(dto::user_view(u, role))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found"),
    }
}

pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.visibility();
    let visible = services
        .directory
        .users()
        .get(id)
        .is_some_and(|u| common::user_in_scope(&scope, &u));
    if !visible {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found");
    }

    services.directory.users().update(id, |u| u.active = false);
    tracing::info!(user_id = %id, "user deactivated");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "user deactivated"})),
    )
        .into_response()
}

/// GET /api/v1/users/roles - role definitions visible in the caller's
/// scope: global roles plus the team roles of teams in the caller's org.
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let scope = context.visibility();
    let team_ids: BTreeSet<TeamId> = services
        .directory
        .teams()
        .filter(|t| scope.permits_org(t.org_id))
        .into_iter()
        .map(|t| t.id)
        .collect();

    let items: Vec<dto::RoleView> = services
        .directory
        .roles()
        .filter(|r| match r.team_id {
            None => true,
            Some(team) => team_ids.contains(&team),
        })
        .into_iter()
        .map(dto::RoleView::from)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
