use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use flowdeck_auth::{TenantContext, hash_password, verify_password};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentUser;

/// POST /api/v1/auth/login (no auth).
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let directory = &services.directory;

    let Some(user) = directory.find_user_by_username(&body.username) else {
        return bad_credentials();
    };
    if !verify_password(&body.password, &user.password_hash) {
        return bad_credentials();
    }
    if !user.active {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "inactive_user",
            "user account is deactivated",
        );
    }

    // Only a currently valid default team travels as the token's focus.
    let team_focus = user.default_team_id.filter(|team| {
        directory
            .memberships_for(user.id)
            .iter()
            .any(|m| m.active && m.team_id == *team)
    });
    let org_code = user
        .org_id
        .and_then(|id| directory.orgs().get(id))
        .map(|o| o.code);

    let token = match services
        .tokens
        .issue(&user.username, user.org_id, org_code, team_focus)
    {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "token signing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "could not issue a token",
            );
        }
    };

    tracing::info!(username = %user.username, "login");
    (
        StatusCode::OK,
        Json(dto::TokenResponse {
            access_token: token,
            token_type: "bearer",
        }),
    )
        .into_response()
}

fn bad_credentials() -> axum::response::Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "incorrect username or password",
    )
}

/// GET /api/v1/auth/me - profile plus the aggregated permission sets.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    let Some(record) = services.directory.users().get(user.user_id()) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found");
    };
    let org_code = record
        .org_id
        .and_then(|id| services.directory.orgs().get(id))
        .map(|o| o.code);

    let profile = dto::ProfileView {
        id: record.id,
        username: record.username,
        full_name: record.full_name,
        email: record.email,
        active: record.active,
        role: user.actor().role_name.clone(),
        org_id: record.org_id,
        org_code,
        default_team_id: record.default_team_id,
        global_capabilities: context.global_capabilities().names(),
        team_capabilities: context
            .team_capabilities()
            .iter()
            .map(|(team, caps)| (*team, caps.names()))
            .collect(),
    };
    (StatusCode::OK, Json(profile)).into_response()
}

/// POST /api/v1/auth/password - change own password.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> axum::response::Response {
    let Some(record) = services.directory.users().get(user.user_id()) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "User not found");
    };
    if !verify_password(&body.current_password, &record.password_hash) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "current password is incorrect",
        );
    }
    if body.new_password.len() < 8 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "new password must be at least 8 characters",
        );
    }

    services
        .directory
        .users()
        .update(record.id, |u| u.password_hash = hash_password(&body.new_password));
    tracing::info!(username = %user.username(), "password changed");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "password updated"})),
    )
        .into_response()
}
