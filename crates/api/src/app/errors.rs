use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use flowdeck_auth::AuthError;
use flowdeck_core::DomainError;

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        // One shared body: do not reveal whether the token or the account
        // was the problem.
        AuthError::InvalidCredential | AuthError::UnknownActor => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "invalid authentication credentials",
        ),
        AuthError::InactiveActor => json_error(
            StatusCode::BAD_REQUEST,
            "inactive_user",
            "user account is deactivated",
        ),
        AuthError::InvalidFocusOverride(team) => json_error(
            StatusCode::FORBIDDEN,
            "invalid_team_focus",
            format!("team {team} is not an active membership of the caller"),
        ),
        AuthError::Forbidden(capability) => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("missing capability '{capability}'"),
        ),
        AuthError::Directory(e) => {
            tracing::error!(error = %e, "actor directory failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "actor directory unavailable",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(entity) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
