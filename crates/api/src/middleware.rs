use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use flowdeck_auth::{AuthError, IdentityResolver, TenantContext};
use flowdeck_core::TeamId;

use crate::app::errors;
use crate::context::CurrentUser;

/// Per-request team focus override; wins over the token's `team_id` claim.
pub const TEAM_FOCUS_HEADER: &str = "x-team-id";

#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<IdentityResolver>,
}

/// Authenticate the request and attach the authorization snapshot.
///
/// On success the request carries a [`TenantContext`] and a [`CurrentUser`]
/// extension. A focus override naming a team the actor has no active
/// membership in is rejected here; the builder alone would only ignore it.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?;

    let auth = state
        .resolver
        .resolve(token)
        .map_err(errors::auth_error_to_response)?;

    let focus = requested_focus(req.headers(), auth.claims.team_id)?;
    if let Some(team) = focus {
        if !auth.actor.can_focus(team) {
            return Err(errors::auth_error_to_response(
                AuthError::InvalidFocusOverride(team),
            ));
        }
    }

    let context = TenantContext::build(&auth.actor, focus);
    req.extensions_mut().insert(context);
    req.extensions_mut().insert(CurrentUser::new(auth.actor));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing_credentials)?;

    let header = header.to_str().map_err(|_| missing_credentials())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing_credentials)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing_credentials());
    }

    Ok(token)
}

fn missing_credentials() -> Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "missing or malformed bearer token",
    )
}

/// The requested team focus: the `X-Team-Id` header when present, else the
/// token's `team_id` claim.
fn requested_focus(
    headers: &HeaderMap,
    claim: Option<TeamId>,
) -> Result<Option<TeamId>, Response> {
    let Some(raw) = headers.get(TEAM_FOCUS_HEADER) else {
        return Ok(claim);
    };
    let team = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "X-Team-Id must be an integer team id",
            )
        })?;
    Ok(Some(TeamId::from_i64(team)))
}
