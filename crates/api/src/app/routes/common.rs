//! Helpers shared by the route modules.

use axum::http::StatusCode;

use flowdeck_auth::{ScopeFilter, TenantContext};
use flowdeck_core::TeamId;
use flowdeck_infra::{TeamRecord, UserRecord};

use crate::app::errors;
use crate::app::services::AppServices;

/// Whether a user row passes `scope`'s org dimension. Platform rows (no
/// org) are visible to platform-scoped callers only.
pub fn user_in_scope(scope: &ScopeFilter, user: &UserRecord) -> bool {
    match user.org_id {
        Some(org) => scope.permits_org(org),
        None => scope.org().is_none(),
    }
}

/// Look up the team a mutation targets. A team outside the caller's org
/// scope reads as absent, so cross-org probes cannot tell "wrong org"
/// from "no such team".
pub fn target_team(
    services: &AppServices,
    context: &TenantContext,
    team_id: TeamId,
) -> Result<TeamRecord, axum::response::Response> {
    let team = services
        .directory
        .teams()
        .get(team_id)
        .ok_or_else(team_not_found)?;
    if !context.visibility().permits_org(team.org_id) {
        return Err(team_not_found());
    }
    Ok(team)
}

fn team_not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "Team not found")
}
