use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use flowdeck_auth::{
    Capability, PLATFORM_ADMIN_ROLE, PLATFORM_ANALYST_ROLE, TEAM_LEAD_SUFFIX,
    TEAM_READ_ONLY_SUFFIX, TEAM_READ_WRITE_SUFFIX, TenantContext,
};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/access-matrix", get(access_matrix))
        .route("/access-matrix.csv", get(access_matrix_csv))
}

/// GET /api/v1/reports/access-matrix - who can do what, one row per grant.
pub async fn access_matrix(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let rows = matrix_rows(&services, &context);
    (StatusCode::OK, Json(serde_json::json!({ "rows": rows }))).into_response()
}

/// GET /api/v1/reports/access-matrix.csv - the same matrix as a download.
pub async fn access_matrix_csv(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<TenantContext>,
) -> axum::response::Response {
    if let Err(e) = context.require(Capability::MANAGE_USERS) {
        return errors::auth_error_to_response(e);
    }

    let rows = matrix_rows(&services, &context);
    let bytes = match render_csv(&rows) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "access matrix export failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "could not render the access matrix",
            );
        }
    };

    let scope_tag = context
        .org_id()
        .and_then(|org| services.directory.orgs().get(org))
        .map(|org| org.code.to_lowercase())
        .unwrap_or_else(|| "platform".to_string());
    let disposition = format!("attachment; filename=\"access_matrix_{scope_tag}.csv\"");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// One Global row per visible user plus one row per active membership.
fn matrix_rows(services: &AppServices, context: &TenantContext) -> Vec<dto::AccessMatrixRow> {
    let scope = context.visibility();
    let mut rows = Vec::new();

    for user in services
        .directory
        .users()
        .filter(|u| common::user_in_scope(&scope, u))
    {
        let role = services
            .directory
            .role_name(user.role_id)
            .unwrap_or_default();
        rows.push(dto::AccessMatrixRow {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            scope: "Global".to_string(),
            role: role.clone(),
            level: global_level(&role).to_string(),
        });

        for membership in services
            .directory
            .memberships()
            .filter(|m| m.user_id == user.id && m.active)
        {
            let team = services
                .directory
                .teams()
                .get(membership.team_id)
                .map(|t| t.name)
                .unwrap_or_default();
            let role = services
                .directory
                .role_name(membership.role_id)
                .unwrap_or_default();
            rows.push(dto::AccessMatrixRow {
                username: user.username.clone(),
                full_name: user.full_name.clone(),
                scope: team,
                level: membership_level(&role).to_string(),
                role,
            });
        }
    }

    rows
}

fn global_level(role: &str) -> &'static str {
    if role == PLATFORM_ADMIN_ROLE {
        "Admin"
    } else if role.contains(TEAM_READ_ONLY_SUFFIX) || role == PLATFORM_ANALYST_ROLE {
        "Viewer"
    } else {
        "User"
    }
}

fn membership_level(role: &str) -> &'static str {
    if role.contains(TEAM_READ_WRITE_SUFFIX) || role.contains(TEAM_LEAD_SUFFIX) {
        "Write"
    } else {
        "Read"
    }
}

fn render_csv(rows: &[dto::AccessMatrixRow]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {}", e.error()))
}
