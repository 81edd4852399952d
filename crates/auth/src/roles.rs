//! Role naming conventions and the role → capability mapping.
//!
//! Two families of roles exist. Platform roles are a fixed set of names
//! granted as a user's global role. Team roles are provisioned automatically
//! when a team is created, named `{NORMALIZED_TEAM}{SUFFIX}`; the suffix
//! encodes the access level and is what [`capabilities_for`] matches on.

use crate::capability::Capability;

/// Global role with unrestricted platform access.
pub const PLATFORM_ADMIN_ROLE: &str = "DPE_PLATFORM_ADMIN";
/// Global role for pipeline developers.
pub const PLATFORM_DEVELOPER_ROLE: &str = "DPE_DEVELOPER";
/// Global role for read-only analysts.
pub const PLATFORM_ANALYST_ROLE: &str = "DPE_DATA_ANALYST";

/// Suffix of the auto-provisioned team lead role.
pub const TEAM_LEAD_SUFFIX: &str = "_LEAD";
/// Suffix of the auto-provisioned read-write team role.
pub const TEAM_READ_WRITE_SUFFIX: &str = "_RW";
/// Suffix of the auto-provisioned read-only team role.
pub const TEAM_READ_ONLY_SUFFIX: &str = "_READER";

/// Author tag recorded on auto-provisioned role rows.
pub const SYSTEM_AUTHOR: &str = "SYSTEM";

/// Map a role name to the capability set it grants.
///
/// Rules are evaluated in precedence order; the first match wins. Matching
/// is case-sensitive against the exact provisioning conventions above. An
/// unrecognized role falls through to the minimal telemetry grant, so the
/// result is never empty.
pub fn capabilities_for(role_name: &str) -> Capability {
    if role_name == PLATFORM_ADMIN_ROLE {
        return Capability::all();
    }
    if role_name.contains(TEAM_LEAD_SUFFIX) {
        return Capability::VIEW_TELEMETRY
            | Capability::EDIT_PIPELINES
            | Capability::MANAGE_CONNECTIONS
            | Capability::MANAGE_USERS;
    }
    if role_name.contains(TEAM_READ_WRITE_SUFFIX) || role_name == PLATFORM_DEVELOPER_ROLE {
        return Capability::VIEW_TELEMETRY | Capability::EDIT_PIPELINES;
    }
    if role_name.contains(TEAM_READ_ONLY_SUFFIX) || role_name == PLATFORM_ANALYST_ROLE {
        return Capability::VIEW_TELEMETRY;
    }
    Capability::VIEW_TELEMETRY
}

/// Normalize a team name for use in role names: trim, upper-case, and join
/// whitespace runs with single underscores.
pub fn normalize_team_name(team_name: &str) -> String {
    team_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Template for one auto-provisioned team role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoleTemplate {
    pub name: String,
    pub description: &'static str,
}

/// The three role rows provisioned when a team is created.
pub fn default_team_roles(team_name: &str) -> [TeamRoleTemplate; 3] {
    let base = normalize_team_name(team_name);
    [
        TeamRoleTemplate {
            name: format!("{base}{TEAM_LEAD_SUFFIX}"),
            description: "Can manage connections and users",
        },
        TeamRoleTemplate {
            name: format!("{base}{TEAM_READ_WRITE_SUFFIX}"),
            description: "Can manage pipelines and schedules",
        },
        TeamRoleTemplate {
            name: format!("{base}{TEAM_READ_ONLY_SUFFIX}"),
            description: "Can view runs and history",
        },
    ]
}
