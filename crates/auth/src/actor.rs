//! Resolved actor identity.
//!
//! An [`Actor`] is the authorization-facing view of a user account: global
//! role, org scope, and team memberships, fully loaded. Construction is the
//! directory's job; nothing here touches storage or transport.

use serde::{Deserialize, Serialize};

use flowdeck_core::{OrgId, TeamId, UserId};

/// One (user, team, role) membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: TeamId,
    pub role_name: String,
    pub active: bool,
}

/// A resolved user identity with role and memberships eagerly loaded.
///
/// The context builder and the gate assume the membership list is complete;
/// a partially loaded actor silently under-grants, so directories must
/// always attach every membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub active: bool,
    /// Global role name (platform scope).
    pub role_name: String,
    /// Owning organization; `None` means platform-wide scope.
    pub org_id: Option<OrgId>,
    /// Team the actor lands in when no explicit focus is requested.
    pub default_team_id: Option<TeamId>,
    pub memberships: Vec<TeamMembership>,
}

impl Actor {
    /// The active membership for `team_id`, if any.
    pub fn active_membership(&self, team_id: TeamId) -> Option<&TeamMembership> {
        self.memberships
            .iter()
            .find(|m| m.active && m.team_id == team_id)
    }

    /// Whether `team_id` is a valid focus target for this actor.
    pub fn can_focus(&self, team_id: TeamId) -> bool {
        self.active_membership(team_id).is_some()
    }
}
