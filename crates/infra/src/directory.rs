//! The in-memory control-plane directory.
//!
//! One [`Catalog`] per entity plus the cross-entity operations the API
//! needs: actor assembly for the identity resolver, team-role
//! provisioning, and the membership invariants (same org, team-bound
//! role, one active membership per user and team).

use flowdeck_auth::{
    Actor, ActorDirectory, DirectoryError, SYSTEM_AUTHOR, TeamMembership, default_team_roles,
};
use flowdeck_core::{
    ConnectionId, DomainError, DomainResult, LocationId, MembershipId, OrgId, PipelineId, RoleId,
    RunId, ScheduleId, TeamId, UserId,
};

use crate::catalog::Catalog;
use crate::records::{
    ConnectionRecord, LocationRecord, MembershipRecord, OrgRecord, PipelineRecord, RoleRecord,
    RunRecord, ScheduleRecord, TeamRecord, UserRecord,
};

/// Parameters for creating a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role_id: RoleId,
    pub org_id: Option<OrgId>,
    pub default_team_id: Option<TeamId>,
    pub password_hash: String,
}

/// In-memory directory backing the portal.
#[derive(Debug, Default)]
pub struct Directory {
    orgs: Catalog<OrgId, OrgRecord>,
    teams: Catalog<TeamId, TeamRecord>,
    roles: Catalog<RoleId, RoleRecord>,
    users: Catalog<UserId, UserRecord>,
    memberships: Catalog<MembershipId, MembershipRecord>,
    connections: Catalog<ConnectionId, ConnectionRecord>,
    pipelines: Catalog<PipelineId, PipelineRecord>,
    schedules: Catalog<ScheduleId, ScheduleRecord>,
    locations: Catalog<LocationId, LocationRecord>,
    runs: Catalog<RunId, RunRecord>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orgs(&self) -> &Catalog<OrgId, OrgRecord> {
        &self.orgs
    }

    pub fn teams(&self) -> &Catalog<TeamId, TeamRecord> {
        &self.teams
    }

    pub fn roles(&self) -> &Catalog<RoleId, RoleRecord> {
        &self.roles
    }

    pub fn users(&self) -> &Catalog<UserId, UserRecord> {
        &self.users
    }

    pub fn memberships(&self) -> &Catalog<MembershipId, MembershipRecord> {
        &self.memberships
    }

    pub fn connections(&self) -> &Catalog<ConnectionId, ConnectionRecord> {
        &self.connections
    }

    pub fn pipelines(&self) -> &Catalog<PipelineId, PipelineRecord> {
        &self.pipelines
    }

    pub fn schedules(&self) -> &Catalog<ScheduleId, ScheduleRecord> {
        &self.schedules
    }

    pub fn locations(&self) -> &Catalog<LocationId, LocationRecord> {
        &self.locations
    }

    pub fn runs(&self) -> &Catalog<RunId, RunRecord> {
        &self.runs
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<UserRecord> {
        self.users.find(|u| u.username == username)
    }

    pub fn find_role_by_name(&self, name: &str) -> Option<RoleRecord> {
        self.roles.find(|r| r.name == name)
    }

    pub fn role_name(&self, role_id: RoleId) -> Option<String> {
        self.roles.get(role_id).map(|r| r.name)
    }

    /// All membership rows for a user, active or not.
    pub fn memberships_for(&self, user_id: UserId) -> Vec<MembershipRecord> {
        self.memberships.filter(|m| m.user_id == user_id)
    }

    /// Assemble the authorization-facing actor for `username`, with role
    /// names joined in and every membership row attached.
    pub fn resolve_actor(&self, username: &str) -> Option<Actor> {
        let user = self.find_user_by_username(username)?;
        let memberships = self
            .memberships_for(user.id)
            .into_iter()
            .map(|m| TeamMembership {
                team_id: m.team_id,
                role_name: self.role_name(m.role_id).unwrap_or_default(),
                active: m.active,
            })
            .collect();

        Some(Actor {
            user_id: user.id,
            username: user.username,
            active: user.active,
            role_name: self.role_name(user.role_id).unwrap_or_default(),
            org_id: user.org_id,
            default_team_id: user.default_team_id,
            memberships,
        })
    }

    pub fn create_org(&self, name: &str, code: &str) -> DomainResult<OrgRecord> {
        if self.orgs.find(|o| o.code == code).is_some() {
            return Err(DomainError::conflict(format!(
                "organization code '{code}' already exists"
            )));
        }
        Ok(self.orgs.insert_with(|id| OrgRecord {
            id,
            name: name.to_string(),
            code: code.to_string(),
        }))
    }

    /// Create a team and provision its three default roles.
    pub fn create_team(&self, name: &str, org_id: OrgId) -> DomainResult<(TeamRecord, Vec<RoleRecord>)> {
        if self.orgs.get(org_id).is_none() {
            return Err(DomainError::not_found("Organization"));
        }
        let team = self.teams.insert_with(|id| TeamRecord {
            id,
            name: name.to_string(),
            org_id,
        });
        let provisioned = default_team_roles(name)
            .into_iter()
            .map(|template| {
                self.roles.insert_with(|id| RoleRecord {
                    id,
                    name: template.name.clone(),
                    description: template.description.to_string(),
                    team_id: Some(team.id),
                    created_by: SYSTEM_AUTHOR.to_string(),
                })
            })
            .collect();
        Ok((team, provisioned))
    }

    pub fn create_user(&self, new: NewUser) -> DomainResult<UserRecord> {
        if self.find_user_by_username(&new.username).is_some() {
            return Err(DomainError::conflict(format!(
                "username '{}' already exists",
                new.username
            )));
        }
        if self.roles.get(new.role_id).is_none() {
            return Err(DomainError::validation("unknown role"));
        }
        Ok(self.users.insert_with(|id| UserRecord {
            id,
            username: new.username.clone(),
            full_name: new.full_name.clone(),
            email: new.email.clone(),
            active: true,
            role_id: new.role_id,
            org_id: new.org_id,
            default_team_id: new.default_team_id,
            password_hash: new.password_hash.clone(),
        }))
    }

    /// Add a user to a team.
    ///
    /// Enforced here: the team exists, the user exists and belongs to the
    /// team's org, the role is global or bound to that team, and there is
    /// no active membership for the pair yet.
    pub fn add_member(
        &self,
        team_id: TeamId,
        user_id: UserId,
        role_id: RoleId,
    ) -> DomainResult<MembershipRecord> {
        let team = self
            .teams
            .get(team_id)
            .ok_or_else(|| DomainError::not_found("Team"))?;
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| DomainError::not_found("User"))?;
        if user.org_id != Some(team.org_id) {
            return Err(DomainError::validation(
                "user does not belong to the team's organization",
            ));
        }
        let role = self
            .roles
            .get(role_id)
            .ok_or_else(|| DomainError::not_found("Role"))?;
        if role.team_id.is_some_and(|bound| bound != team_id) {
            return Err(DomainError::validation(
                "role is bound to a different team",
            ));
        }
        if self
            .memberships
            .find(|m| m.active && m.user_id == user_id && m.team_id == team_id)
            .is_some()
        {
            return Err(DomainError::conflict(
                "user already has an active membership in this team",
            ));
        }
        Ok(self.memberships.insert_with(|id| MembershipRecord {
            id,
            user_id,
            team_id,
            role_id,
            active: true,
        }))
    }

    /// Deactivate the active membership of `user_id` in `team_id`.
    pub fn deactivate_member(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> Option<MembershipRecord> {
        let membership = self
            .memberships
            .find(|m| m.active && m.user_id == user_id && m.team_id == team_id)?;
        self.memberships.update(membership.id, |m| m.active = false)
    }
}

impl ActorDirectory for Directory {
    fn find_actor(&self, username: &str) -> Result<Option<Actor>, DirectoryError> {
        Ok(self.resolve_actor(username))
    }
}
