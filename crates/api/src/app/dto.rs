use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowdeck_core::{LocationId, MembershipId, OrgId, PipelineId, RoleId, ScheduleId, TeamId, UserId};
use flowdeck_infra::{
    ConnectionRecord, LocationRecord, MembershipRecord, OrgRecord, PipelineRecord, RoleRecord,
    RunRecord, RunState, ScheduleRecord, TeamRecord, UserRecord,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role_id: RoleId,
    pub org_id: Option<OrgId>,
    pub default_team_id: Option<TeamId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<RoleId>,
    pub default_team_id: Option<TeamId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    /// Required for platform-wide callers; ignored for org-scoped callers,
    /// whose own org is always used.
    pub org_id: Option<OrgId>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub name: String,
    pub kind: String,
    pub config: Option<serde_json::Value>,
    pub team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConnectionRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePipelineRequest {
    pub name: String,
    pub description: Option<String>,
    pub team_id: TeamId,
    pub location_id: Option<LocationId>,
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePipelineRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location_id: Option<LocationId>,
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub slug: String,
    pub cron: String,
    pub timezone: Option<String>,
    pub team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub cron: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub repo_url: String,
    pub branch: Option<String>,
    pub team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Response views
// -------------------------
//
// Responses never expose stored records directly; each view copies the
// fields it means to publish (user views drop the password hash, joined
// names are computed by the caller).

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub active: bool,
    pub role: String,
    pub org_id: Option<OrgId>,
    pub org_code: Option<String>,
    pub default_team_id: Option<TeamId>,
    pub global_capabilities: Vec<&'static str>,
    pub team_capabilities: BTreeMap<TeamId, Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
pub struct OrgView {
    pub id: OrgId,
    pub name: String,
    pub code: String,
}

impl From<OrgRecord> for OrgView {
    fn from(r: OrgRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            code: r.code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamView {
    pub id: TeamId,
    pub name: String,
    pub org_id: OrgId,
}

impl From<TeamRecord> for TeamView {
    fn from(r: TeamRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            org_id: r.org_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub team_id: Option<TeamId>,
    pub created_by: String,
}

impl From<RoleRecord> for RoleView {
    fn from(r: RoleRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            team_id: r.team_id,
            created_by: r.created_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub active: bool,
    pub role_id: RoleId,
    pub role: String,
    pub org_id: Option<OrgId>,
    pub default_team_id: Option<TeamId>,
}

pub fn user_view(record: UserRecord, role: String) -> UserView {
    UserView {
        id: record.id,
        username: record.username,
        full_name: record.full_name,
        email: record.email,
        active: record.active,
        role_id: record.role_id,
        role,
        org_id: record.org_id,
        default_team_id: record.default_team_id,
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipView {
    pub id: MembershipId,
    pub user_id: UserId,
    pub username: String,
    pub team_id: TeamId,
    pub role_id: RoleId,
    pub role: String,
    pub active: bool,
}

pub fn membership_view(record: MembershipRecord, username: String, role: String) -> MembershipView {
    MembershipView {
        id: record.id,
        user_id: record.user_id,
        username,
        team_id: record.team_id,
        role_id: record.role_id,
        role,
        active: record.active,
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub id: flowdeck_core::ConnectionId,
    pub name: String,
    pub kind: String,
    pub config: serde_json::Value,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

impl From<ConnectionRecord> for ConnectionView {
    fn from(r: ConnectionRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            kind: r.kind,
            config: r.config,
            org_id: r.org_id,
            team_id: r.team_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineView {
    pub id: PipelineId,
    pub name: String,
    pub description: Option<String>,
    pub org_id: OrgId,
    pub team_id: TeamId,
    pub location_id: Option<LocationId>,
    pub schedule_id: Option<ScheduleId>,
}

impl From<PipelineRecord> for PipelineView {
    fn from(r: PipelineRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            org_id: r.org_id,
            team_id: r.team_id,
            location_id: r.location_id,
            schedule_id: r.schedule_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub id: ScheduleId,
    pub slug: String,
    pub cron: String,
    pub timezone: String,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

impl From<ScheduleRecord> for ScheduleView {
    fn from(r: ScheduleRecord) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            cron: r.cron,
            timezone: r.timezone,
            org_id: r.org_id,
            team_id: r.team_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RepositoryView {
    pub id: LocationId,
    pub name: String,
    pub repo_url: String,
    pub branch: String,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

impl From<LocationRecord> for RepositoryView {
    fn from(r: LocationRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            repo_url: r.repo_url,
            branch: r.branch,
            org_id: r.org_id,
            team_id: r.team_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunView {
    pub id: flowdeck_core::RunId,
    pub batch: i64,
    pub pipeline: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub team_id: TeamId,
}

impl From<RunRecord> for RunView {
    fn from(r: RunRecord) -> Self {
        Self {
            id: r.id,
            batch: r.batch,
            pipeline: r.pipeline_name,
            state: r.state,
            started_at: r.started_at,
            finished_at: r.finished_at,
            team_id: r.team_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub connections: usize,
    pub pipelines: usize,
    pub schedules: usize,
    pub active_runs: usize,
    pub failed_today: usize,
}

/// One grant in the access-matrix report. `scope` is `Global` or a team
/// name; `level` is Admin/Viewer/User for global rows and Write/Read for
/// membership rows.
#[derive(Debug, Serialize)]
pub struct AccessMatrixRow {
    pub username: String,
    pub full_name: String,
    pub scope: String,
    pub role: String,
    pub level: String,
}
