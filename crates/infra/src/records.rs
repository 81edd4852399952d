//! Stored rows for the portal directory.
//!
//! Persistence-facing shapes only. API responses are separate view structs
//! built by copying fields out of these records; handlers never mutate a
//! record to shape a response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowdeck_core::{
    ConnectionId, LocationId, MembershipId, OrgId, PipelineId, RoleId, RunId, ScheduleId, TeamId,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRecord {
    pub id: OrgId,
    pub name: String,
    /// Unique short code, e.g. `ACME`.
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    pub org_id: OrgId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    /// `None` for global roles, the owning team for provisioned team roles.
    pub team_id: Option<TeamId>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub active: bool,
    /// Global role reference.
    pub role_id: RoleId,
    /// `None` means platform-wide scope.
    pub org_id: Option<OrgId>,
    pub default_team_id: Option<TeamId>,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub id: MembershipId,
    pub user_id: UserId,
    pub team_id: TeamId,
    pub role_id: RoleId,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub name: String,
    /// Connector kind, e.g. `postgres`, `s3`.
    pub kind: String,
    pub config: serde_json::Value,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: PipelineId,
    pub name: String,
    pub description: Option<String>,
    pub org_id: OrgId,
    pub team_id: TeamId,
    pub location_id: Option<LocationId>,
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: ScheduleId,
    pub slug: String,
    pub cron: String,
    pub timezone: String,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub name: String,
    pub repo_url: String,
    pub branch: String,
    pub org_id: OrgId,
    pub team_id: TeamId,
}

/// State of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    /// Batch number grouping runs launched together.
    pub batch: i64,
    pub pipeline_name: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub org_id: OrgId,
    pub team_id: TeamId,
}
