//! First-start provisioning and the local-development demo fixture.

use chrono::{Duration, Utc};
use serde_json::json;

use flowdeck_auth::{
    PLATFORM_ADMIN_ROLE, PLATFORM_ANALYST_ROLE, PLATFORM_DEVELOPER_ROLE, SYSTEM_AUTHOR,
    hash_password,
};
use flowdeck_core::{DomainResult, RoleId};

use crate::directory::{Directory, NewUser};
use crate::records::{
    ConnectionRecord, LocationRecord, PipelineRecord, RoleRecord, RunRecord, RunState,
    ScheduleRecord, UserRecord,
};

pub const ADMIN_USERNAME: &str = "admin";
/// Dev-only password for every seeded account, the platform admin included.
pub const DEMO_PASSWORD: &str = "flowdeck-dev";

/// Provision the three platform roles and the platform admin account.
///
/// Safe to call repeatedly; existing rows are left alone.
pub fn bootstrap(directory: &Directory, admin_password: &str) -> DomainResult<UserRecord> {
    let platform_roles = [
        (PLATFORM_ADMIN_ROLE, "Platform administrator"),
        (PLATFORM_DEVELOPER_ROLE, "Pipeline developer"),
        (PLATFORM_ANALYST_ROLE, "Telemetry viewer"),
    ];
    for (name, description) in platform_roles {
        if directory.find_role_by_name(name).is_none() {
            directory.roles().insert_with(|id| RoleRecord {
                id,
                name: name.to_string(),
                description: description.to_string(),
                team_id: None,
                created_by: SYSTEM_AUTHOR.to_string(),
            });
        }
    }

    if let Some(existing) = directory.find_user_by_username(ADMIN_USERNAME) {
        return Ok(existing);
    }
    let admin_role = directory
        .find_role_by_name(PLATFORM_ADMIN_ROLE)
        .map(|r| r.id)
        .unwrap_or(RoleId::from_i64(1));
    directory.create_user(NewUser {
        username: ADMIN_USERNAME.to_string(),
        full_name: "Platform Admin".to_string(),
        email: "admin@flowdeck.local".to_string(),
        role_id: admin_role,
        org_id: None,
        default_team_id: None,
        password_hash: hash_password(admin_password),
    })
}

/// Populate the demo org used by local development and the API tests.
///
/// Layout: org `ACME` with teams `Data Ops` and `Analytics`; users `dev`
/// (developer, RW in Data Ops), `analyst` (analyst, reader in Analytics),
/// `lead` (lead in Data Ops, RW in Analytics), and the deactivated
/// `ghost`. All accounts use [`DEMO_PASSWORD`].
pub fn seed_demo(directory: &Directory) -> DomainResult<()> {
    let developer_role = directory
        .find_role_by_name(PLATFORM_DEVELOPER_ROLE)
        .map(|r| r.id)
        .unwrap_or(RoleId::from_i64(2));
    let analyst_role = directory
        .find_role_by_name(PLATFORM_ANALYST_ROLE)
        .map(|r| r.id)
        .unwrap_or(RoleId::from_i64(3));

    let org = directory.create_org("Acme Analytics", "ACME")?;
    let (data_ops, data_ops_roles) = directory.create_team("Data Ops", org.id)?;
    let (analytics, analytics_roles) = directory.create_team("Analytics", org.id)?;

    let password_hash = hash_password(DEMO_PASSWORD);
    let dev = directory.create_user(NewUser {
        username: "dev".to_string(),
        full_name: "Devon Rivera".to_string(),
        email: "dev@acme.test".to_string(),
        role_id: developer_role,
        org_id: Some(org.id),
        default_team_id: Some(data_ops.id),
        password_hash: password_hash.clone(),
    })?;
    let analyst = directory.create_user(NewUser {
        username: "analyst".to_string(),
        full_name: "Ana List".to_string(),
        email: "analyst@acme.test".to_string(),
        role_id: analyst_role,
        org_id: Some(org.id),
        default_team_id: None,
        password_hash: password_hash.clone(),
    })?;
    let lead = directory.create_user(NewUser {
        username: "lead".to_string(),
        full_name: "Lee Drummond".to_string(),
        email: "lead@acme.test".to_string(),
        role_id: developer_role,
        org_id: Some(org.id),
        default_team_id: Some(data_ops.id),
        password_hash: password_hash.clone(),
    })?;
    let ghost = directory.create_user(NewUser {
        username: "ghost".to_string(),
        full_name: "Gone Person".to_string(),
        email: "ghost@acme.test".to_string(),
        role_id: analyst_role,
        org_id: Some(org.id),
        default_team_id: None,
        password_hash,
    })?;
    directory.users().update(ghost.id, |u| u.active = false);

    // data_ops_roles / analytics_roles are [LEAD, RW, READER].
    directory.add_member(data_ops.id, dev.id, data_ops_roles[1].id)?;
    directory.add_member(analytics.id, analyst.id, analytics_roles[2].id)?;
    directory.add_member(data_ops.id, lead.id, data_ops_roles[0].id)?;
    directory.add_member(analytics.id, lead.id, analytics_roles[1].id)?;

    directory.connections().insert_with(|id| ConnectionRecord {
        id,
        name: "warehouse-prod".to_string(),
        kind: "snowflake".to_string(),
        config: json!({"account": "acme-prod", "warehouse": "REPORTING"}),
        org_id: org.id,
        team_id: data_ops.id,
    });
    directory.connections().insert_with(|id| ConnectionRecord {
        id,
        name: "events-s3".to_string(),
        kind: "s3".to_string(),
        config: json!({"bucket": "acme-events"}),
        org_id: org.id,
        team_id: analytics.id,
    });

    let pipelines_repo = directory.locations().insert_with(|id| LocationRecord {
        id,
        name: "acme-pipelines".to_string(),
        repo_url: "https://git.acme.test/data/pipelines.git".to_string(),
        branch: "main".to_string(),
        org_id: org.id,
        team_id: data_ops.id,
    });
    let analytics_repo = directory.locations().insert_with(|id| LocationRecord {
        id,
        name: "acme-analytics".to_string(),
        repo_url: "https://git.acme.test/data/analytics.git".to_string(),
        branch: "main".to_string(),
        org_id: org.id,
        team_id: analytics.id,
    });

    let nightly = directory.schedules().insert_with(|id| ScheduleRecord {
        id,
        slug: "orders-nightly".to_string(),
        cron: "0 2 * * *".to_string(),
        timezone: "UTC".to_string(),
        org_id: org.id,
        team_id: data_ops.id,
    });
    directory.schedules().insert_with(|id| ScheduleRecord {
        id,
        slug: "events-hourly".to_string(),
        cron: "0 * * * *".to_string(),
        timezone: "UTC".to_string(),
        org_id: org.id,
        team_id: analytics.id,
    });

    directory.pipelines().insert_with(|id| PipelineRecord {
        id,
        name: "orders_daily".to_string(),
        description: Some("Nightly orders ingest".to_string()),
        org_id: org.id,
        team_id: data_ops.id,
        location_id: Some(pipelines_repo.id),
        schedule_id: Some(nightly.id),
    });
    directory.pipelines().insert_with(|id| PipelineRecord {
        id,
        name: "customer_dimension".to_string(),
        description: None,
        org_id: org.id,
        team_id: data_ops.id,
        location_id: Some(pipelines_repo.id),
        schedule_id: None,
    });
    directory.pipelines().insert_with(|id| PipelineRecord {
        id,
        name: "events_hourly".to_string(),
        description: Some("Clickstream sessionization".to_string()),
        org_id: org.id,
        team_id: analytics.id,
        location_id: Some(analytics_repo.id),
        schedule_id: None,
    });

    let now = Utc::now();
    directory.runs().insert_with(|id| RunRecord {
        id,
        batch: 118,
        pipeline_name: "orders_daily".to_string(),
        state: RunState::Completed,
        started_at: now - Duration::hours(2),
        finished_at: Some(now - Duration::minutes(110)),
        org_id: org.id,
        team_id: data_ops.id,
    });
    directory.runs().insert_with(|id| RunRecord {
        id,
        batch: 119,
        pipeline_name: "orders_daily".to_string(),
        state: RunState::Failed,
        started_at: now - Duration::minutes(10),
        finished_at: Some(now - Duration::minutes(8)),
        org_id: org.id,
        team_id: data_ops.id,
    });
    directory.runs().insert_with(|id| RunRecord {
        id,
        batch: 91,
        pipeline_name: "events_hourly".to_string(),
        state: RunState::Running,
        started_at: now - Duration::minutes(5),
        finished_at: None,
        org_id: org.id,
        team_id: analytics.id,
    });
    directory.runs().insert_with(|id| RunRecord {
        id,
        batch: 90,
        pipeline_name: "events_hourly".to_string(),
        state: RunState::Failed,
        started_at: now - Duration::hours(30),
        finished_at: Some(now - Duration::hours(29)),
        org_id: org.id,
        team_id: analytics.id,
    });

    Ok(())
}
