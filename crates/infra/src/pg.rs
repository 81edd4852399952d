//! Postgres-backed actor directory.
//!
//! Loads the portal's user, role, and membership rows from PostgreSQL and
//! assembles them into [`Actor`] values for the identity resolver. The
//! directory trait is synchronous, so the trait impl bridges onto the
//! ambient tokio runtime; this requires the multi-threaded runtime.

use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use flowdeck_auth::{Actor, ActorDirectory, DirectoryError, TeamMembership};
use flowdeck_core::{OrgId, TeamId, UserId};

/// Actor directory reading from PostgreSQL.
///
/// All lookups join role names in SQL so the resolver never sees raw
/// role ids. The pool is cheap to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct PgActorDirectory {
    pool: Arc<PgPool>,
}

impl PgActorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` with a bounded pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| DirectoryError::new(format!("connect failed: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Load the actor for `username`, memberships included.
    #[instrument(skip(self), err)]
    pub async fn fetch_actor(&self, username: &str) -> Result<Option<Actor>, DirectoryError> {
        let Some(user) = sqlx::query_as::<_, ActorRow>(
            r#"
            SELECT u.id, u.username, u.active, u.org_id, u.default_team_id,
                   r.name AS role_name
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_actor", e))?
        else {
            return Ok(None);
        };

        let memberships = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT m.team_id, r.name AS role_name, m.active
            FROM team_members m
            JOIN roles r ON r.id = m.role_id
            WHERE m.user_id = $1
            ORDER BY m.team_id ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_memberships", e))?;

        Ok(Some(Actor {
            user_id: UserId::from_i64(user.id),
            username: user.username,
            active: user.active,
            role_name: user.role_name,
            org_id: user.org_id.map(OrgId::from_i64),
            default_team_id: user.default_team_id.map(TeamId::from_i64),
            memberships: memberships.into_iter().map(TeamMembership::from).collect(),
        }))
    }
}

#[derive(Debug)]
struct ActorRow {
    id: i64,
    username: String,
    active: bool,
    org_id: Option<i64>,
    default_team_id: Option<i64>,
    role_name: String,
}

impl<'r> FromRow<'r, PgRow> for ActorRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ActorRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            active: row.try_get("active")?,
            org_id: row.try_get("org_id")?,
            default_team_id: row.try_get("default_team_id")?,
            role_name: row.try_get("role_name")?,
        })
    }
}

#[derive(Debug)]
struct MembershipRow {
    team_id: i64,
    role_name: String,
    active: bool,
}

impl<'r> FromRow<'r, PgRow> for MembershipRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MembershipRow {
            team_id: row.try_get("team_id")?,
            role_name: row.try_get("role_name")?,
            active: row.try_get("active")?,
        })
    }
}

impl From<MembershipRow> for TeamMembership {
    fn from(row: MembershipRow) -> Self {
        TeamMembership {
            team_id: TeamId::from_i64(row.team_id),
            role_name: row.role_name,
            active: row.active,
        }
    }
}

impl ActorDirectory for PgActorDirectory {
    fn find_actor(&self, username: &str) -> Result<Option<Actor>, DirectoryError> {
        // The directory trait is synchronous while sqlx is async. Bridge
        // through the current runtime; block_in_place keeps the worker
        // thread from deadlocking and requires the multi-thread runtime.
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            DirectoryError::new(
                "PgActorDirectory requires a running tokio runtime".to_string(),
            )
        })?;
        tokio::task::block_in_place(|| handle.block_on(self.fetch_actor(username)))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::Database(db_err) => DirectoryError::new(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            DirectoryError::new(format!("connection pool closed in {operation}"))
        }
        other => DirectoryError::new(format!("{operation} failed: {other}")),
    }
}
