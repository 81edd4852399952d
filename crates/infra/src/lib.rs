//! Infrastructure layer: catalog stores, the control-plane directory,
//! seeding, and the Postgres actor directory.

pub mod catalog;
pub mod directory;
pub mod pg;
pub mod records;
pub mod seed;

pub use catalog::Catalog;
pub use directory::{Directory, NewUser};
pub use pg::PgActorDirectory;
pub use records::{
    ConnectionRecord, LocationRecord, MembershipRecord, OrgRecord, PipelineRecord, RoleRecord,
    RunRecord, RunState, ScheduleRecord, TeamRecord, UserRecord,
};
pub use seed::{ADMIN_USERNAME, DEMO_PASSWORD, bootstrap, seed_demo};
