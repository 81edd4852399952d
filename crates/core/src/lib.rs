//! `flowdeck-core`: shared control-plane primitives.
//!
//! Typed identifiers and the domain error model. Pure types only, no
//! infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{
    ConnectionId, LocationId, MembershipId, OrgId, PipelineId, RoleId, RunId, ScheduleId, TeamId,
    UserId,
};
