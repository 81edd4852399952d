//! Strongly-typed identifiers used across the control plane.
//!
//! Every entity is keyed by a sequential 64-bit integer assigned by the
//! directory (or by the backing database). The newtypes keep org/team/user
//! ids from being interchanged in the scoping code, where a mixup would be
//! a tenant-isolation bug rather than a type error.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! impl_i64_newtype {
    ($(#[$doc:meta])* $t:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(i64);

        impl $t {
            pub const fn from_i64(value: i64) -> Self {
                Self(value)
            }

            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = i64::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_i64_newtype!(
    /// Identifier of an organization (outer tenant boundary).
    OrgId,
    "OrgId"
);
impl_i64_newtype!(
    /// Identifier of a team (inner tenant boundary, owned by an org).
    TeamId,
    "TeamId"
);
impl_i64_newtype!(
    /// Identifier of a user account.
    UserId,
    "UserId"
);
impl_i64_newtype!(
    /// Identifier of a role definition (global or team-bound).
    RoleId,
    "RoleId"
);
impl_i64_newtype!(
    /// Identifier of a team membership row.
    MembershipId,
    "MembershipId"
);
impl_i64_newtype!(
    /// Identifier of a warehouse/service connection.
    ConnectionId,
    "ConnectionId"
);
impl_i64_newtype!(
    /// Identifier of a pipeline definition.
    PipelineId,
    "PipelineId"
);
impl_i64_newtype!(
    /// Identifier of a schedule.
    ScheduleId,
    "ScheduleId"
);
impl_i64_newtype!(
    /// Identifier of a code location (repository checkout).
    LocationId,
    "LocationId"
);
impl_i64_newtype!(
    /// Identifier of a pipeline run record.
    RunId,
    "RunId"
);
