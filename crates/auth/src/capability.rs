//! Capability flags.
//!
//! The portal grants a small fixed set of capabilities. A role maps to a
//! `Capability` set (see [`crate::roles::capabilities_for`]); every
//! authorization decision is a set test against those flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of capabilities granted to an actor within some scope.
    ///
    /// Capabilities are additive. `PLATFORM_ADMIN` is special: its presence
    /// in any scope satisfies every check (see `TenantContext::has`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capability: u8 {
        /// Read pipeline runs, history, and summary telemetry.
        const VIEW_TELEMETRY     = 1 << 0;
        /// Create and modify pipelines and schedules.
        const EDIT_PIPELINES     = 1 << 1;
        /// Create and modify warehouse/service connections.
        const MANAGE_CONNECTIONS = 1 << 2;
        /// Create teams and administer team structure.
        const MANAGE_TEAMS       = 1 << 3;
        /// Administer user accounts and team memberships.
        const MANAGE_USERS       = 1 << 4;
        /// Unrestricted platform administration.
        const PLATFORM_ADMIN     = 1 << 5;
    }
}

const NAMED: [(Capability, &str); 6] = [
    (Capability::VIEW_TELEMETRY, "view-telemetry"),
    (Capability::EDIT_PIPELINES, "edit-pipelines"),
    (Capability::MANAGE_CONNECTIONS, "manage-connections"),
    (Capability::MANAGE_TEAMS, "manage-teams"),
    (Capability::MANAGE_USERS, "manage-users"),
    (Capability::PLATFORM_ADMIN, "platform-admin"),
];

impl Capability {
    /// Wire names of the flags present in this set, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Parse a single wire name back into its flag.
    pub fn parse(name: &str) -> Option<Capability> {
        NAMED
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(flag, _)| *flag)
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.names().join("|"))
    }
}
