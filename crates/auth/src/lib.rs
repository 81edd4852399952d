//! `flowdeck-auth`: the authorization and tenant-scoping core.
//!
//! Pure policy plus the credential boundary, decoupled from HTTP and
//! storage: capability flags, the role → capability mapping, token
//! issue/verify, actor resolution, and the per-request [`TenantContext`]
//! with its row-filtering contract.

pub mod actor;
pub mod capability;
pub mod context;
pub mod identity;
pub mod password;
pub mod roles;
pub mod token;

pub use actor::{Actor, TeamMembership};
pub use capability::Capability;
pub use context::{ScopeFilter, TeamScope, TenantContext};
pub use identity::{ActorDirectory, AuthError, Authentication, DirectoryError, IdentityResolver};
pub use password::{hash_password, verify_password};
pub use roles::{
    PLATFORM_ADMIN_ROLE, PLATFORM_ANALYST_ROLE, PLATFORM_DEVELOPER_ROLE, SYSTEM_AUTHOR,
    TEAM_LEAD_SUFFIX, TEAM_READ_ONLY_SUFFIX, TEAM_READ_WRITE_SUFFIX, TeamRoleTemplate,
    capabilities_for, default_team_roles, normalize_team_name,
};
pub use token::{AccessClaims, Hs256TokenCodec, TokenError, TokenVerifier, validate_claims};
