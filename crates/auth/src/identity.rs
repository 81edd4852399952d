//! Credential → actor resolution and the authentication error taxonomy.

use std::sync::Arc;

use thiserror::Error;

use flowdeck_core::TeamId;

use crate::actor::Actor;
use crate::capability::Capability;
use crate::token::{AccessClaims, TokenVerifier};

/// Failure raised by an actor directory lookup (storage unavailable, query
/// failed). Deliberately opaque: it maps to a server error, never to an
/// authorization decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DirectoryError(pub String);

impl DirectoryError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Lookup seam for resolved actors.
///
/// Implementations must return the actor with role and memberships fully
/// loaded (every membership row, active or not).
pub trait ActorDirectory: Send + Sync {
    fn find_actor(&self, username: &str) -> Result<Option<Actor>, DirectoryError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The credential could not be verified or decoded, or carries no
    /// identity claim.
    #[error("credential could not be verified")]
    InvalidCredential,

    /// The identity claim does not match any stored user.
    #[error("unknown actor")]
    UnknownActor,

    /// The account exists but is deactivated.
    #[error("actor is deactivated")]
    InactiveActor,

    /// The requested team focus is not one of the actor's active
    /// memberships.
    #[error("team {0} is not an active membership of the caller")]
    InvalidFocusOverride(TeamId),

    /// Authenticated but lacking the needed capability.
    #[error("missing capability '{0}'")]
    Forbidden(Capability),

    #[error("actor directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
}

/// Authenticated request identity: the resolved actor plus the verified
/// claims it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub actor: Actor,
    pub claims: AccessClaims,
}

/// Validates a bearer credential and resolves it to an [`Actor`].
pub struct IdentityResolver {
    verifier: Arc<dyn TokenVerifier>,
    directory: Arc<dyn ActorDirectory>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn TokenVerifier>, directory: Arc<dyn ActorDirectory>) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    /// Resolve a credential to an actor, rejecting unverifiable tokens,
    /// unknown accounts, and deactivated accounts.
    pub fn resolve(&self, credential: &str) -> Result<Authentication, AuthError> {
        let claims = self
            .verifier
            .verify(credential)
            .map_err(|_| AuthError::InvalidCredential)?;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        let actor = self
            .directory
            .find_actor(&claims.sub)?
            .ok_or(AuthError::UnknownActor)?;
        if !actor.active {
            tracing::debug!(username = %actor.username, "rejected deactivated account");
            return Err(AuthError::InactiveActor);
        }

        Ok(Authentication { actor, claims })
    }
}
