//! Access token claims and the HS256 codec.
//!
//! Claims-window validation is deterministic and clock-injected so it can be
//! unit tested without crypto; signature work is confined to
//! [`Hs256TokenCodec`].

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowdeck_core::{OrgId, TeamId};

/// Claims carried by a portal access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username of the authenticated account.
    pub sub: String,

    /// Owning organization, informational echo of the account state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<OrgId>,

    /// Short org code, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_code: Option<String>,

    /// Default team focus for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token could not be decoded or verified")]
    Malformed,

    #[error("token could not be signed")]
    Signing,
}

/// Deterministically validate the claims time window.
///
/// Signature verification is the codec's job; this checks only the window,
/// against the caller's clock.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Verification seam used by the identity resolver.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

/// HS256 issue/verify codec over a shared secret.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256TokenCodec {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Mint a token for `subject`, stamping the issue/expiry window from the
    /// codec's TTL.
    pub fn issue(
        &self,
        subject: &str,
        org_id: Option<OrgId>,
        org_code: Option<String>,
        team_id: Option<TeamId>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject.to_string(),
            org_id,
            org_code,
            team_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Signing)
    }
}

impl TokenVerifier for Hs256TokenCodec {
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        // The window is checked by `validate_claims` below, leeway-free, so
        // jsonwebtoken's own exp handling is turned off.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Malformed)?;
        validate_claims(&data.claims, Utc::now())?;
        Ok(data.claims)
    }
}
