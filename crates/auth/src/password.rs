//! Password hashing.
//!
//! PBKDF2-HMAC-SHA256 with a per-hash random salt, stored as
//! `pbkdf2-sha256$<iterations>$<salt-hex>$<digest-hex>`. The iteration count
//! is recorded in the hash so it can be raised without invalidating stored
//! credentials.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use uuid::Uuid;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 10_000;
const DIGEST_LEN: usize = 32;

/// Hash a raw password with a fresh salt.
pub fn hash_password(raw: &str) -> String {
    let salt = Uuid::now_v7().into_bytes();
    let digest = derive(raw, &salt, ITERATIONS);
    format!(
        "{SCHEME}${ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Verify a raw password against a stored hash.
///
/// Any malformed stored value verifies as false; a login must never succeed
/// because a hash failed to parse.
pub fn verify_password(raw: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(digest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(digest)) else {
        return false;
    };
    if expected.len() != DIGEST_LEN {
        return false;
    }

    let actual = derive(raw, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

fn derive(raw: &str, salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(raw.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
