//! Password hashing with PBKDF2-HMAC-SHA256
//!
//! Stored form: base64 of `salt (16 bytes) || hash (32 bytes)`, derived with
//! 100 000 iterations. Existing account records use this exact layout.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const ITERATIONS: u32 = 100_000;

fn derive(password: &str, salt: &[u8]) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut out);
    out
}

/// Compare two byte strings in time independent of where they differ
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let hash = derive(password, &salt);

    let mut combined = Vec::with_capacity(SALT_LEN + HASH_LEN);
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&hash);
    STANDARD.encode(combined)
}

/// Verify a password against a stored hash
///
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(combined) = STANDARD.decode(stored) else {
        return false;
    };
    if combined.len() != SALT_LEN + HASH_LEN {
        return false;
    }
    let (salt, expected) = combined.split_at(SALT_LEN);
    constant_time_eq(&derive(password, salt), expected)
}
