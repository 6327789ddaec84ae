//! Password hashing and password reset tokens, shared by all data_store implementations

use crate::data_store::StoreError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::SecureRandom;
use std::num::NonZeroU32;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const HASH_SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(iterations) => iterations,
    None => panic!("iteration count must not be zero"),
};
const RESET_TOKEN_LENGTH: usize = 32;

/// Validity of a password reset token after its creation
pub const RESET_TOKEN_VALIDITY: chrono::Duration = chrono::Duration::hours(1);

fn random_bytes<const N: usize>() -> Result<[u8; N], StoreError> {
    let mut bytes = [0u8; N];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| StoreError::RandomnessUnavailable)?;
    Ok(bytes)
}

/// Hash a password for storing it in the member's profile, using PBKDF2-HMAC-SHA256 with a random
/// salt.
///
/// The result has the form `pbkdf2-sha256$<iterations>$<salt>$<hash>` (base64url encoded salt and
/// hash), so the iteration count can be raised later without invalidating existing hashes.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = random_bytes::<SALT_LENGTH>()?;
    let mut hash = [0u8; HASH_LENGTH];
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );
    Ok(format!(
        "{}${}${}${}",
        HASH_SCHEME,
        PBKDF2_ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hash)
    ))
}

/// Check a password against a hash created by [hash_password]. An invalid hash (e.g. of a profile
/// created without password) never matches.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let mut parts = hash.split('$');
    let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (URL_SAFE_NO_PAD.decode(salt), URL_SAFE_NO_PAD.decode(expected))
    else {
        return false;
    };
    ring::pbkdf2::verify(
        ring::pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &expected,
    )
    .is_ok()
}

/// Generate a new random password reset token. Returns the token (to be sent to the member) and
/// its digest (to be stored in the database).
pub fn generate_reset_token() -> Result<(String, String), StoreError> {
    let token = URL_SAFE_NO_PAD.encode(random_bytes::<RESET_TOKEN_LENGTH>()?);
    let token_hash = reset_token_hash(&token);
    Ok((token, token_hash))
}

/// Calculate the digest of a password reset token for looking it up in the database
pub fn reset_token_hash(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(ring::digest::digest(&ring::digest::SHA256, token.as_bytes()))
}

/// Normalize an email address for storing and looking up profiles
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
