//! Signed session tokens for identifying logged-in members
//!
//! A session token names the member's profile id and the time of login. It is handed to the
//! client as a string (session cookie for the web UI, `X-SESSION-TOKEN` header for the API) and
//! signed with the application secret, so the client cannot forge or modify it. The token is
//! stateless: revoking all sessions of a member is done by moving the profile's
//! `sessions_valid_after` timestamp, which is checked by the data_store when creating an
//! [crate::data_store::auth_token::AuthToken] from the session.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken {
    profile_id: Uuid,
    issued_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct SessionTokenPayload {
    #[serde(rename = "p")]
    profile_id: Uuid,
    #[serde(rename = "t")]
    issued_at: i64,
}

impl SessionToken {
    /// Create a new session token for the given member, issued now.
    pub fn new(profile_id: Uuid) -> Self {
        Self::with_issue_time(profile_id, Utc::now())
    }

    pub(crate) fn with_issue_time(profile_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        // Only whole seconds survive the string representation
        let issued_at = DateTime::from_timestamp(issued_at.timestamp(), 0).unwrap_or(issued_at);
        Self {
            profile_id,
            issued_at,
        }
    }

    /// Parse and verify a session token string, created by [Self::as_string] with the same
    /// `secret`.
    ///
    /// Tokens issued more than `max_age` ago are rejected with [SessionError::ExpiredToken].
    pub fn from_string(
        data: &str,
        secret: &str,
        max_age: std::time::Duration,
    ) -> Result<Self, SessionError> {
        let (payload_b64, signature_b64) = data
            .split_once('.')
            .ok_or(SessionError::InvalidTokenStructure)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionError::InvalidTokenStructure)?;
        hmac::verify(&signing_key(secret), payload_b64.as_bytes(), &signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionError::InvalidTokenStructure)?;
        let payload: SessionTokenPayload = serde_json::from_slice(&payload_json)
            .map_err(|_| SessionError::InvalidTokenStructure)?;
        let issued_at = DateTime::from_timestamp(payload.issued_at, 0)
            .ok_or(SessionError::InvalidTokenStructure)?;

        let max_age =
            chrono::Duration::from_std(max_age).map_err(|_| SessionError::ExpiredToken)?;
        if issued_at + max_age < Utc::now() {
            return Err(SessionError::ExpiredToken);
        }

        Ok(Self {
            profile_id: payload.profile_id,
            issued_at,
        })
    }

    /// Serialize and sign the session token with the given `secret`.
    pub fn as_string(&self, secret: &str) -> String {
        let payload = SessionTokenPayload {
            profile_id: self.profile_id,
            issued_at: self.issued_at.timestamp(),
        };
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&payload).expect("Session token payload should be serializable"),
        );
        let signature = hmac::sign(&signing_key(secret), payload_b64.as_bytes());
        format!(
            "{}.{}",
            payload_b64,
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        )
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    InvalidTokenStructure,
    InvalidSignature,
    ExpiredToken,
    /// The token is valid, but the member's sessions have been invalidated after it was issued
    /// (e.g. by a password change) or the member does not exist anymore
    Revoked,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidTokenStructure => f.write_str("Invalid session token structure"),
            SessionError::InvalidSignature => f.write_str("Invalid session token signature"),
            SessionError::ExpiredToken => f.write_str("Session token has expired"),
            SessionError::Revoked => f.write_str("Session has been revoked"),
        }
    }
}
