//! Login session domain types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Client metadata recorded with a session and replaced on refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

/// One authenticated device/client of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,

    pub candidate_id: Uuid,

    pub access_token: String,

    pub refresh_token: String,

    #[serde(with = "time::serde::rfc3339")]
    pub access_token_expires_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub refresh_token_expires_at: OffsetDateTime,

    #[serde(flatten)]
    pub client: ClientInfo,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Session {
    /// Returns `true` if the access token is past its expiry at `now`.
    #[must_use]
    pub fn is_access_token_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.access_token_expires_at
    }

    /// Returns `true` if the refresh token is past its expiry at `now`.
    #[must_use]
    pub fn is_refresh_token_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.refresh_token_expires_at
    }

    /// Returns `true` if the access token has expired.
    #[must_use]
    pub fn is_access_token_expired(&self) -> bool {
        self.is_access_token_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the refresh token has expired.
    #[must_use]
    pub fn is_refresh_token_expired(&self) -> bool {
        self.is_refresh_token_expired_at(OffsetDateTime::now_utc())
    }
}

/// Login with an email or phone identifier and a password.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Email address or phone number.
    pub identifier: String,
    pub password: String,
    #[serde(flatten)]
    pub client: ClientInfo,
}

/// Exchange a refresh token for a new token pair.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    #[serde(flatten)]
    pub client: ClientInfo,
}
