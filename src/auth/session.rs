// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted auth session and access-token claims.

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Claims the client reads from the backend-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (auth user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

impl AccessClaims {
    /// Read claims without verifying the signature.
    ///
    /// The backend verifies every request; the client only needs the
    /// subject and expiry to decide whether a stored session is reusable.
    pub fn decode_unverified(token: &str) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Backend(format!("Malformed access token: {}", e)))
    }
}

/// Tokens for the signed-in user, persisted across launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// Whether the access token should be refreshed before use.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at()
    }

    /// Check a restored session against its own token.
    ///
    /// Returns `false` when the token is unreadable or belongs to a
    /// different user than the stored profile.
    pub fn is_consistent(&self) -> bool {
        match AccessClaims::decode_unverified(&self.access_token) {
            Ok(claims) => claims.sub == self.user.id,
            Err(e) => {
                tracing::warn!(error = %e, "Stored session has unreadable access token");
                false
            }
        }
    }
}
