// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication provider interface.
//!
//! The provider owns the credential protocol and the session tokens; the
//! session store only sees users and auth-state events.

pub mod session;

pub use session::{AccessClaims, Session};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use validator::Validate;

/// Name used when neither metadata nor e-mail yields one.
pub const DEFAULT_DISPLAY_NAME: &str = "Kullanıcı";

/// E-mail/password credentials.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

/// Free-form metadata attached to the auth user at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Authenticated user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// Best available display name: metadata, then e-mail local part.
    pub fn derived_display_name(&self) -> String {
        let from_metadata = self
            .user_metadata
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let from_email = self
            .email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty());

        from_metadata
            .or(from_email)
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_string()
    }
}

/// Auth-state transitions pushed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Password sign-in. Emits `SignedIn`.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser>;

    /// Register a new account. Emits `SignedIn` when a session is issued.
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthUser>;

    /// End the current session. Emits `SignedOut`.
    async fn sign_out(&self) -> Result<()>;

    /// User of the current session, if any.
    async fn current_user(&self) -> Result<Option<AuthUser>>;

    /// Subscribe to auth-state events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: Option<&str>, name: Option<&str>) -> AuthUser {
        AuthUser {
            id: "u1".to_string(),
            email: email.map(String::from),
            user_metadata: UserMetadata {
                display_name: name.map(String::from),
            },
        }
    }

    #[test]
    fn test_derived_name_prefers_metadata() {
        let u = user(Some("ahmet@example.com"), Some("Ahmet Yılmaz"));
        assert_eq!(u.derived_display_name(), "Ahmet Yılmaz");
    }

    #[test]
    fn test_derived_name_falls_back_to_email_local_part() {
        let u = user(Some("ahmet.y@example.com"), Some("   "));
        assert_eq!(u.derived_display_name(), "ahmet.y");
    }

    #[test]
    fn test_derived_name_default() {
        assert_eq!(user(None, None).derived_display_name(), "Kullanıcı");
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("ahmet@example.com", "secret1").validate().is_ok());
        assert!(Credentials::new("not-an-email", "secret1").validate().is_err());
        assert!(Credentials::new("ahmet@example.com", "12345").validate().is_err());
    }
}
