// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account deletion and onboarding.

use crate::db::{LocalFlags, RemoteStore};
use crate::error::{AppError, Result};
use crate::stores::SessionStore;
use std::sync::Arc;

/// Text the user must type to confirm deletion.
pub const DELETE_CONFIRMATION: &str = "SİL";

#[derive(Clone)]
pub struct AccountService {
    remote: Arc<dyn RemoteStore>,
    session: SessionStore,
    flags: LocalFlags,
}

impl AccountService {
    pub fn new(remote: Arc<dyn RemoteStore>, session: SessionStore, flags: LocalFlags) -> Self {
        Self {
            remote,
            session,
            flags,
        }
    }

    /// Delete the signed-in user's data, then sign out.
    pub async fn delete_account(&self, confirmation: &str) -> Result<()> {
        if confirmation.trim() != DELETE_CONFIRMATION {
            return Err(AppError::Validation(format!(
                "Onaylamak için {} yazın.",
                DELETE_CONFIRMATION
            )));
        }

        let profile = self.session.profile().ok_or(AppError::Unauthorized)?;
        self.remote.delete_account_data(&profile.id).await?;
        tracing::info!(user_id = %profile.id, "Account deleted");

        if let Err(e) = self.session.sign_out().await {
            tracing::warn!(error = %e, "Sign-out after account deletion failed");
        }
        Ok(())
    }

    pub fn onboarding_complete(&self) -> Result<bool> {
        self.flags.onboarding_complete()
    }

    pub fn complete_onboarding(&self) -> Result<()> {
        self.flags.set_onboarding_complete()?;
        tracing::info!("Onboarding completed");
        Ok(())
    }
}
