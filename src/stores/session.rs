// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: who is signed in and their profile projection.
//!
//! State is published as one immutable [`SessionSnapshot`] through a watch
//! channel, so observers never see a half-populated state.
//!
//! Profile self-healing:
//! - No profile row: synthesize one with the welcome bonus and write it in
//!   the background.
//! - Row without a display name: backfill it in the background.

use crate::auth::{AuthProvider, AuthUser, Credentials};
use crate::db::RemoteStore;
use crate::error::Result;
use crate::models::{NewProfile, UserProfile};
use crate::services::background::BestEffort;
use crate::stores::EntitlementStore;
use crate::time_utils::{format_utc_rfc3339, Clock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use validator::Validate;

/// Authentication state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Not yet resolved (app start)
    Unknown,
    Anonymous,
    Authenticated(UserProfile),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Unknown,
            is_loading: true,
        }
    }
}

impl SessionSnapshot {
    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile().is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    remote: Arc<dyn RemoteStore>,
    entitlements: EntitlementStore,
    writer: BestEffort,
    clock: Arc<dyn Clock>,
    welcome_bonus: i32,
    tx: Arc<watch::Sender<SessionSnapshot>>,
    /// Serializes profile fetches (user actions and auth events overlap)
    fetch_lock: Arc<Mutex<()>>,
    /// Bumped by every `clear`; a fetch started under an older value is stale
    generation: Arc<AtomicU64>,
}

/// A resolved profile plus the purchased coupon ids, if they could be read.
struct LoadedProfile {
    profile: UserProfile,
    purchased: Option<Vec<String>>,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        remote: Arc<dyn RemoteStore>,
        entitlements: EntitlementStore,
        writer: BestEffort,
        clock: Arc<dyn Clock>,
        welcome_bonus: i32,
    ) -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            auth,
            remote,
            entitlements,
            writer,
            clock,
            welcome_bonus,
            tx: Arc::new(tx),
            fetch_lock: Arc::new(Mutex::new(())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn publish(&self, state: SessionState) {
        self.tx.send_replace(SessionSnapshot {
            state,
            is_loading: false,
        });
    }

    // ─── Queries ─────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.tx.borrow().profile().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading
    }

    // ─── Profile resolution ──────────────────────────────────────

    /// Resolve the current user and their profile.
    ///
    /// Always ends in `Anonymous` or `Authenticated`. On a remote failure the
    /// state becomes `Anonymous` and the error is returned. If the session is
    /// cleared while the fetch is in flight, its result is dropped.
    pub async fn fetch_profile(&self) -> Result<()> {
        let _guard = self.fetch_lock.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);
        self.tx.send_modify(|s| s.is_loading = true);

        let result = self.load_profile().await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Session cleared during profile fetch, dropping result");
            self.tx
                .send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
            return Ok(());
        }

        match result {
            Ok(Some(LoadedProfile { profile, purchased })) => {
                if let Some(ids) = purchased {
                    self.entitlements.set_purchased_coupons(ids);
                }
                tracing::info!(
                    user_id = %profile.id,
                    star_balance = profile.star_balance,
                    "Session authenticated"
                );
                self.publish(SessionState::Authenticated(profile));
                Ok(())
            }
            Ok(None) => {
                tracing::debug!("No signed-in user");
                self.entitlements.clear();
                self.publish(SessionState::Anonymous);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch profile");
                self.entitlements.clear();
                self.publish(SessionState::Anonymous);
                Err(e)
            }
        }
    }

    async fn load_profile(&self) -> Result<Option<LoadedProfile>> {
        let user = match self.auth.current_user().await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let profile = match self.remote.get_profile(&user.id).await? {
            Some(profile) if profile.needs_display_name() => self.backfill_name(&user, profile),
            Some(profile) => profile,
            None => self.heal_missing_profile(&user),
        };

        let purchased = self.purchased_coupons(&user.id).await;
        Ok(Some(LoadedProfile { profile, purchased }))
    }

    /// Fallback profile for a user without a row; the insert runs in the background.
    fn heal_missing_profile(&self, user: &AuthUser) -> UserProfile {
        let new_profile = NewProfile {
            id: user.id.clone(),
            display_name: user.derived_display_name(),
            star_balance: self.welcome_bonus,
            avatar_url: None,
        };

        tracing::info!(user_id = %user.id, "Profile missing, creating fallback");

        let remote = self.remote.clone();
        let row = new_profile.clone();
        self.writer.spawn("profile_insert", async move {
            remote.insert_profile(&row).await.map(|_| ())
        });

        new_profile.into_profile(format_utc_rfc3339(self.clock.now()))
    }

    fn backfill_name(&self, user: &AuthUser, mut profile: UserProfile) -> UserProfile {
        let name = user.derived_display_name();
        tracing::info!(user_id = %user.id, "Backfilling display name");

        let remote = self.remote.clone();
        let user_id = user.id.clone();
        let stored_name = name.clone();
        self.writer.spawn("display_name_backfill", async move {
            remote.update_display_name(&user_id, &stored_name).await
        });

        profile.display_name = Some(name);
        profile
    }

    /// Purchased coupon ids; `None` keeps the previous set if the query fails.
    async fn purchased_coupons(&self, user_id: &str) -> Option<Vec<String>> {
        match self.remote.purchased_coupon_ids(user_id).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to refresh purchased coupons");
                None
            }
        }
    }

    // ─── Auth actions ────────────────────────────────────────────

    pub async fn sign_in(&self, credentials: Credentials) -> Result<()> {
        credentials.validate()?;
        self.auth.sign_in(&credentials).await?;
        self.fetch_profile().await
    }

    /// Register, create the profile with the welcome bonus, then resolve it.
    ///
    /// A failed profile insert is not fatal: `fetch_profile` heals it.
    pub async fn sign_up(&self, credentials: Credentials, display_name: &str) -> Result<()> {
        credentials.validate()?;
        let user = self.auth.sign_up(&credentials).await?;

        let new_profile = NewProfile {
            id: user.id.clone(),
            display_name: display_name.to_string(),
            star_balance: self.welcome_bonus,
            avatar_url: None,
        };
        if let Err(e) = self.remote.insert_profile(&new_profile).await {
            tracing::warn!(user_id = %user.id, error = %e, "Profile insert after sign-up failed");
        }

        self.fetch_profile().await
    }

    /// Sign out remotely, then clear local state regardless of the outcome.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.auth.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
        }
        self.clear();
        result
    }

    /// Drop the profile and purchased set and become `Anonymous`.
    ///
    /// Any profile fetch still in flight is invalidated.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entitlements.clear();
        self.publish(SessionState::Anonymous);
    }

    // ─── Balance ─────────────────────────────────────────────────

    /// Adjust the cached balance locally. No clamp at zero and no remote
    /// write; saturates at the `i32` bounds.
    pub fn update_star_balance(&self, delta: i32) {
        self.tx.send_if_modified(|s| match &mut s.state {
            SessionState::Authenticated(profile) => {
                profile.star_balance = profile.star_balance.saturating_add(delta);
                true
            }
            _ => false,
        });
    }

    /// Replace the cached balance with a server-confirmed value.
    pub fn apply_confirmed_balance(&self, star_balance: i32) {
        self.tx.send_if_modified(|s| match &mut s.state {
            SessionState::Authenticated(profile) if profile.star_balance != star_balance => {
                profile.star_balance = star_balance;
                true
            }
            _ => false,
        });
    }
}
