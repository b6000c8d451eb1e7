// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Altılı Zeka: client core for AI-picked horse-race coupons.
//!
//! This crate holds the state a host shell (mobile or web) renders: who is
//! signed in, their star balance, which coupons they have unlocked and
//! which banko picks they revealed today. It talks to the hosted backend,
//! the ad mediation SDK and the store SDK through traits.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
pub mod time_utils;

use auth::{AuthEvent, AuthProvider};
use config::Config;
use db::{LocalFlags, LocalStore, MemoryStore, RedbStore, RemoteStore, SupabaseClient};
use error::Result;
use middleware::RouteGuard;
use services::{
    AccountService, AdMediation, BackgroundFailure, BankoService, BestEffort, CouponService,
    CouponUnlocker, PurchaseAdapter, PurchaseService, RewardedAds, StatsService, WalletService,
};
use std::sync::{Arc, Mutex};
use stores::{EntitlementStore, SessionStore};
use time_utils::{Clock, SystemClock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// External collaborators the application is built on.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub remote: Arc<dyn RemoteStore>,
    pub local: Arc<dyn LocalStore>,
    pub ads: Arc<dyn AdMediation>,
    /// `None` on builds without a store SDK
    pub purchases: Option<Arc<dyn PurchaseAdapter>>,
    pub clock: Arc<dyn Clock>,
}

/// Application container: owns the stores and services for one launch.
pub struct App {
    pub config: Config,
    pub flags: LocalFlags,
    pub session: SessionStore,
    pub entitlements: EntitlementStore,
    pub guard: RouteGuard,
    pub ads: RewardedAds,
    pub purchases: PurchaseService,
    pub unlocker: CouponUnlocker,
    pub banko: BankoService,
    pub coupons: CouponService,
    pub wallet: WalletService,
    pub stats: StatsService,
    pub account: AccountService,
    auth: Arc<dyn AuthProvider>,
    writer: BestEffort,
    listener: Mutex<Option<JoinHandle<()>>>,
    purchase_sync: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(config: Config, deps: Collaborators) -> Self {
        let flags = LocalFlags::new(deps.local);
        let writer = BestEffort::new();

        let entitlements = EntitlementStore::new(deps.remote.clone(), deps.clock.clone());
        let session = SessionStore::new(
            deps.auth.clone(),
            deps.remote.clone(),
            entitlements.clone(),
            writer.clone(),
            deps.clock.clone(),
            config.welcome_bonus,
        );

        let ads = RewardedAds::new(deps.ads, &config);
        let purchases = PurchaseService::new(
            deps.purchases,
            &config,
            deps.remote.clone(),
            session.clone(),
        );

        Self {
            guard: RouteGuard::new(session.clone(), flags.clone()),
            unlocker: CouponUnlocker::new(
                deps.remote.clone(),
                session.clone(),
                entitlements.clone(),
            ),
            banko: BankoService::new(flags.clone(), deps.clock.clone(), ads.clone()),
            coupons: CouponService::new(
                deps.remote.clone(),
                session.clone(),
                entitlements.clone(),
            ),
            wallet: WalletService::new(deps.remote.clone(), session.clone()),
            stats: StatsService::new(deps.remote.clone(), deps.clock),
            account: AccountService::new(deps.remote, session.clone(), flags.clone()),
            config,
            flags,
            session,
            entitlements,
            ads,
            purchases,
            auth: deps.auth,
            writer,
            listener: Mutex::new(None),
            purchase_sync: Mutex::new(None),
        }
    }

    /// Build against the hosted backend with device-local storage.
    ///
    /// Native builds persist flags in a file; web builds keep them in memory.
    pub fn connect(
        config: Config,
        ads: Arc<dyn AdMediation>,
        purchases: Option<Arc<dyn PurchaseAdapter>>,
    ) -> Result<Self> {
        let local: Arc<dyn LocalStore> = if config.platform.is_native() {
            Arc::new(RedbStore::open(&config.local_db_path)?)
        } else {
            Arc::new(MemoryStore::new())
        };

        let backend = Arc::new(SupabaseClient::new(&config, LocalFlags::new(local.clone())));
        tracing::info!(
            platform = ?config.platform,
            backend = %config.supabase_url,
            "Connecting to backend"
        );

        Ok(Self::new(
            config,
            Collaborators {
                auth: backend.clone(),
                remote: backend,
                local,
                ads,
                purchases,
                clock: Arc::new(SystemClock),
            },
        ))
    }

    /// Start the auth-event listener and resolve the initial state.
    ///
    /// Failures of the individual steps are logged; the app stays usable
    /// anonymously. After the purchase SDK is configured it follows the
    /// session user for the rest of the launch.
    pub async fn initialize(&self) {
        self.start_auth_listener();

        if let Err(e) = self.session.fetch_profile().await {
            tracing::warn!(error = %e, "Initial profile fetch failed");
        }

        if let Err(e) = self.entitlements.fetch_today_coupons().await {
            tracing::warn!(error = %e, "Initial coupon fetch failed");
        }

        if let Err(e) = self.ads.initialize().await {
            tracing::warn!(error = %e, "Ad initialization failed");
        }

        let user_id = self.session.profile().map(|p| p.id);
        if let Err(e) = self.purchases.configure(user_id.as_deref()).await {
            tracing::warn!(error = %e, "Purchase SDK configuration failed");
        }
        self.start_purchase_sync();

        tracing::info!(
            authenticated = self.session.is_authenticated(),
            "Application initialized"
        );
    }

    fn start_auth_listener(&self) {
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if listener.is_some() {
            return;
        }

        let mut events = self.auth.subscribe();
        let session = self.session.clone();
        *listener = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn) | Ok(AuthEvent::TokenRefreshed) => {
                        if let Err(e) = session.fetch_profile().await {
                            tracing::warn!(error = %e, "Profile refresh after auth event failed");
                        }
                    }
                    Ok(AuthEvent::SignedOut) => session.clear(),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth events lagged, re-resolving session");
                        if let Err(e) = session.fetch_profile().await {
                            tracing::warn!(error = %e, "Profile refresh after lag failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Auth event listener stopped");
        }));
    }

    /// Reconfigure the purchase SDK whenever the settled session user
    /// changes: sign-in, account switch or sign-out.
    fn start_purchase_sync(&self) {
        let mut slot = self.purchase_sync.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }

        let mut snapshots = self.session.subscribe();
        let purchases = self.purchases.clone();
        *slot = Some(tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let user_id = {
                    let snapshot = snapshots.borrow_and_update();
                    if snapshot.is_loading {
                        continue;
                    }
                    snapshot.profile().map(|p| p.id.clone())
                };
                if let Err(e) = purchases.sync_user(user_id.as_deref()).await {
                    tracing::warn!(error = %e, "Purchase SDK user switch failed");
                }
            }
            tracing::debug!("Purchase user sync stopped");
        }));
    }

    /// Stop the background listeners and wait for background writes.
    pub async fn dispose(&self) {
        for slot in [&self.listener, &self.purchase_sync] {
            let handle = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(handle) = handle {
                handle.abort();
            }
        }

        self.writer.flush().await;

        let failures = self.writer.failure_count();
        if failures > 0 {
            tracing::warn!(failures, "Background writes failed during this session");
        }
    }

    /// Background writes that failed so far.
    pub fn background_failures(&self) -> Vec<BackgroundFailure> {
        self.writer.failures()
    }

    /// Wait for pending background writes.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}
