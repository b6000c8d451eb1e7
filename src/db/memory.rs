// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend.
//!
//! Implements both [`AuthProvider`] and [`RemoteStore`] against in-memory
//! tables. Used for offline demos and as the backend of the test suite;
//! seeding helpers and failure injection live here for that reason.

use crate::auth::{AuthEvent, AuthProvider, AuthUser, Credentials, UserMetadata};
use crate::db::{rpc, RemoteStore};
use crate::error::{AppError, Result};
use crate::models::{
    Coupon, CouponSummary, NewProfile, PurchaseRecord, StarPackage, StarTransaction,
    TransactionKind, UnlockReceipt, UserProfile, WELCOME_BONUS_DESCRIPTION,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 16;

struct Account {
    user: AuthUser,
    password: String,
}

/// Rows that the unlock transaction touches together.
#[derive(Default)]
struct Tables {
    profiles: Vec<UserProfile>,
    purchases: Vec<PurchaseRecord>,
    transactions: Vec<StarTransaction>,
}

impl Tables {
    fn profile_mut(&mut self, user_id: &str) -> Option<&mut UserProfile> {
        self.profiles.iter_mut().find(|p| p.id == user_id)
    }

    fn owns(&self, user_id: &str, coupon_id: &str) -> bool {
        self.purchases
            .iter()
            .any(|p| p.user_id == user_id && p.coupon_id == coupon_id)
    }
}

struct Inner {
    accounts: DashMap<String, Account>,
    current: Mutex<Option<AuthUser>>,
    tables: Mutex<Tables>,
    coupons: DashMap<String, Coupon>,
    packages: Mutex<Vec<StarPackage>>,
    failures: DashMap<String, String>,
    calls: DashMap<String, u32>,
    events: broadcast::Sender<AuthEvent>,
}

/// In-memory implementation of the hosted backend.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                accounts: DashMap::new(),
                current: Mutex::new(None),
                tables: Mutex::new(Tables::default()),
                coupons: DashMap::new(),
                packages: Mutex::new(Vec::new()),
                failures: DashMap::new(),
                calls: DashMap::new(),
                events,
            }),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> MutexGuard<'_, Option<AuthUser>> {
        self.inner.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now() -> String {
        format_utc_rfc3339(Utc::now())
    }

    /// Count the call and return the injected failure for `op`, if any.
    fn enter(&self, op: &str) -> Result<()> {
        *self.inner.calls.entry(op.to_string()).or_insert(0) += 1;
        match self.inner.failures.get(op) {
            Some(message) => {
                tracing::debug!(op, "Injected backend failure");
                Err(AppError::Backend(message.clone()))
            }
            None => Ok(()),
        }
    }

    fn emit_event(&self, event: AuthEvent) {
        // No subscribers is not an error
        let _ = self.inner.events.send(event);
    }

    // ─── Seeding & inspection ────────────────────────────────────

    /// Register an account without a profile row.
    pub fn seed_account(&self, email: &str, password: &str, metadata_name: Option<&str>) -> String {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: UserMetadata {
                display_name: metadata_name.map(String::from),
            },
        };
        let id = user.id.clone();
        self.inner.accounts.insert(
            email.to_string(),
            Account {
                user,
                password: password.to_string(),
            },
        );
        id
    }

    /// Register an account with a profile row.
    pub fn seed_user(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        star_balance: i32,
    ) -> String {
        let id = self.seed_account(email, password, display_name);
        self.tables().profiles.push(UserProfile {
            id: id.clone(),
            display_name: display_name.map(String::from),
            avatar_url: None,
            star_balance,
            created_at: Self::now(),
        });
        id
    }

    pub fn seed_coupon(&self, coupon: Coupon) {
        self.inner.coupons.insert(coupon.id.clone(), coupon);
    }

    pub fn seed_package(&self, package: StarPackage) {
        self.inner
            .packages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(package);
    }

    /// Record a purchase directly, bypassing the balance.
    pub fn seed_purchase(&self, user_id: &str, coupon_id: &str) {
        self.tables().purchases.push(PurchaseRecord {
            user_id: user_id.to_string(),
            coupon_id: coupon_id.to_string(),
            purchased_at: Self::now(),
        });
    }

    pub fn set_balance(&self, user_id: &str, star_balance: i32) {
        if let Some(profile) = self.tables().profile_mut(user_id) {
            profile.star_balance = star_balance;
        }
    }

    /// Credit stars the way a store-purchase webhook would.
    pub fn credit_stars(&self, user_id: &str, amount: i32, description: &str) {
        let mut tables = self.tables();
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.star_balance += amount;
        }
        tables.transactions.push(StarTransaction {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            kind: TransactionKind::Purchase,
            description: description.to_string(),
            created_at: Self::now(),
        });
    }

    pub fn stored_profile(&self, user_id: &str) -> Option<UserProfile> {
        self.tables()
            .profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned()
    }

    pub fn stored_purchases(&self, user_id: &str) -> Vec<String> {
        self.tables()
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.coupon_id.clone())
            .collect()
    }

    pub fn stored_transactions(&self, user_id: &str) -> Vec<StarTransaction> {
        self.tables()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Make every call to `op` fail with a backend error until cleared.
    pub fn fail(&self, op: &str, message: &str) {
        self.inner
            .failures
            .insert(op.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, op: &str) {
        self.inner.failures.remove(op);
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: &str) -> u32 {
        self.inner.calls.get(op).map(|c| *c).unwrap_or(0)
    }

    /// Push an auth event as if the provider had emitted it.
    pub fn emit(&self, event: AuthEvent) {
        self.emit_event(event);
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser> {
        self.enter("sign_in")?;

        let user = match self.inner.accounts.get(&credentials.email) {
            Some(account) if account.password == credentials.password => account.user.clone(),
            _ => {
                return Err(AppError::InvalidCredentials(
                    "Invalid login credentials".to_string(),
                ))
            }
        };

        *self.current() = Some(user.clone());
        self.emit_event(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthUser> {
        self.enter("sign_up")?;

        if self.inner.accounts.contains_key(&credentials.email) {
            return Err(AppError::Conflict("User already registered".to_string()));
        }

        let id = self.seed_account(&credentials.email, &credentials.password, None);
        let user = AuthUser {
            id,
            email: Some(credentials.email.clone()),
            user_metadata: UserMetadata::default(),
        };

        *self.current() = Some(user.clone());
        self.emit_event(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.enter("sign_out")?;
        *self.current() = None;
        self.emit_event(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        self.enter("current_user")?;
        Ok(self.current().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}

#[async_trait]
impl RemoteStore for MemoryBackend {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.enter("get_profile")?;
        Ok(self.stored_profile(user_id))
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile> {
        self.enter("insert_profile")?;

        let mut tables = self.tables();
        if tables.profiles.iter().any(|p| p.id == profile.id) {
            return Err(AppError::Conflict(format!(
                "Profile {} already exists",
                profile.id
            )));
        }

        let row = profile.clone().into_profile(Self::now());
        tables.profiles.push(row.clone());
        // Mirrors the bonus ledger trigger on `profiles`
        if row.star_balance > 0 {
            tables.transactions.push(StarTransaction {
                id: Uuid::new_v4().to_string(),
                user_id: row.id.clone(),
                amount: row.star_balance,
                kind: TransactionKind::Bonus,
                description: WELCOME_BONUS_DESCRIPTION.to_string(),
                created_at: row.created_at.clone(),
            });
        }
        Ok(row)
    }

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<()> {
        self.enter("update_display_name")?;
        match self.tables().profile_mut(user_id) {
            Some(profile) => {
                profile.display_name = Some(display_name.to_string());
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Profile {}", user_id))),
        }
    }

    async fn coupons_for_date(&self, date: NaiveDate) -> Result<Vec<Coupon>> {
        self.enter("coupons_for_date")?;
        let mut coupons: Vec<Coupon> = self
            .inner
            .coupons
            .iter()
            .filter(|c| c.date == date)
            .map(|c| c.value().clone())
            .collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(coupons)
    }

    async fn get_coupon(&self, coupon_id: &str) -> Result<Option<Coupon>> {
        self.enter("get_coupon")?;
        Ok(self.inner.coupons.get(coupon_id).map(|c| c.value().clone()))
    }

    async fn coupons_before(&self, before: NaiveDate, limit: u32) -> Result<Vec<Coupon>> {
        self.enter("coupons_before")?;
        let mut coupons: Vec<Coupon> = self
            .inner
            .coupons
            .iter()
            .filter(|c| c.date < before)
            .map(|c| c.value().clone())
            .collect();
        coupons.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        coupons.truncate(limit as usize);
        Ok(coupons)
    }

    async fn coupon_summaries(&self) -> Result<Vec<CouponSummary>> {
        self.enter("coupon_summaries")?;
        Ok(self
            .inner
            .coupons
            .iter()
            .map(|c| CouponSummary {
                city: c.city.clone(),
                tier: c.tier,
            })
            .collect())
    }

    async fn purchased_coupon_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.enter("purchased_coupon_ids")?;
        Ok(self.stored_purchases(user_id))
    }

    async fn purchased_coupons(&self, user_id: &str) -> Result<Vec<Coupon>> {
        self.enter("purchased_coupons")?;
        // Insertion order is purchase order
        let ids = self.stored_purchases(user_id);
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| self.inner.coupons.get(id).map(|c| c.value().clone()))
            .collect())
    }

    async fn unlock_coupon(&self, user_id: &str, coupon_id: &str) -> Result<UnlockReceipt> {
        self.enter(rpc::UNLOCK_COUPON)?;

        let caller = self.current().as_ref().map(|u| u.id.clone());
        if caller.as_deref() != Some(user_id) {
            return Err(AppError::Unauthorized);
        }

        let (cost, title) = self
            .inner
            .coupons
            .get(coupon_id)
            .map(|c| (c.unlock_cost(), c.title.clone()))
            .ok_or_else(|| AppError::NotFound(format!("Coupon {}", coupon_id)))?;

        let mut tables = self.tables();
        let balance = tables
            .profile_mut(user_id)
            .map(|p| p.star_balance)
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))?;

        if tables.owns(user_id, coupon_id) {
            let purchase = tables
                .purchases
                .iter()
                .find(|p| p.user_id == user_id && p.coupon_id == coupon_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("purchase vanished")))?;
            return Ok(UnlockReceipt {
                coupon_id: coupon_id.to_string(),
                star_balance: balance,
                transaction: None,
                purchase,
                already_owned: true,
            });
        }

        if balance < cost {
            return Err(AppError::InsufficientStars { balance, cost });
        }

        let now = Self::now();
        let new_balance = balance - cost;
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.star_balance = new_balance;
        }

        let transaction = (cost > 0).then(|| StarTransaction {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount: -cost,
            kind: TransactionKind::Spend,
            description: format!("{} kuponu", title),
            created_at: now.clone(),
        });
        if let Some(t) = &transaction {
            tables.transactions.push(t.clone());
        }

        let purchase = PurchaseRecord {
            user_id: user_id.to_string(),
            coupon_id: coupon_id.to_string(),
            purchased_at: now,
        };
        tables.purchases.push(purchase.clone());

        Ok(UnlockReceipt {
            coupon_id: coupon_id.to_string(),
            star_balance: new_balance,
            transaction,
            purchase,
            already_owned: false,
        })
    }

    async fn transactions(&self, user_id: &str, limit: u32) -> Result<Vec<StarTransaction>> {
        self.enter("transactions")?;
        let mut rows = self.stored_transactions(user_id);
        rows.reverse();
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn star_packages(&self) -> Result<Vec<StarPackage>> {
        self.enter("star_packages")?;
        let mut packages = self
            .inner
            .packages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        packages.sort_by_key(|p| p.stars);
        Ok(packages)
    }

    async fn delete_account_data(&self, user_id: &str) -> Result<()> {
        self.enter(rpc::DELETE_ACCOUNT_DATA)?;
        {
            let mut tables = self.tables();
            tables.profiles.retain(|p| p.id != user_id);
            tables.purchases.retain(|p| p.user_id != user_id);
            tables.transactions.retain(|t| t.user_id != user_id);
        }
        self.inner.accounts.retain(|_, a| a.user.id != user_id);
        tracing::info!(user_id, "Deleted account data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CouponTier;

    fn coupon(id: &str, tier: CouponTier, cost: i32) -> Coupon {
        Coupon {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
            city: "Adana".to_string(),
            tier,
            star_cost: cost,
            title: "Adana Altılı".to_string(),
            subtitle: None,
            status: None,
            winning_amount: None,
            legs: vec![],
            created_at: "2026-01-14T08:00:00Z".to_string(),
        }
    }

    async fn signed_in(backend: &MemoryBackend, balance: i32) -> String {
        let id = backend.seed_user("a@example.com", "secret1", Some("Ayşe"), balance);
        backend
            .sign_in(&Credentials::new("a@example.com", "secret1"))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_unlock_is_atomic_and_idempotent() {
        let backend = MemoryBackend::new();
        backend.seed_coupon(coupon("c1", CouponTier::Premium, 50));
        let user = signed_in(&backend, 100).await;

        let first = backend.unlock_coupon(&user, "c1").await.unwrap();
        assert_eq!(first.star_balance, 50);
        assert!(!first.already_owned);
        assert_eq!(first.transaction.as_ref().map(|t| t.amount), Some(-50));

        let second = backend.unlock_coupon(&user, "c1").await.unwrap();
        assert!(second.already_owned);
        assert_eq!(second.star_balance, 50);
        assert_eq!(backend.stored_transactions(&user).len(), 1);
        assert_eq!(backend.stored_purchases(&user), vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_unlock_never_goes_negative() {
        let backend = MemoryBackend::new();
        backend.seed_coupon(coupon("c1", CouponTier::Premium, 50));
        let user = signed_in(&backend, 30).await;

        let err = backend.unlock_coupon(&user, "c1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStars {
                balance: 30,
                cost: 50
            }
        ));
        assert_eq!(backend.stored_profile(&user).unwrap().star_balance, 30);
        assert!(backend.stored_purchases(&user).is_empty());
    }

    #[tokio::test]
    async fn test_unlock_requires_matching_caller() {
        let backend = MemoryBackend::new();
        backend.seed_coupon(coupon("c1", CouponTier::Premium, 50));
        let other = backend.seed_user("b@example.com", "secret1", None, 500);
        signed_in(&backend, 100).await;

        let err = backend.unlock_coupon(&other, "c1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let backend = MemoryBackend::new();
        backend.seed_user("a@example.com", "secret1", None, 0);

        let err = backend
            .sign_in(&Credentials::new("a@example.com", "wrong-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(_)));
        assert!(backend.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_count() {
        let backend = MemoryBackend::new();
        backend.fail("star_packages", "boom");

        assert!(backend.star_packages().await.is_err());
        backend.clear_failure("star_packages");
        assert!(backend.star_packages().await.is_ok());
        assert_eq!(backend.calls("star_packages"), 2);
    }

    #[tokio::test]
    async fn test_sign_out_emits_event() {
        let backend = MemoryBackend::new();
        let mut events = backend.subscribe();
        signed_in(&backend, 0).await;
        backend.sign_out().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }
}
