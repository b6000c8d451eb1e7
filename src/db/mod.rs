//! Data layer: the hosted table store and device-local storage.

pub mod local;
pub mod memory;
pub mod supabase;

pub use local::{LocalFlags, LocalStore, MemoryStore, RedbStore};
pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

use crate::error::Result;
use crate::models::{
    Coupon, CouponSummary, NewProfile, StarPackage, StarTransaction, UnlockReceipt, UserProfile,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const COUPONS: &str = "coupons";
    pub const STAR_TRANSACTIONS: &str = "star_transactions";
    /// Purchase records (one row per unlocked coupon)
    pub const USER_COUPONS: &str = "user_coupons";
    pub const STAR_PACKAGES: &str = "star_packages";
}

/// Server-side functions.
pub mod rpc {
    /// Debit, ledger entry and purchase record in one transaction.
    pub const UNLOCK_COUPON: &str = "unlock_coupon";
    /// Remove the caller's profile, purchases and ledger.
    pub const DELETE_ACCOUNT_DATA: &str = "delete_account_data";
}

/// Typed operations on the hosted table store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ─── Profiles ────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Insert a profile row; fails with `Conflict` if one exists.
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile>;

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<()>;

    // ─── Coupons ─────────────────────────────────────────────────

    /// Coupons for one race day, newest first.
    async fn coupons_for_date(&self, date: NaiveDate) -> Result<Vec<Coupon>>;

    async fn get_coupon(&self, coupon_id: &str) -> Result<Option<Coupon>>;

    /// Coupons dated strictly before `before`, most recent day first.
    async fn coupons_before(&self, before: NaiveDate, limit: u32) -> Result<Vec<Coupon>>;

    /// City and tier of every coupon.
    async fn coupon_summaries(&self) -> Result<Vec<CouponSummary>>;

    // ─── Purchases ───────────────────────────────────────────────

    async fn purchased_coupon_ids(&self, user_id: &str) -> Result<Vec<String>>;

    /// Purchased coupons, most recent purchase first.
    async fn purchased_coupons(&self, user_id: &str) -> Result<Vec<Coupon>>;

    /// Atomically debit the coupon's cost, record the spend and the purchase.
    ///
    /// Idempotent: an existing purchase yields `already_owned` and no charge.
    async fn unlock_coupon(&self, user_id: &str, coupon_id: &str) -> Result<UnlockReceipt>;

    // ─── Ledger & catalog ────────────────────────────────────────

    /// Ledger entries, newest first.
    async fn transactions(&self, user_id: &str, limit: u32) -> Result<Vec<StarTransaction>>;

    async fn star_packages(&self) -> Result<Vec<StarPackage>>;

    // ─── Account ─────────────────────────────────────────────────

    /// Delete the user's profile, purchases and ledger entries.
    async fn delete_account_data(&self, user_id: &str) -> Result<()>;
}
