// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coupon purchase records and the confirmed unlock receipt.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::StarTransaction;

/// Row in `user_coupons`. Its existence is what unlocks a coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PurchaseRecord {
    pub user_id: String,
    pub coupon_id: String,
    /// ISO 8601
    #[serde(default)]
    pub purchased_at: String,
}

/// Server-confirmed result of the atomic `unlock_coupon` call.
///
/// The balance, ledger entry and purchase record were all written in one
/// backend transaction; local caches are updated from this payload only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UnlockReceipt {
    pub coupon_id: String,
    /// Balance after the debit
    pub star_balance: i32,
    /// Ledger entry written (absent when nothing was charged)
    #[serde(default)]
    pub transaction: Option<StarTransaction>,
    pub purchase: PurchaseRecord,
    /// The purchase already existed; nothing was charged
    #[serde(default)]
    pub already_owned: bool,
}
