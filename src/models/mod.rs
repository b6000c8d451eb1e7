// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod coupon;
pub mod package;
pub mod profile;
pub mod purchase;
pub mod stats;
pub mod transaction;

pub use coupon::{
    extract_banko_picks, BankoPick, Coupon, CouponTier, Horse, Leg, Outcome, HOME_BANKO_PICKS,
};
pub use package::StarPackage;
pub use profile::{NewProfile, UserProfile};
pub use purchase::{PurchaseRecord, UnlockReceipt};
pub use stats::{CityCount, CouponStats, CouponSummary, PerformanceStats};
pub use transaction::{ledger_sum, StarTransaction, TransactionKind, WELCOME_BONUS_DESCRIPTION};
