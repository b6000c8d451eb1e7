// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - actions and page data on top of the stores.

pub mod account;
pub mod ads;
pub mod background;
pub mod banko;
pub mod coupons;
pub mod purchases;
pub mod stats;
pub mod unlock;
pub mod wallet;

pub use account::AccountService;
pub use ads::{AdEvent, AdMediation, AdUnits, RewardItem, RewardedAds, SimulatedAds};
pub use background::{BackgroundFailure, BestEffort};
pub use banko::{BankoCard, BankoService, RevealOutcome};
pub use coupons::{CouponDetail, CouponService};
pub use purchases::{
    CatalogEntry, CustomerInfo, Offering, PurchaseAdapter, PurchaseOutcome, PurchaseService,
    StorePackage, StoreProduct,
};
pub use stats::StatsService;
pub use unlock::{CouponUnlocker, UnlockOutcome};
pub use wallet::{WalletService, WalletView};
