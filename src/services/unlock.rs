// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Paid coupon unlock.
//!
//! One server-side call debits the stars, writes the ledger entry and the
//! purchase record together. Local state changes only after that call
//! returns, and only from its receipt.

use crate::db::RemoteStore;
use crate::error::{AppError, Result};
use crate::models::{Coupon, UnlockReceipt};
use crate::stores::{EntitlementStore, SessionStore};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum UnlockOutcome {
    /// Free tier; nothing to unlock
    Free,
    /// Already purchased; nothing charged
    AlreadyOwned,
    Unlocked(UnlockReceipt),
}

#[derive(Clone)]
pub struct CouponUnlocker {
    remote: Arc<dyn RemoteStore>,
    session: SessionStore,
    entitlements: EntitlementStore,
}

impl CouponUnlocker {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        session: SessionStore,
        entitlements: EntitlementStore,
    ) -> Self {
        Self {
            remote,
            session,
            entitlements,
        }
    }

    pub async fn unlock(&self, coupon: &Coupon) -> Result<UnlockOutcome> {
        if coupon.is_free() {
            return Ok(UnlockOutcome::Free);
        }

        let profile = self.session.profile().ok_or(AppError::Unauthorized)?;

        if self.entitlements.is_purchased(&coupon.id) {
            return Ok(UnlockOutcome::AlreadyOwned);
        }

        let cost = coupon.unlock_cost();
        if profile.star_balance < cost {
            return Err(AppError::InsufficientStars {
                balance: profile.star_balance,
                cost,
            });
        }

        let receipt = self.remote.unlock_coupon(&profile.id, &coupon.id).await?;

        self.session.apply_confirmed_balance(receipt.star_balance);
        self.entitlements.add_purchased_coupon(&receipt);

        if receipt.already_owned {
            // Purchased elsewhere since the last refresh
            tracing::info!(coupon_id = %coupon.id, "Coupon was already owned server-side");
            return Ok(UnlockOutcome::AlreadyOwned);
        }

        tracing::info!(
            user_id = %profile.id,
            coupon_id = %coupon.id,
            cost,
            star_balance = receipt.star_balance,
            "Coupon unlocked"
        );
        Ok(UnlockOutcome::Unlocked(receipt))
    }
}
