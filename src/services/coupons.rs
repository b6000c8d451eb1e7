// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coupon detail and the user's purchased coupons.

use crate::db::RemoteStore;
use crate::error::{AppError, Result};
use crate::models::Coupon;
use crate::stores::{EntitlementStore, SessionStore};
use std::sync::Arc;

/// A coupon with whether its legs may be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponDetail {
    pub coupon: Coupon,
    pub unlocked: bool,
}

#[derive(Clone)]
pub struct CouponService {
    remote: Arc<dyn RemoteStore>,
    session: SessionStore,
    entitlements: EntitlementStore,
}

impl CouponService {
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

    pub async fn detail(&self, coupon_id: &str) -> Result<CouponDetail> {
        let coupon = self
            .remote
            .get_coupon(coupon_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Coupon {}", coupon_id)))?;

        let unlocked = self.entitlements.can_view(&coupon);
        Ok(CouponDetail { coupon, unlocked })
    }

    /// Purchased coupons, most recent purchase first.
    pub async fn my_coupons(&self) -> Result<Vec<Coupon>> {
        let profile = self.session.profile().ok_or(AppError::Unauthorized)?;
        self.remote.purchased_coupons(&profile.id).await
    }
}
