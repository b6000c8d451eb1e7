// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Today's coupon list and the set of coupons the user has unlocked.

use crate::db::RemoteStore;
use crate::error::Result;
use crate::models::{Coupon, UnlockReceipt};
use crate::time_utils::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Published entitlement state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitlementSnapshot {
    /// Coupons dated today (UTC), newest first
    pub today_coupons: Vec<Coupon>,
    /// Ids with a purchase record server-side
    pub purchased: BTreeSet<String>,
}

impl EntitlementSnapshot {
    pub fn can_view(&self, coupon: &Coupon) -> bool {
        coupon.is_free() || self.purchased.contains(&coupon.id)
    }
}

#[derive(Clone)]
pub struct EntitlementStore {
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    tx: Arc<watch::Sender<EntitlementSnapshot>>,
}

impl EntitlementStore {
    pub fn new(remote: Arc<dyn RemoteStore>, clock: Arc<dyn Clock>) -> Self {
        let (tx, _) = watch::channel(EntitlementSnapshot::default());
        Self {
            remote,
            clock,
            tx: Arc::new(tx),
        }
    }

    /// Replace the cached list with today's coupons.
    ///
    /// On failure the previous list is kept and the error returned.
    pub async fn fetch_today_coupons(&self) -> Result<Vec<Coupon>> {
        let today = self.clock.today();
        let coupons = self.remote.coupons_for_date(today).await?;

        tracing::debug!(%today, count = coupons.len(), "Fetched today's coupons");
        self.tx.send_modify(|s| s.today_coupons = coupons.clone());
        Ok(coupons)
    }

    /// Replace the purchased set wholesale.
    pub fn set_purchased_coupons<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let purchased: BTreeSet<String> = ids.into_iter().collect();
        self.tx.send_if_modified(|s| {
            if s.purchased == purchased {
                return false;
            }
            s.purchased = purchased;
            true
        });
    }

    /// Record a server-confirmed unlock.
    pub fn add_purchased_coupon(&self, receipt: &UnlockReceipt) {
        self.tx
            .send_if_modified(|s| s.purchased.insert(receipt.coupon_id.clone()));
    }

    pub fn is_purchased(&self, coupon_id: &str) -> bool {
        self.tx.borrow().purchased.contains(coupon_id)
    }

    /// Free coupons are always viewable; premium ones once purchased.
    pub fn can_view(&self, coupon: &Coupon) -> bool {
        self.tx.borrow().can_view(coupon)
    }

    pub fn today_coupons(&self) -> Vec<Coupon> {
        self.tx.borrow().today_coupons.clone()
    }

    pub fn premium_coupons(&self) -> Vec<Coupon> {
        self.tx
            .borrow()
            .today_coupons
            .iter()
            .filter(|c| !c.is_free())
            .cloned()
            .collect()
    }

    pub fn purchased_ids(&self) -> BTreeSet<String> {
        self.tx.borrow().purchased.clone()
    }

    /// Forget the purchased set (sign-out). Today's list is public and stays.
    pub fn clear(&self) {
        self.set_purchased_coupons(std::iter::empty());
    }

    pub fn snapshot(&self) -> EntitlementSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EntitlementSnapshot> {
        self.tx.subscribe()
    }
}
