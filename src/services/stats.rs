// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics screens. Errors are logged and shown as zeros.

use crate::db::RemoteStore;
use crate::models::{CouponStats, PerformanceStats};
use crate::time_utils::Clock;
use std::sync::Arc;

/// Past race days considered for the track record.
pub const PERFORMANCE_WINDOW: u32 = 10;

#[derive(Clone)]
pub struct StatsService {
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(remote: Arc<dyn RemoteStore>, clock: Arc<dyn Clock>) -> Self {
        Self { remote, clock }
    }

    pub async fn coupon_stats(&self) -> CouponStats {
        match self.remote.coupon_summaries().await {
            Ok(summaries) => CouponStats::from_summaries(&summaries),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load coupon statistics");
                CouponStats::default()
            }
        }
    }

    /// Track record over recent coupons, excluding today's (still pending).
    pub async fn performance(&self) -> PerformanceStats {
        let today = self.clock.today();
        match self.remote.coupons_before(today, PERFORMANCE_WINDOW).await {
            Ok(history) => PerformanceStats::from_history(&history),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load performance history");
                PerformanceStats::default()
            }
        }
    }
}
