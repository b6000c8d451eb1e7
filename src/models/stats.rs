//! Coupon statistics aggregates for the statistics screens.
//!
//! Computed client-side from lightweight coupon projections so a screen needs
//! one query instead of one count query per figure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Coupon, CouponTier, Outcome};

/// Number of cities listed in the distribution.
pub const TOP_CITIES: usize = 5;

/// `select=city,type` projection of a coupon row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponSummary {
    pub city: String,
    #[serde(rename = "type")]
    pub tier: CouponTier,
}

/// Coupons published per city.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CityCount {
    pub city: String,
    pub count: u32,
}

/// Catalogue-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CouponStats {
    pub total_coupons: u32,
    pub free_coupons: u32,
    pub premium_coupons: u32,
    /// Most active cities, descending by count
    pub cities: Vec<CityCount>,
}

impl CouponStats {
    pub fn from_summaries(summaries: &[CouponSummary]) -> Self {
        let mut stats = CouponStats::default();
        let mut by_city: HashMap<String, u32> = HashMap::new();

        for summary in summaries {
            stats.total_coupons += 1;
            match summary.tier {
                CouponTier::Free => stats.free_coupons += 1,
                CouponTier::Premium => stats.premium_coupons += 1,
            }

            // "İstanbul Veliefendi" and "İstanbul" count as one city
            if let Some(city) = summary.city.split_whitespace().next() {
                *by_city.entry(city.to_string()).or_insert(0) += 1;
            }
        }

        let mut cities: Vec<CityCount> = by_city
            .into_iter()
            .map(|(city, count)| CityCount { city, count })
            .collect();
        cities.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
        cities.truncate(TOP_CITIES);
        stats.cities = cities;

        stats
    }
}

/// Track record over recently settled coupons.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PerformanceStats {
    /// Sum of winnings of won coupons
    pub total_profit: f64,
    /// Percentage of settled coupons that won, rounded
    pub win_rate: u32,
    /// Settled (won or lost) coupons considered
    pub completed_coupons: u32,
}

impl PerformanceStats {
    pub fn from_history(history: &[Coupon]) -> Self {
        let completed = history.iter().filter(|c| c.outcome().is_settled()).count();
        let wins: Vec<&Coupon> = history
            .iter()
            .filter(|c| c.outcome() == Outcome::Won)
            .collect();

        let total_profit = wins.iter().map(|c| c.winning_amount.unwrap_or(0.0)).sum();
        let win_rate = if completed > 0 {
            ((wins.len() as f64 / completed as f64) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total_profit,
            win_rate,
            completed_coupons: completed as u32,
        }
    }
}
