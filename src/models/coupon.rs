// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coupon, leg and horse models.
//!
//! Coupons are authored and scored by the forecasting pipeline; the client
//! only reads them. Legs and horses are embedded in the coupon row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of banko picks shown on the home feed.
pub const HOME_BANKO_PICKS: usize = 2;

/// Paywall tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum CouponTier {
    Free,
    Premium,
}

/// Result of a coupon or a single leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Pending,
    Won,
    Lost,
}

impl Outcome {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// Coupon row in the `coupons` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Coupon {
    pub id: String,
    /// Race day
    pub date: NaiveDate,
    pub city: String,
    #[serde(rename = "type")]
    pub tier: CouponTier,
    /// Zero for the free tier
    #[serde(default)]
    pub star_cost: i32,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Absent until the pipeline scores the coupon
    #[serde(default)]
    pub status: Option<Outcome>,
    #[serde(default)]
    pub winning_amount: Option<f64>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub created_at: String,
}

impl Coupon {
    pub fn is_free(&self) -> bool {
        self.tier == CouponTier::Free
    }

    /// Stars charged to unlock (always zero for free coupons).
    pub fn unlock_cost(&self) -> i32 {
        if self.is_free() {
            0
        } else {
            self.star_cost.max(0)
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.status.unwrap_or_default()
    }
}

/// One race of a coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Leg {
    pub leg_no: u32,
    pub race_time: String,
    #[serde(default)]
    pub race_info: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub field_size: u32,
    #[serde(default)]
    pub leg_result: Option<Outcome>,
    #[serde(default)]
    pub actual_winner: Option<String>,
    #[serde(default)]
    pub horses: Vec<Horse>,
}

/// A selected runner within a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Horse {
    pub program_no: u32,
    pub horse_name: String,
    #[serde(default)]
    pub jockey_name: Option<String>,
    /// Recent form, e.g. "1-3-2-5-1-4"
    #[serde(default)]
    pub last_6: Option<String>,
    /// Model confidence, 0-100
    #[serde(default)]
    pub ai_score: Option<u8>,
    #[serde(default)]
    pub is_banko: bool,
    #[serde(default)]
    pub ai_note: Option<String>,
}

/// A single high-confidence horse surfaced on the home feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BankoPick {
    pub horse_name: String,
    pub race_time: String,
    pub city: String,
    pub ai_note: Option<String>,
}

impl BankoPick {
    /// Stable identifier: `city-horse` lowercased, with every whitespace run
    /// (leading and trailing included) replaced by one `-`.
    ///
    /// Ids are persisted as device-local unlock flags, so the mapping must
    /// not change between releases.
    pub fn pick_id(&self) -> String {
        let raw = format!("{}-{}", self.city, self.horse_name);
        let mut id = String::with_capacity(raw.len());
        let mut in_run = false;
        for ch in raw.chars() {
            if ch.is_whitespace() {
                if !in_run {
                    id.push('-');
                }
                in_run = true;
            } else {
                id.push(ch);
                in_run = false;
            }
        }
        id.to_lowercase()
    }
}

/// Collect banko horses in coupon, leg, horse order, keeping at most `limit`.
pub fn extract_banko_picks(coupons: &[Coupon], limit: usize) -> Vec<BankoPick> {
    coupons
        .iter()
        .flat_map(|coupon| {
            coupon.legs.iter().flat_map(move |leg| {
                leg.horses
                    .iter()
                    .filter(|h| h.is_banko)
                    .map(move |horse| BankoPick {
                        horse_name: horse.horse_name.clone(),
                        race_time: leg.race_time.clone(),
                        city: coupon.city.clone(),
                        ai_note: horse.ai_note.clone(),
                    })
            })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horse(name: &str, banko: bool) -> Horse {
        Horse {
            program_no: 1,
            horse_name: name.to_string(),
            jockey_name: None,
            last_6: None,
            ai_score: Some(90),
            is_banko: banko,
            ai_note: None,
        }
    }

    fn coupon(city: &str, horses: Vec<Horse>) -> Coupon {
        Coupon {
            id: format!("c-{}", city),
            date: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
            city: city.to_string(),
            tier: CouponTier::Premium,
            star_cost: 50,
            title: "Test".to_string(),
            subtitle: None,
            status: None,
            winning_amount: None,
            legs: vec![Leg {
                leg_no: 1,
                race_time: "14:30".to_string(),
                race_info: None,
                distance: None,
                field_size: 12,
                leg_result: None,
                actual_winner: None,
                horses,
            }],
            created_at: String::new(),
        }
    }

    #[test]
    fn test_pick_id_slug() {
        let pick = BankoPick {
            horse_name: "Kara  Şimşek".to_string(),
            race_time: "15:00".to_string(),
            city: "Istanbul Veliefendi".to_string(),
            ai_note: None,
        };
        assert_eq!(pick.pick_id(), "istanbul-veliefendi-kara-şimşek");
    }

    #[test]
    fn test_pick_id_keeps_edge_whitespace() {
        let pick = |city: &str, horse_name: &str| BankoPick {
            horse_name: horse_name.to_string(),
            race_time: "15:00".to_string(),
            city: city.to_string(),
            ai_note: None,
        };

        assert_eq!(pick("Adana", "Foo ").pick_id(), "adana-foo-");
        assert_eq!(pick("Adana", " Foo").pick_id(), "adana--foo");
        assert_eq!(pick(" Adana", "Foo").pick_id(), "-adana-foo");
        assert_eq!(pick("Adana", "Gülşah \t Sultan").pick_id(), "adana-gülşah-sultan");
        assert_ne!(
            pick("Adana", "Foo ").pick_id(),
            pick("Adana", "Foo").pick_id()
        );
    }

    #[test]
    fn test_extract_limits_and_orders() {
        let coupons = vec![
            coupon("Adana", vec![horse("A1", true), horse("A2", false)]),
            coupon("Bursa", vec![horse("B1", true), horse("B2", true)]),
        ];

        let picks = extract_banko_picks(&coupons, HOME_BANKO_PICKS);
        let names: Vec<_> = picks.iter().map(|p| p.horse_name.as_str()).collect();
        assert_eq!(names, vec!["A1", "B1"]);
        assert_eq!(picks[0].city, "Adana");
        assert_eq!(picks[0].race_time, "14:30");
    }

    #[test]
    fn test_free_coupon_costs_nothing() {
        let mut c = coupon("Izmir", vec![]);
        c.tier = CouponTier::Free;
        assert_eq!(c.unlock_cost(), 0);
    }

    #[test]
    fn test_deserialize_wire_names() {
        let json = r#"{
            "id": "c1", "date": "2026-01-14", "city": "İstanbul", "type": "premium",
            "star_cost": 50, "title": "İstanbul Kahin Analizi", "subtitle": null,
            "status": "won", "winning_amount": 12450.0,
            "legs": [{"leg_no": 1, "race_time": "13:30", "field_size": 9,
                      "horses": [{"program_no": 4, "horse_name": "Rüzgar", "is_banko": true, "ai_note": null}]}],
            "created_at": "2026-01-14T06:00:00Z"
        }"#;
        let c: Coupon = serde_json::from_str(json).unwrap();
        assert_eq!(c.tier, CouponTier::Premium);
        assert_eq!(c.outcome(), Outcome::Won);
        assert_eq!(c.legs[0].leg_result, None);
        assert!(c.legs[0].horses[0].is_banko);
    }
}
