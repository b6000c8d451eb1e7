// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Banko reveal flow: rewarded ad, per-day device flag, day rollover.

use altilizeka::db::LocalStore;
use altilizeka::services::RevealOutcome;

mod common;
use common::{banko_coupon, test_app};

#[tokio::test]
async fn test_reward_reveals_pick_for_today() {
    let t = test_app();
    let coupons = vec![banko_coupon("c1", "Adana", &["Gülşah Sultan"])];
    let cards = t.app.banko.home_picks(&coupons).unwrap();
    assert_eq!(cards.len(), 1);
    assert!(!cards[0].unlocked);

    t.ads.will_reward();
    let outcome = t.app.banko.reveal(&cards[0].pick).await.unwrap();

    let RevealOutcome::Revealed(reward) = outcome else {
        panic!("expected Revealed, got {:?}", outcome);
    };
    assert_eq!(reward.kind, "coins");
    assert!(t.app.banko.is_unlocked(&cards[0].pick).unwrap());
    assert_eq!(
        t.local.get("banko_adana-gülşah-sultan_2026-01-14").unwrap(),
        Some("true".to_string())
    );
}

#[tokio::test]
async fn test_reveal_lapses_at_day_rollover() {
    let t = test_app();
    let coupons = vec![banko_coupon("c1", "İzmir", &["Rüzgar"])];
    let pick = t.app.banko.home_picks(&coupons).unwrap()[0].pick.clone();

    t.ads.will_reward();
    t.app.banko.reveal(&pick).await.unwrap();
    assert!(t.app.banko.home_picks(&coupons).unwrap()[0].unlocked);

    t.clock.advance(chrono::Duration::days(1));
    assert!(!t.app.banko.home_picks(&coupons).unwrap()[0].unlocked);
}

#[tokio::test]
async fn test_home_feed_shows_at_most_two_picks() {
    let t = test_app();
    let coupons = vec![
        banko_coupon("c1", "Adana", &["Karayel", "Poyraz"]),
        banko_coupon("c2", "Bursa", &["Lodos"]),
    ];

    let cards = t.app.banko.home_picks(&coupons).unwrap();

    let names: Vec<&str> = cards.iter().map(|c| c.pick.horse_name.as_str()).collect();
    assert_eq!(names, vec!["Karayel", "Poyraz"]);
}

#[tokio::test]
async fn test_dismissed_ad_reveals_nothing() {
    let t = test_app();
    let coupons = vec![banko_coupon("c1", "Adana", &["Karayel"])];
    let pick = t.app.banko.home_picks(&coupons).unwrap()[0].pick.clone();

    t.ads.will_be_dismissed();
    let outcome = t.app.banko.reveal(&pick).await.unwrap();

    assert_eq!(outcome, RevealOutcome::NotRewarded);
    assert!(!t.app.banko.is_unlocked(&pick).unwrap());
}

#[tokio::test]
async fn test_revealed_pick_does_not_show_another_ad() {
    let t = test_app();
    let coupons = vec![banko_coupon("c1", "Adana", &["Karayel"])];
    let pick = t.app.banko.home_picks(&coupons).unwrap()[0].pick.clone();

    t.ads.will_reward();
    t.app.banko.reveal(&pick).await.unwrap();
    let again = t.app.banko.reveal(&pick).await.unwrap();

    assert_eq!(again, RevealOutcome::AlreadyUnlocked);
    assert_eq!(t.ads.show_count(), 1);
}
