// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Banko picks revealed by watching a rewarded ad.
//!
//! A reveal is recorded only on this device, keyed by pick and UTC day, so
//! it lapses at the next day rollover.

use crate::db::LocalFlags;
use crate::error::Result;
use crate::models::{extract_banko_picks, BankoPick, Coupon, HOME_BANKO_PICKS};
use crate::services::ads::{RewardItem, RewardedAds};
use crate::time_utils::Clock;
use std::sync::Arc;

/// A pick on the home feed and whether it is revealed today.
#[derive(Debug, Clone, PartialEq)]
pub struct BankoCard {
    pub pick: BankoPick,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RevealOutcome {
    AlreadyUnlocked,
    Revealed(RewardItem),
    /// Ad not completed; nothing recorded
    NotRewarded,
}

#[derive(Clone)]
pub struct BankoService {
    flags: LocalFlags,
    clock: Arc<dyn Clock>,
    ads: RewardedAds,
}

impl BankoService {
    pub fn new(flags: LocalFlags, clock: Arc<dyn Clock>, ads: RewardedAds) -> Self {
        Self { flags, clock, ads }
    }

    /// Picks for the home feed with today's reveal state.
    pub fn home_picks(&self, coupons: &[Coupon]) -> Result<Vec<BankoCard>> {
        extract_banko_picks(coupons, HOME_BANKO_PICKS)
            .into_iter()
            .map(|pick| {
                let unlocked = self.is_unlocked(&pick)?;
                Ok(BankoCard { pick, unlocked })
            })
            .collect()
    }

    pub fn is_unlocked(&self, pick: &BankoPick) -> Result<bool> {
        self.flags
            .banko_unlocked(&pick.pick_id(), self.clock.today())
    }

    /// Show a rewarded ad and record the reveal once the reward is earned.
    pub async fn reveal(&self, pick: &BankoPick) -> Result<RevealOutcome> {
        if self.is_unlocked(pick)? {
            return Ok(RevealOutcome::AlreadyUnlocked);
        }

        let Some(reward) = self.ads.show().await else {
            tracing::info!(pick_id = %pick.pick_id(), "Banko reveal not rewarded");
            return Ok(RevealOutcome::NotRewarded);
        };

        // Day of the reward, not of the request
        let day = self.clock.today();
        self.flags.set_banko_unlocked(&pick.pick_id(), day)?;
        tracing::info!(pick_id = %pick.pick_id(), %day, "Banko pick revealed");
        Ok(RevealOutcome::Revealed(reward))
    }
}
