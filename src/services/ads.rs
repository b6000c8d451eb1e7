// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rewarded video ads.
//!
//! The mediation SDK is reached through [`AdMediation`]; the host shell
//! provides the native implementation and web builds use [`SimulatedAds`].
//! [`RewardedAds`] owns unit selection, preloading and the listener window.

use crate::config::{Config, Platform, TEST_REWARDED_AD_UNIT};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout_at, Instant};

const EVENT_CAPACITY: usize = 8;

/// Reward granted for a completed ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i32,
}

/// Events emitted by the mediation SDK while an ad is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    Rewarded(RewardItem),
    Dismissed,
    FailedToShow(String),
}

/// Ad mediation SDK.
#[async_trait]
pub trait AdMediation: Send + Sync {
    async fn initialize(&self, testing: bool) -> Result<()>;

    /// Load a rewarded ad for `ad_unit_id`.
    async fn prepare(&self, ad_unit_id: &str) -> Result<()>;

    /// Present the loaded ad. Outcome arrives as events.
    async fn show(&self) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<AdEvent>;
}

/// Rewarded ad unit ids per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdUnits {
    pub android: String,
    pub ios: String,
}

impl AdUnits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            android: config.android_rewarded_unit.clone(),
            ios: config.ios_rewarded_unit.clone(),
        }
    }

    /// Unit for the platform; development builds and web use the test unit.
    pub fn select(&self, platform: Platform, dev_mode: bool) -> &str {
        if dev_mode {
            return TEST_REWARDED_AD_UNIT;
        }
        match platform {
            Platform::Android => &self.android,
            Platform::Ios => &self.ios,
            Platform::Web => TEST_REWARDED_AD_UNIT,
        }
    }
}

// ─── Web fallback ────────────────────────────────────────────

/// Simulated ad for builds without a mediation SDK.
///
/// `show()` waits a fixed delay, then emits a `coins × 1` reward followed by
/// a dismissal.
pub struct SimulatedAds {
    delay: Duration,
    events: broadcast::Sender<AdEvent>,
}

impl SimulatedAds {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

    pub fn new(delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { delay, events }
    }
}

impl Default for SimulatedAds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl AdMediation for SimulatedAds {
    async fn initialize(&self, _testing: bool) -> Result<()> {
        tracing::info!("Using simulated rewarded ads");
        Ok(())
    }

    async fn prepare(&self, _ad_unit_id: &str) -> Result<()> {
        Ok(())
    }

    async fn show(&self) -> Result<()> {
        tracing::debug!(delay_ms = self.delay.as_millis() as u64, "Simulating rewarded ad");
        tokio::time::sleep(self.delay).await;
        let _ = self.events.send(AdEvent::Rewarded(RewardItem {
            kind: "coins".to_string(),
            amount: 1,
        }));
        let _ = self.events.send(AdEvent::Dismissed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
        self.events.subscribe()
    }
}

// ─── Rewarded ad flow ────────────────────────────────────────

struct AdState {
    initialized: AtomicBool,
    loaded: AtomicBool,
}

/// Rewarded-ad flow on top of an [`AdMediation`] implementation.
#[derive(Clone)]
pub struct RewardedAds {
    mediation: Arc<dyn AdMediation>,
    unit_id: String,
    dev_mode: bool,
    window: Duration,
    state: Arc<AdState>,
}

impl RewardedAds {
    pub fn new(mediation: Arc<dyn AdMediation>, config: &Config) -> Self {
        let unit_id = AdUnits::from_config(config)
            .select(config.platform, config.dev_mode)
            .to_string();
        Self {
            mediation,
            unit_id,
            dev_mode: config.dev_mode,
            window: config.ad_listener_window,
            state: Arc::new(AdState {
                initialized: AtomicBool::new(false),
                loaded: AtomicBool::new(false),
            }),
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn is_ready(&self) -> bool {
        self.state.loaded.load(Ordering::SeqCst)
    }

    /// Initialize the SDK once and preload the first ad.
    pub async fn initialize(&self) -> Result<()> {
        if self.state.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(e) = self.mediation.initialize(self.dev_mode).await {
            self.state.initialized.store(false, Ordering::SeqCst);
            return Err(AppError::Ads(format!("Initialization failed: {}", e)));
        }
        tracing::info!(unit_id = %self.unit_id, "Ad mediation initialized");

        self.prepare().await
    }

    /// Preload a rewarded ad.
    pub async fn prepare(&self) -> Result<()> {
        match self.mediation.prepare(&self.unit_id).await {
            Ok(()) => {
                self.state.loaded.store(true, Ordering::SeqCst);
                tracing::debug!("Rewarded ad prepared");
                Ok(())
            }
            Err(e) => {
                self.state.loaded.store(false, Ordering::SeqCst);
                tracing::warn!(error = %e, "Rewarded ad prepare failed");
                Err(AppError::Ads(e.to_string()))
            }
        }
    }

    fn reprime_in_background(&self) {
        let ads = self.clone();
        tokio::spawn(async move {
            let _ = ads.prepare().await;
        });
    }

    /// Show a rewarded ad and wait for its outcome.
    ///
    /// Returns the reward when earned; `None` when no ad could be loaded,
    /// it failed to show, it was dismissed early or the window elapsed.
    pub async fn show(&self) -> Option<RewardItem> {
        if !self.is_ready() && self.prepare().await.is_err() {
            tracing::warn!("No rewarded ad available");
            return None;
        }

        // Attach before showing so no event is missed
        let mut events = self.mediation.subscribe();
        let deadline = Instant::now() + self.window;
        self.state.loaded.store(false, Ordering::SeqCst);

        if let Err(e) = self.mediation.show().await {
            tracing::warn!(error = %e, "Rewarded ad show failed");
            self.reprime_in_background();
            return None;
        }

        loop {
            match timeout_at(deadline, events.recv()).await {
                Ok(Ok(AdEvent::Rewarded(reward))) => {
                    tracing::info!(kind = %reward.kind, amount = reward.amount, "Ad reward earned");
                    self.reprime_after_dismissal(events, deadline);
                    return Some(reward);
                }
                Ok(Ok(AdEvent::Dismissed)) => {
                    tracing::info!("Ad dismissed before reward");
                    self.reprime_in_background();
                    return None;
                }
                Ok(Ok(AdEvent::FailedToShow(reason))) => {
                    tracing::warn!(reason = %reason, "Ad failed to show");
                    return None;
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!(skipped, "Ad event listener lagged");
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => {
                    tracing::warn!("No ad outcome within listener window");
                    return None;
                }
            }
        }
    }

    /// Keep listening until the window closes; re-prime on dismissal.
    fn reprime_after_dismissal(&self, mut events: broadcast::Receiver<AdEvent>, deadline: Instant) {
        let ads = self.clone();
        tokio::spawn(async move {
            loop {
                match timeout_at(deadline, events.recv()).await {
                    Ok(Ok(AdEvent::Dismissed)) => {
                        let _ = ads.prepare().await;
                        return;
                    }
                    Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => continue,
                    Ok(Err(RecvError::Closed)) | Err(_) => return,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    /// Mediation fake that replays a fixed event script on `show()`.
    struct ScriptedAds {
        script: Mutex<Vec<AdEvent>>,
        prepare_ok: bool,
        prepares: AtomicU32,
        events: broadcast::Sender<AdEvent>,
    }

    impl ScriptedAds {
        fn new(script: Vec<AdEvent>, prepare_ok: bool) -> Arc<Self> {
            let (events, _) = broadcast::channel(8);
            Arc::new(Self {
                script: Mutex::new(script),
                prepare_ok,
                prepares: AtomicU32::new(0),
                events,
            })
        }
    }

    #[async_trait]
    impl AdMediation for ScriptedAds {
        async fn initialize(&self, _testing: bool) -> Result<()> {
            Ok(())
        }

        async fn prepare(&self, _ad_unit_id: &str) -> Result<()> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            if self.prepare_ok {
                Ok(())
            } else {
                Err(AppError::Ads("no fill".to_string()))
            }
        }

        async fn show(&self) -> Result<()> {
            for event in self.script.lock().unwrap().drain(..) {
                let _ = self.events.send(event);
            }
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
            self.events.subscribe()
        }
    }

    fn coins() -> RewardItem {
        RewardItem {
            kind: "coins".to_string(),
            amount: 1,
        }
    }

    #[test]
    fn test_unit_selection() {
        let units = AdUnits {
            android: "android-unit".to_string(),
            ios: "ios-unit".to_string(),
        };

        assert_eq!(units.select(Platform::Android, false), "android-unit");
        assert_eq!(units.select(Platform::Ios, false), "ios-unit");
        assert_eq!(units.select(Platform::Web, false), TEST_REWARDED_AD_UNIT);
        assert_eq!(units.select(Platform::Ios, true), TEST_REWARDED_AD_UNIT);
    }

    #[tokio::test]
    async fn test_reward_returned() {
        let mediation = ScriptedAds::new(
            vec![AdEvent::Rewarded(coins()), AdEvent::Dismissed],
            true,
        );
        let ads = RewardedAds::new(mediation.clone(), &Config::default());
        ads.initialize().await.unwrap();

        assert_eq!(ads.show().await, Some(coins()));
    }

    #[tokio::test]
    async fn test_dismiss_without_reward() {
        let mediation = ScriptedAds::new(vec![AdEvent::Dismissed], true);
        let ads = RewardedAds::new(mediation.clone(), &Config::default());
        ads.initialize().await.unwrap();

        assert_eq!(ads.show().await, None);
    }

    #[tokio::test]
    async fn test_failed_to_show() {
        let mediation = ScriptedAds::new(vec![AdEvent::FailedToShow("internal".to_string())], true);
        let ads = RewardedAds::new(mediation, &Config::default());

        assert_eq!(ads.show().await, None);
    }

    #[tokio::test]
    async fn test_no_fill_returns_none() {
        let mediation = ScriptedAds::new(vec![AdEvent::Rewarded(coins())], false);
        let ads = RewardedAds::new(mediation.clone(), &Config::default());

        assert_eq!(ads.show().await, None);
        assert_eq!(mediation.prepares.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_sdk_times_out() {
        let mediation = ScriptedAds::new(vec![], true);
        let ads = RewardedAds::new(mediation, &Config::default());

        assert_eq!(ads.show().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_ad_rewards_coins() {
        let ads = RewardedAds::new(Arc::new(SimulatedAds::default()), &Config::default());
        ads.initialize().await.unwrap();

        assert_eq!(ads.show().await, Some(coins()));
    }

    #[tokio::test]
    async fn test_initialize_once() {
        let mediation = ScriptedAds::new(vec![], true);
        let ads = RewardedAds::new(mediation.clone(), &Config::default());
        ads.initialize().await.unwrap();
        ads.initialize().await.unwrap();

        assert_eq!(mediation.prepares.load(Ordering::SeqCst), 1);
        assert!(ads.is_ready());
    }
}
