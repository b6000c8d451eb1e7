// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use altilizeka::config::{Config, Platform};
use altilizeka::db::{LocalStore, MemoryBackend, MemoryStore};
use altilizeka::error::{AppError, Result};
use altilizeka::models::{Coupon, CouponTier, Horse, Leg, StarPackage};
use altilizeka::services::{
    AdEvent, AdMediation, CustomerInfo, Offering, PurchaseAdapter, PurchaseOutcome, RewardItem,
    StorePackage, StoreProduct,
};
use altilizeka::stores::SessionSnapshot;
use altilizeka::time_utils::ManualClock;
use altilizeka::{App, Collaborators};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const PASSWORD: &str = "secret123";

/// Race day the test clock starts on.
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
}

// ─── Ads fake ────────────────────────────────────────────────

/// Mediation fake replaying one scripted event list per `show()`.
pub struct ScriptedAds {
    scripts: Mutex<VecDeque<Vec<AdEvent>>>,
    pub shows: AtomicU32,
    events: broadcast::Sender<AdEvent>,
}

#[allow(dead_code)]
impl ScriptedAds {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(8);
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            shows: AtomicU32::new(0),
            events,
        })
    }

    pub fn will_reward(&self) {
        self.scripts.lock().unwrap().push_back(vec![
            AdEvent::Rewarded(RewardItem {
                kind: "coins".to_string(),
                amount: 1,
            }),
            AdEvent::Dismissed,
        ]);
    }

    pub fn will_be_dismissed(&self) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(vec![AdEvent::Dismissed]);
    }

    pub fn show_count(&self) -> u32 {
        self.shows.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdMediation for ScriptedAds {
    async fn initialize(&self, _testing: bool) -> Result<()> {
        Ok(())
    }

    async fn prepare(&self, _ad_unit_id: &str) -> Result<()> {
        Ok(())
    }

    async fn show(&self) -> Result<()> {
        self.shows.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        for event in script {
            let _ = self.events.send(event);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
        self.events.subscribe()
    }
}

// ─── Purchases fake ──────────────────────────────────────────

/// Store SDK fake; a completed purchase credits stars on the backend.
pub struct FakeStore {
    backend: MemoryBackend,
    offering: Option<Offering>,
    pub cancel_next: Mutex<bool>,
    pub configured_with: Mutex<Option<(String, Option<String>)>>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new(backend: MemoryBackend, offering: Option<Offering>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            offering,
            cancel_next: Mutex::new(false),
            configured_with: Mutex::new(None),
        })
    }

    /// App user of the last `configure`; `None` if never configured.
    pub fn configured_user(&self) -> Option<Option<String>> {
        self.configured_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl PurchaseAdapter for FakeStore {
    async fn configure(&self, api_key: &str, app_user_id: Option<&str>) -> Result<()> {
        *self.configured_with.lock().unwrap() =
            Some((api_key.to_string(), app_user_id.map(String::from)));
        Ok(())
    }

    async fn current_offering(&self) -> Result<Option<Offering>> {
        Ok(self.offering.clone())
    }

    async fn purchase(&self, package: &StorePackage) -> Result<PurchaseOutcome> {
        if std::mem::take(&mut *self.cancel_next.lock().unwrap()) {
            return Ok(PurchaseOutcome::Cancelled);
        }

        let user_id = self
            .configured_with
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|(_, user)| user.clone())
            .ok_or_else(|| AppError::Purchases("not configured".to_string()))?;

        let stars: i32 = package
            .identifier
            .trim_start_matches("stars_")
            .parse()
            .map_err(|_| AppError::Purchases("unknown package".to_string()))?;
        self.backend
            .credit_stars(&user_id, stars, &format!("{} yıldız", stars));

        Ok(PurchaseOutcome::Completed(CustomerInfo {
            app_user_id: user_id,
            active_entitlements: vec![],
        }))
    }

    async fn restore(&self) -> Result<CustomerInfo> {
        Ok(CustomerInfo::default())
    }
}

// ─── Test application ────────────────────────────────────────

pub struct TestApp {
    pub app: App,
    pub backend: MemoryBackend,
    pub clock: Arc<ManualClock>,
    pub local: Arc<MemoryStore>,
    pub ads: Arc<ScriptedAds>,
    #[allow(dead_code)]
    pub store: Option<Arc<FakeStore>>,
}

#[allow(dead_code)]
pub fn test_config(platform: Platform) -> Config {
    Config {
        platform,
        dev_mode: false,
        ad_listener_window: Duration::from_secs(5),
        revenuecat_apple_key: Some("appl_test".to_string()),
        revenuecat_google_key: Some("goog_test".to_string()),
        ..Config::default()
    }
}

/// Web build over an in-memory backend.
#[allow(dead_code)]
pub fn test_app() -> TestApp {
    build(Platform::Web, None)
}

/// Native build with a store SDK fake.
#[allow(dead_code)]
pub fn native_test_app(offering: Option<Offering>) -> TestApp {
    build(Platform::Android, Some(offering))
}

fn build(platform: Platform, offering: Option<Option<Offering>>) -> TestApp {
    let backend = MemoryBackend::new();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 1, 14, 9, 0, 0).unwrap(),
    ));
    let local = Arc::new(MemoryStore::new());
    let ads = ScriptedAds::new();
    let store = offering.map(|o| FakeStore::new(backend.clone(), o));

    let app = App::new(
        test_config(platform),
        Collaborators {
            auth: Arc::new(backend.clone()),
            remote: Arc::new(backend.clone()),
            local: local.clone() as Arc<dyn LocalStore>,
            ads: ads.clone(),
            purchases: store
                .clone()
                .map(|s| s as Arc<dyn PurchaseAdapter>),
            clock: clock.clone(),
        },
    );

    TestApp {
        app,
        backend,
        clock,
        local,
        ads,
        store,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Seed a user with a profile and sign them in.
    pub async fn signed_in(&self, email: &str, balance: i32) -> String {
        let id = self
            .backend
            .seed_user(email, PASSWORD, Some("Ayşe Demir"), balance);
        self.app
            .session
            .sign_in(altilizeka::auth::Credentials::new(email, PASSWORD))
            .await
            .unwrap();
        id
    }

    /// Wait until the session snapshot satisfies `pred`.
    pub async fn wait_for_session<F>(&self, pred: F) -> SessionSnapshot
    where
        F: Fn(&SessionSnapshot) -> bool,
    {
        let mut rx = self.app.session.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let current = rx.borrow_and_update().clone();
                if pred(&current) {
                    return current;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("session never reached the expected state")
    }
}

// ─── Fixtures ────────────────────────────────────────────────

#[allow(dead_code)]
pub fn coupon(id: &str, tier: CouponTier, star_cost: i32, date: NaiveDate) -> Coupon {
    Coupon {
        id: id.to_string(),
        date,
        city: "Adana".to_string(),
        tier,
        star_cost,
        title: format!("Adana Altılı {}", id),
        subtitle: None,
        status: None,
        winning_amount: None,
        legs: vec![],
        created_at: format!("{}T08:00:00Z", date),
    }
}

#[allow(dead_code)]
pub fn banko_coupon(id: &str, city: &str, horses: &[&str]) -> Coupon {
    let mut c = coupon(id, CouponTier::Premium, 50, today());
    c.city = city.to_string();
    c.legs = vec![Leg {
        leg_no: 1,
        race_time: "15:30".to_string(),
        race_info: Some("3 Yaşlı Araplar".to_string()),
        distance: Some("1400m".to_string()),
        field_size: 10,
        leg_result: None,
        actual_winner: None,
        horses: horses
            .iter()
            .enumerate()
            .map(|(i, name)| Horse {
                program_no: i as u32 + 1,
                horse_name: name.to_string(),
                jockey_name: None,
                last_6: Some("1-2-1-3-1-1".to_string()),
                ai_score: Some(92),
                is_banko: true,
                ai_note: Some("Form grafiği yükseliyor".to_string()),
            })
            .collect(),
    }];
    c
}

#[allow(dead_code)]
pub fn package(id: &str, stars: i32) -> StarPackage {
    StarPackage {
        id: id.to_string(),
        name: format!("{} Yıldız", stars),
        stars,
        price_tl: stars as f64 * 0.5,
        ios_product_id: format!("ios_stars_{}", stars),
        android_product_id: format!("android_stars_{}", stars),
        is_popular: stars == 250,
    }
}

#[allow(dead_code)]
pub fn store_package(stars: i32) -> StorePackage {
    StorePackage {
        identifier: format!("stars_{}", stars),
        product: StoreProduct {
            identifier: format!("android_stars_{}", stars),
            price_string: format!("₺{},99", stars / 2),
        },
    }
}
