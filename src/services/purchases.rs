// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app purchases of star packages.
//!
//! The store SDK is reached through [`PurchaseAdapter`]. Stars are credited
//! server-side by the store's webhook; after a completed purchase the
//! profile is re-fetched so the cached balance shows the credited amount.

use crate::config::{Config, Platform};
use crate::db::RemoteStore;
use crate::error::{AppError, Result};
use crate::models::StarPackage;
use crate::stores::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store product behind a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    /// Store product id (matches `ios_product_id` / `android_product_id`)
    pub identifier: String,
    /// Localized price, e.g. "₺49,99"
    pub price_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePackage {
    pub identifier: String,
    pub product: StoreProduct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub identifier: String,
    pub packages: Vec<StorePackage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub app_user_id: String,
    #[serde(default)]
    pub active_entitlements: Vec<String>,
}

/// Result of a purchase attempt. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Completed(CustomerInfo),
    Cancelled,
}

/// In-app purchase SDK.
#[async_trait]
pub trait PurchaseAdapter: Send + Sync {
    async fn configure(&self, api_key: &str, app_user_id: Option<&str>) -> Result<()>;

    /// Current offering, if one is configured in the store dashboard.
    async fn current_offering(&self) -> Result<Option<Offering>>;

    async fn purchase(&self, package: &StorePackage) -> Result<PurchaseOutcome>;

    async fn restore(&self) -> Result<CustomerInfo>;
}

/// A package row joined with its store package (absent on web or when the
/// store does not list the product).
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub package: StarPackage,
    pub store_package: Option<StorePackage>,
}

#[derive(Clone)]
pub struct PurchaseService {
    /// `None` on builds without a store SDK
    adapter: Option<Arc<dyn PurchaseAdapter>>,
    platform: Platform,
    apple_key: Option<String>,
    google_key: Option<String>,
    remote: Arc<dyn RemoteStore>,
    session: SessionStore,
    configured: Arc<AtomicBool>,
    /// App user the SDK was last configured for; outer `None` until the
    /// first successful configuration
    configured_for: Arc<Mutex<Option<Option<String>>>>,
}

impl PurchaseService {
    pub fn new(
        adapter: Option<Arc<dyn PurchaseAdapter>>,
        config: &Config,
        remote: Arc<dyn RemoteStore>,
        session: SessionStore,
    ) -> Self {
        Self {
            adapter,
            platform: config.platform,
            apple_key: config.revenuecat_apple_key.clone(),
            google_key: config.revenuecat_google_key.clone(),
            remote,
            session,
            configured: Arc::new(AtomicBool::new(false)),
            configured_for: Arc::new(Mutex::new(None)),
        }
    }

    /// SDK key for the running platform.
    pub fn api_key(&self) -> Option<&str> {
        match self.platform {
            Platform::Ios => self.apple_key.as_deref(),
            Platform::Android => self.google_key.as_deref(),
            Platform::Web => None,
        }
    }

    fn native_adapter(&self) -> Option<&Arc<dyn PurchaseAdapter>> {
        if self.platform.is_native() {
            self.adapter.as_ref()
        } else {
            None
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    /// Configure the SDK for the signed-in user. Skipped on web.
    pub async fn configure(&self, app_user_id: Option<&str>) -> Result<()> {
        let Some(adapter) = self.native_adapter() else {
            tracing::info!(platform = ?self.platform, "Skipping purchase SDK configuration");
            return Ok(());
        };

        let mut configured_for = self.configured_for.lock().await;
        self.configure_locked(adapter, &mut configured_for, app_user_id)
            .await
    }

    /// Reconfigure the SDK only if `app_user_id` differs from the user it
    /// was last configured for. Quiet no-op on web.
    pub async fn sync_user(&self, app_user_id: Option<&str>) -> Result<()> {
        let Some(adapter) = self.native_adapter() else {
            return Ok(());
        };

        let mut configured_for = self.configured_for.lock().await;
        if configured_for
            .as_ref()
            .is_some_and(|current| current.as_deref() == app_user_id)
        {
            return Ok(());
        }
        self.configure_locked(adapter, &mut configured_for, app_user_id)
            .await
    }

    async fn configure_locked(
        &self,
        adapter: &Arc<dyn PurchaseAdapter>,
        configured_for: &mut Option<Option<String>>,
        app_user_id: Option<&str>,
    ) -> Result<()> {
        let api_key = self
            .api_key()
            .ok_or_else(|| AppError::Purchases("No purchase API key for platform".to_string()))?;

        adapter.configure(api_key, app_user_id).await?;
        *configured_for = Some(app_user_id.map(String::from));
        self.configured.store(true, Ordering::SeqCst);
        tracing::info!(app_user_id, "Purchase SDK configured");
        Ok(())
    }

    /// Current offering; `None` on web or on any SDK error.
    pub async fn current_offering(&self) -> Option<Offering> {
        let adapter = self.native_adapter()?;
        match adapter.current_offering().await {
            Ok(offering) => offering,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch offerings");
                None
            }
        }
    }

    /// Buy a package, then refresh the profile to pick up the credit.
    ///
    /// The SDK is pointed at the signed-in user first so the store webhook
    /// credits the right account.
    pub async fn purchase(&self, package: &StorePackage) -> Result<PurchaseOutcome> {
        let adapter = self.native_adapter().ok_or_else(|| {
            AppError::Purchases("Purchases are not available on this platform".to_string())
        })?;

        let user_id = self.session.profile().map(|p| p.id);
        self.sync_user(user_id.as_deref()).await?;

        let outcome = adapter.purchase(package).await.map_err(|e| {
            tracing::error!(package = %package.identifier, error = %e, "Purchase failed");
            e
        })?;

        match &outcome {
            PurchaseOutcome::Completed(_) => {
                tracing::info!(package = %package.identifier, "Purchase completed");
                if let Err(e) = self.session.fetch_profile().await {
                    tracing::warn!(error = %e, "Profile refresh after purchase failed");
                }
            }
            PurchaseOutcome::Cancelled => {
                tracing::info!(package = %package.identifier, "Purchase cancelled by user");
            }
        }
        Ok(outcome)
    }

    pub async fn restore(&self) -> Result<CustomerInfo> {
        let adapter = self.native_adapter().ok_or_else(|| {
            AppError::Purchases("Purchases are not available on this platform".to_string())
        })?;
        let info = adapter.restore().await?;
        tracing::info!(app_user_id = %info.app_user_id, "Purchases restored");
        Ok(info)
    }

    /// Star packages joined to store packages by platform product id.
    pub async fn catalog(&self) -> Result<Vec<CatalogEntry>> {
        let packages = self.remote.star_packages().await?;
        let offering = self.current_offering().await;

        Ok(packages
            .into_iter()
            .map(|package| {
                let store_package = match (package.product_id(self.platform), &offering) {
                    (Some(product_id), Some(offering)) => offering
                        .packages
                        .iter()
                        .find(|p| p.product.identifier == product_id)
                        .cloned(),
                    _ => None,
                };
                CatalogEntry {
                    package,
                    store_package,
                }
            })
            .collect())
    }
}
