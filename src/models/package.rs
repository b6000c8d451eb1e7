// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Star packages sold through the app stores.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Platform;

/// Row in `star_packages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StarPackage {
    pub id: String,
    pub name: String,
    pub stars: i32,
    pub price_tl: f64,
    pub ios_product_id: String,
    pub android_product_id: String,
    #[serde(default)]
    pub is_popular: bool,
}

impl StarPackage {
    /// Store product id for the given platform (none on web).
    pub fn product_id(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Ios => Some(&self.ios_product_id),
            Platform::Android => Some(&self.android_product_id),
            Platform::Web => None,
        }
    }
}
