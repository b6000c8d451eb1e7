// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and the view layer.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Name shown when a profile has no display name.
pub const GUEST_DISPLAY_NAME: &str = "Misafir";

/// Profile row in the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    /// Auth user id (also the primary key)
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Star balance; must not go negative
    pub star_balance: i32,
    /// ISO 8601
    #[serde(default)]
    pub created_at: String,
}

impl UserProfile {
    /// Display name with the UI fallback applied.
    pub fn display_name_or_guest(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => GUEST_DISPLAY_NAME,
        }
    }

    /// Whether the display name is missing or blank.
    pub fn needs_display_name(&self) -> bool {
        self.display_name
            .as_deref()
            .map(|n| n.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Insert payload for a new profile.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub display_name: String,
    pub star_balance: i32,
    pub avatar_url: Option<String>,
}

impl NewProfile {
    /// Local projection used until (or instead of) the stored row.
    pub fn into_profile(self, created_at: String) -> UserProfile {
        UserProfile {
            id: self.id,
            display_name: Some(self.display_name),
            avatar_url: self.avatar_url,
            star_balance: self.star_balance,
            created_at,
        }
    }
}
