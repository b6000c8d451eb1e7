//! Application configuration loaded from environment variables.
//!
//! The host shell bakes these into the build (or a `.env` file during
//! development); nothing here is secret beyond the public anon key.

use std::env;
use std::time::Duration;

/// Google's public rewarded-ad test unit.
pub const TEST_REWARDED_AD_UNIT: &str = "ca-app-pub-3940256099942544/5224354917";

/// Stars granted to every new profile.
pub const DEFAULT_WELCOME_BONUS: i32 = 50;

/// Runtime platform of the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl Platform {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "android" => Some(Platform::Android),
            "ios" => Some(Platform::Ios),
            "web" => Some(Platform::Web),
            _ => None,
        }
    }

    /// Whether native store and ad SDKs are available.
    pub fn is_native(&self) -> bool {
        !matches!(self, Platform::Web)
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Backend ---
    /// Base URL of the hosted backend (e.g. https://xyz.supabase.co)
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request
    pub supabase_anon_key: String,

    // --- Runtime ---
    pub platform: Platform,
    /// Development build: forces test ad units
    pub dev_mode: bool,
    /// Path of the device-local flag database
    pub local_db_path: String,

    // --- Ads ---
    pub android_rewarded_unit: String,
    pub ios_rewarded_unit: String,
    /// How long reward listeners stay attached after `show()`
    pub ad_listener_window: Duration,

    // --- Purchases ---
    pub revenuecat_apple_key: Option<String>,
    pub revenuecat_google_key: Option<String>,

    // --- Paywall ---
    pub welcome_bonus: i32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            platform: Platform::Web,
            dev_mode: true,
            local_db_path: "altilizeka.redb".to_string(),
            android_rewarded_unit: TEST_REWARDED_AD_UNIT.to_string(),
            ios_rewarded_unit: TEST_REWARDED_AD_UNIT.to_string(),
            ad_listener_window: Duration::from_secs(60),
            revenuecat_apple_key: None,
            revenuecat_google_key: None,
            welcome_bonus: DEFAULT_WELCOME_BONUS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let platform = match env::var("APP_PLATFORM") {
            Ok(v) => Platform::parse(&v).ok_or(ConfigError::Invalid("APP_PLATFORM"))?,
            Err(_) => Platform::Web,
        };

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            platform,
            dev_mode: env::var("APP_DEV")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            local_db_path: env::var("LOCAL_DB_PATH")
                .unwrap_or_else(|_| "altilizeka.redb".to_string()),
            android_rewarded_unit: env::var("ADMOB_ANDROID_REWARDED_UNIT")
                .unwrap_or_else(|_| TEST_REWARDED_AD_UNIT.to_string()),
            ios_rewarded_unit: env::var("ADMOB_IOS_REWARDED_UNIT")
                .unwrap_or_else(|_| TEST_REWARDED_AD_UNIT.to_string()),
            ad_listener_window: Duration::from_secs(
                env::var("AD_LISTENER_WINDOW_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            revenuecat_apple_key: env::var("REVENUECAT_APPLE_KEY").ok(),
            revenuecat_google_key: env::var("REVENUECAT_GOOGLE_KEY").ok(),
            welcome_bonus: env::var("WELCOME_BONUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WELCOME_BONUS),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
