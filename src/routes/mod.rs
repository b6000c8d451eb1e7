// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Screen routes of the host shell and who may open them.

use std::fmt;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, at any time
    Public,
    /// Signed-in users only
    Authenticated,
    /// Visitors only (sign-in and sign-up screens)
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Onboarding,
    Login,
    Signup,
    Home,
    Coupon(String),
    Stars,
    Wallet,
    Stats,
    Profile,
    MyCoupons,
    StarHistory,
    Privacy,
    Terms,
    Faq,
    AccountDeletion,
}

impl Route {
    /// Parse a path; query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Home,
            "/onboarding" => Route::Onboarding,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/stars" => Route::Stars,
            "/wallet" => Route::Wallet,
            "/stats" => Route::Stats,
            "/profile" => Route::Profile,
            "/my-coupons" => Route::MyCoupons,
            "/star-history" => Route::StarHistory,
            "/privacy" => Route::Privacy,
            "/terms" => Route::Terms,
            "/faq" => Route::Faq,
            "/account-deletion" => Route::AccountDeletion,
            other => {
                let id = other.strip_prefix("/coupon/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Route::Coupon(id.to_string())
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Onboarding => "/onboarding".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Home => "/".to_string(),
            Route::Coupon(id) => format!("/coupon/{}", id),
            Route::Stars => "/stars".to_string(),
            Route::Wallet => "/wallet".to_string(),
            Route::Stats => "/stats".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::MyCoupons => "/my-coupons".to_string(),
            Route::StarHistory => "/star-history".to_string(),
            Route::Privacy => "/privacy".to_string(),
            Route::Terms => "/terms".to_string(),
            Route::Faq => "/faq".to_string(),
            Route::AccountDeletion => "/account-deletion".to_string(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Onboarding | Route::Home | Route::Privacy | Route::Terms => Access::Public,
            Route::Login | Route::Signup => Access::Anonymous,
            Route::Coupon(_)
            | Route::Stars
            | Route::Wallet
            | Route::Stats
            | Route::Profile
            | Route::MyCoupons
            | Route::StarHistory
            | Route::Faq
            | Route::AccountDeletion => Access::Authenticated,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
