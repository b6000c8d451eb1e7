// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard: decides whether a screen may open for the current session.

use crate::db::LocalFlags;
use crate::routes::{Access, Route};
use crate::stores::{SessionSnapshot, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a loading state
    Wait,
    Allow,
    Redirect(Route),
}

/// Pure decision for a route given the session and the onboarding flag.
pub fn evaluate(route: &Route, session: &SessionSnapshot, onboarding_complete: bool) -> GuardDecision {
    let access = route.access();
    if access == Access::Public {
        return GuardDecision::Allow;
    }

    if session.is_loading {
        return GuardDecision::Wait;
    }

    match (access, session.is_authenticated()) {
        (Access::Authenticated, false) => GuardDecision::Redirect(Route::Login),
        (Access::Anonymous, true) => GuardDecision::Redirect(Route::Home),
        (Access::Anonymous, false) if *route == Route::Login && !onboarding_complete => {
            GuardDecision::Redirect(Route::Onboarding)
        }
        _ => GuardDecision::Allow,
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    session: SessionStore,
    flags: LocalFlags,
}

impl RouteGuard {
    pub fn new(session: SessionStore, flags: LocalFlags) -> Self {
        Self { session, flags }
    }

    /// Decide for a raw path. Unknown paths go home.
    pub fn check_path(&self, path: &str) -> GuardDecision {
        match Route::parse(path) {
            Some(route) => self.check(&route),
            None => {
                tracing::debug!(path, "Unknown route");
                GuardDecision::Redirect(Route::Home)
            }
        }
    }

    pub fn check(&self, route: &Route) -> GuardDecision {
        let onboarding_complete = self.flags.onboarding_complete().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read onboarding flag");
            false
        });
        evaluate(route, &self.session.snapshot(), onboarding_complete)
    }
}
