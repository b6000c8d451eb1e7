// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observable client-side state.

pub mod entitlement;
pub mod session;

pub use entitlement::{EntitlementSnapshot, EntitlementStore};
pub use session::{SessionSnapshot, SessionState, SessionStore};
