// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation middleware.

pub mod guard;

pub use guard::{GuardDecision, RouteGuard};
