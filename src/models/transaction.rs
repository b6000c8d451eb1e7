// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Star ledger model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Ledger description of the welcome bonus a new profile starts with.
pub const WELCOME_BONUS_DESCRIPTION: &str = "Hoş geldin bonusu";

/// Why stars moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Spend,
    Bonus,
}

/// Append-only ledger entry in `star_transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StarTransaction {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    /// Signed: negative for spends
    pub amount: i32,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    /// ISO 8601
    pub created_at: String,
}

/// Sum of all ledger amounts.
pub fn ledger_sum(transactions: &[StarTransaction]) -> i64 {
    transactions.iter().map(|t| i64::from(t.amount)).sum()
}
