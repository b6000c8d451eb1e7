// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Star balance and recent ledger entries.

use crate::db::RemoteStore;
use crate::error::{AppError, Result};
use crate::models::{ledger_sum, StarTransaction};
use crate::stores::SessionStore;
use std::sync::Arc;

/// Entries shown in the wallet history.
pub const WALLET_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletView {
    pub star_balance: i32,
    /// Newest first
    pub transactions: Vec<StarTransaction>,
}

#[derive(Clone)]
pub struct WalletService {
    remote: Arc<dyn RemoteStore>,
    session: SessionStore,
}

impl WalletService {
    pub fn new(remote: Arc<dyn RemoteStore>, session: SessionStore) -> Self {
        Self { remote, session }
    }

    /// Balance and history. A failed history query yields an empty list.
    pub async fn view(&self) -> Result<WalletView> {
        let profile = self.session.profile().ok_or(AppError::Unauthorized)?;

        let transactions = match self
            .remote
            .transactions(&profile.id, WALLET_HISTORY_LIMIT)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(user_id = %profile.id, error = %e, "Failed to load transactions");
                Vec::new()
            }
        };

        // Only a complete history can be compared with the balance
        if !transactions.is_empty() && (transactions.len() as u32) < WALLET_HISTORY_LIMIT {
            let sum = ledger_sum(&transactions);
            if sum != i64::from(profile.star_balance) {
                tracing::warn!(
                    user_id = %profile.id,
                    ledger_sum = sum,
                    star_balance = profile.star_balance,
                    "Ledger does not match balance"
                );
            }
        }

        Ok(WalletView {
            star_balance: profile.star_balance,
            transactions,
        })
    }
}
