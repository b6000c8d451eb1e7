// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static checks on the database migration the client relies on.

use altilizeka::models::WELCOME_BONUS_DESCRIPTION;

const UNLOCK_MIGRATION: &str =
    include_str!("../supabase/migrations/20260115000000_unlock_coupon.sql");

/// Statements with comments stripped and whitespace collapsed.
fn statements(sql: &str) -> Vec<String> {
    let code: String = sql
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    code.split(';')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[test]
fn test_clients_cannot_update_balance() {
    let statements = statements(UNLOCK_MIGRATION);

    assert!(statements
        .iter()
        .any(|s| s == "revoke update on public.profiles from authenticated"));
    assert!(statements.iter().any(|s| s
        == "grant update (display_name, avatar_url) on public.profiles to authenticated"));

    // Column revokes leave a table-wide update grant in force
    assert!(!statements
        .iter()
        .any(|s| s.starts_with("revoke update (") && s.contains("public.profiles")));
    assert!(!statements
        .iter()
        .any(|s| s.starts_with("grant update") && s.contains("star_balance")));
}

#[test]
fn test_ledger_writes_stay_server_side() {
    let statements = statements(UNLOCK_MIGRATION);

    for table in ["public.star_transactions", "public.user_coupons"] {
        let revoke = format!("revoke insert on {} from authenticated", table);
        assert!(statements.contains(&revoke), "missing: {}", revoke);
    }
}

#[test]
fn test_new_profiles_get_bonus_ledger_row() {
    let statements = statements(UNLOCK_MIGRATION);

    assert!(statements.iter().any(|s| s.starts_with("create trigger profiles_welcome_bonus")
        && s.contains("after insert on public.profiles")));
    assert!(UNLOCK_MIGRATION.contains(&format!("'bonus', '{}'", WELCOME_BONUS_DESCRIPTION)));
}
