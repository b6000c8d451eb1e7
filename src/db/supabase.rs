// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the hosted backend.
//!
//! Handles:
//! - Password sign-in / sign-up / sign-out against the auth endpoints
//! - Session persistence and refresh shortly before expiry
//! - Table reads and writes through the REST endpoint
//! - The `unlock_coupon` and `delete_account_data` server functions

use crate::auth::{AuthEvent, AuthProvider, AuthUser, Credentials, Session};
use crate::config::Config;
use crate::db::local::LocalFlags;
use crate::db::{rpc, tables, RemoteStore};
use crate::error::{AppError, Result};
use crate::models::{
    Coupon, CouponSummary, NewProfile, StarPackage, StarTransaction, UnlockReceipt, UserProfile,
};
use crate::time_utils::format_day;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, Mutex};

const EVENT_CAPACITY: usize = 16;

/// Token grant response from the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        Session {
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user: self.user,
        }
    }
}

/// Sign-up returns a session when e-mail confirmation is off, else the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Error body of the auth endpoints (field names vary by version).
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AuthErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn text(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Authentication failed".to_string())
    }
}

/// Error body of the REST endpoint.
#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StarsShortfall {
    balance: i32,
    cost: i32,
}

/// Map a failed REST response to an application error.
fn rest_error(status: u16, body: &str) -> AppError {
    let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.clone().unwrap_or_else(|| body.to_string());

    // Exceptions raised by the server functions
    match message.as_str() {
        "not_authenticated" => return AppError::Unauthorized,
        "coupon_not_found" => return AppError::NotFound("Coupon".to_string()),
        "profile_not_found" => return AppError::NotFound("Profile".to_string()),
        "insufficient_stars" => {
            if let Some(shortfall) = parsed
                .details
                .as_deref()
                .and_then(|d| serde_json::from_str::<StarsShortfall>(d).ok())
            {
                return AppError::InsufficientStars {
                    balance: shortfall.balance,
                    cost: shortfall.cost,
                };
            }
        }
        _ => {}
    }

    match status {
        401 => AppError::Backend(format!("{}: {}", AppError::SESSION_EXPIRED, message)),
        404 => AppError::NotFound(message),
        409 => AppError::Conflict(message),
        _ => AppError::Backend(format!(
            "HTTP {} ({}): {}",
            status,
            parsed.code.as_deref().unwrap_or("-"),
            message
        )),
    }
}

/// Map a failed auth response to an application error.
fn auth_error(status: u16, body: &str) -> AppError {
    let parsed = AuthErrorBody::parse(body);
    match status {
        400 => AppError::InvalidCredentials(parsed.text()),
        401 | 403 => AppError::Unauthorized,
        422 if parsed.error_code.as_deref() == Some("user_already_exists") => {
            AppError::Conflict(parsed.text())
        }
        422 => AppError::Validation(parsed.text()),
        429 => AppError::Backend("Too many requests".to_string()),
        _ => AppError::Backend(format!("HTTP {}: {}", status, parsed.text())),
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[derive(Debug, Deserialize)]
struct PurchasedRow {
    coupon_id: String,
    #[serde(default)]
    coupons: Option<Coupon>,
}

#[derive(Debug, Deserialize)]
struct CouponIdRow {
    coupon_id: String,
}

#[derive(Serialize)]
struct UnlockArgs<'a> {
    p_coupon_id: &'a str,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    /// Serializes token refreshes
    refresh_lock: Mutex<()>,
    flags: LocalFlags,
    events: broadcast::Sender<AuthEvent>,
}

/// Client for the hosted auth and table service.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<Inner>,
}

impl SupabaseClient {
    /// Create a client and restore any persisted session.
    pub fn new(config: &Config, flags: LocalFlags) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let client = Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                base_url: config.supabase_url.clone(),
                anon_key: config.supabase_anon_key.clone(),
                session: RwLock::new(None),
                refresh_lock: Mutex::new(()),
                flags,
                events,
            }),
        };
        client.restore_session();
        client
    }

    fn restore_session(&self) {
        match self.inner.flags.load_session() {
            Ok(Some(session)) if session.is_consistent() => {
                tracing::info!(user_id = %session.user.id, "Restored stored session");
                self.set_session(Some(session));
            }
            Ok(Some(_)) => {
                tracing::warn!("Stored session does not match its token, discarding");
                if let Err(e) = self.inner.flags.clear_session() {
                    tracing::warn!(error = %e, "Failed to clear stored session");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored session"),
        }
    }

    fn session(&self) -> Option<Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the in-memory session and mirror it to local storage.
    fn set_session(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(s) => self.inner.flags.save_session(s),
            None => self.inner.flags.clear_session(),
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        *self.inner.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.inner.events.send(event);
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.inner.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.inner.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.inner.base_url, function)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Access token of the current session, refreshed if close to expiry.
    async fn access_token(&self) -> Result<String> {
        let session = self.session().ok_or(AppError::Unauthorized)?;
        if !session.is_expiring(Utc::now()) {
            return Ok(session.access_token);
        }

        let _guard = self.inner.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        let session = self.session().ok_or(AppError::Unauthorized)?;
        if !session.is_expiring(Utc::now()) {
            return Ok(session.access_token);
        }

        tracing::info!(user_id = %session.user.id, "Access token expiring, refreshing");

        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.inner.anon_key)
            .json(&serde_json::json!({ "refresh_token": session.refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            // Refresh token revoked or reused
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Token refresh rejected");
            self.set_session(None);
            self.emit(AuthEvent::SignedOut);
            return Err(AppError::Unauthorized);
        }

        let tokens: TokenResponse = self.check_auth_json(response).await?;
        let refreshed = tokens.into_session(Utc::now().timestamp());
        let access_token = refreshed.access_token.clone();
        self.set_session(Some(refreshed));
        self.emit(AuthEvent::TokenRefreshed);

        tracing::info!("Token refreshed");
        Ok(access_token)
    }

    /// Bearer for table requests: the user's token, else the anon key.
    async fn bearer(&self) -> Result<String> {
        if self.session().is_some() {
            self.access_token().await
        } else {
            Ok(self.inner.anon_key.clone())
        }
    }

    async fn check_auth_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
    }

    async fn check_rest(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 401 {
            tracing::warn!("Backend rejected session token (401)");
        }
        Err(rest_error(status, &body))
    }

    async fn check_rest_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        self.check_rest(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
    }

    // ─── REST helpers ────────────────────────────────────────────────────────

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .inner
            .http
            .get(self.rest_url(table))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(self.bearer().await?)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        self.check_rest_json(response).await
    }

    async fn call_rpc<B: Serialize + ?Sized>(
        &self,
        function: &str,
        args: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .inner
            .http
            .post(self.rpc_url(function))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(self.access_token().await?)
            .json(args)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("RPC {} failed: {}", function, e)))?;

        self.check_rest(response).await
    }

    /// Id of the signed-in user, checked against the requested one.
    fn require_user(&self, user_id: &str) -> Result<()> {
        match self.session() {
            Some(s) if s.user.id == user_id => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.inner.anon_key)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Sign-in request failed: {}", e)))?;

        let tokens: TokenResponse = self.check_auth_json(response).await?;
        let session = tokens.into_session(Utc::now().timestamp());
        let user = session.user.clone();
        self.set_session(Some(session));
        self.emit(AuthEvent::SignedIn);

        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthUser> {
        let response = self
            .inner
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.inner.anon_key)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Sign-up request failed: {}", e)))?;

        match self.check_auth_json(response).await? {
            SignUpResponse::Session(tokens) => {
                let session = tokens.into_session(Utc::now().timestamp());
                let user = session.user.clone();
                self.set_session(Some(session));
                self.emit(AuthEvent::SignedIn);
                tracing::info!(user_id = %user.id, "Signed up");
                Ok(user)
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signed up, awaiting e-mail confirmation");
                Ok(user)
            }
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let remote = match self.session() {
            Some(session) => {
                let result = self
                    .inner
                    .http
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.inner.anon_key)
                    .bearer_auth(&session.access_token)
                    .send()
                    .await
                    .map_err(|e| AppError::Backend(format!("Sign-out request failed: {}", e)));
                match result {
                    Ok(response) if !response.status().is_success() => {
                        let status = response.status().as_u16();
                        let body = response.text().await.unwrap_or_default();
                        Err(auth_error(status, &body))
                    }
                    Ok(_) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            None => Ok(()),
        };

        // The local session ends regardless of the remote outcome
        self.set_session(None);
        self.emit(AuthEvent::SignedOut);
        remote
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        if self.session().is_none() {
            return Ok(None);
        }

        let token = match self.access_token().await {
            Ok(token) => token,
            Err(AppError::Unauthorized) => return Ok(None),
            Err(e) => return Err(e),
        };

        let response = self
            .inner
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        if response.status().as_u16() == 401 {
            tracing::warn!("Stored session rejected by backend");
            self.set_session(None);
            return Ok(None);
        }

        let user: AuthUser = self.check_auth_json(response).await?;
        if let Some(mut session) = self.session() {
            session.user = user.clone();
            self.set_session(Some(session));
        }
        Ok(Some(user))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select(
                tables::PROFILES,
                &[("select", "*".to_string()), ("id", eq(user_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile> {
        let response = self
            .inner
            .http
            .post(self.rest_url(tables::PROFILES))
            .header("apikey", &self.inner.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.access_token().await?)
            .json(profile)
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        let rows: Vec<UserProfile> = self.check_rest_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Backend("Insert returned no rows".to_string()))
    }

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<()> {
        let response = self
            .inner
            .http
            .patch(self.rest_url(tables::PROFILES))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(self.access_token().await?)
            .query(&[("id", eq(user_id))])
            .json(&serde_json::json!({ "display_name": display_name }))
            .send()
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;

        self.check_rest(response).await?;
        Ok(())
    }

    async fn coupons_for_date(&self, date: NaiveDate) -> Result<Vec<Coupon>> {
        self.select(
            tables::COUPONS,
            &[
                ("select", "*".to_string()),
                ("date", eq(&format_day(date))),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn get_coupon(&self, coupon_id: &str) -> Result<Option<Coupon>> {
        let rows: Vec<Coupon> = self
            .select(
                tables::COUPONS,
                &[("select", "*".to_string()), ("id", eq(coupon_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn coupons_before(&self, before: NaiveDate, limit: u32) -> Result<Vec<Coupon>> {
        self.select(
            tables::COUPONS,
            &[
                ("select", "*".to_string()),
                ("date", format!("lt.{}", format_day(before))),
                ("order", "date.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn coupon_summaries(&self) -> Result<Vec<CouponSummary>> {
        self.select(tables::COUPONS, &[("select", "city,type".to_string())])
            .await
    }

    async fn purchased_coupon_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let rows: Vec<CouponIdRow> = self
            .select(
                tables::USER_COUPONS,
                &[("select", "coupon_id".to_string()), ("user_id", eq(user_id))],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.coupon_id).collect())
    }

    async fn purchased_coupons(&self, user_id: &str) -> Result<Vec<Coupon>> {
        let rows: Vec<PurchasedRow> = self
            .select(
                tables::USER_COUPONS,
                &[
                    ("select", "coupon_id,purchased_at,coupons(*)".to_string()),
                    ("user_id", eq(user_id)),
                    ("order", "purchased_at.desc".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                if row.coupons.is_none() {
                    tracing::warn!(coupon_id = %row.coupon_id, "Purchased coupon no longer exists");
                }
                row.coupons
            })
            .collect())
    }

    async fn unlock_coupon(&self, user_id: &str, coupon_id: &str) -> Result<UnlockReceipt> {
        self.require_user(user_id)?;

        let receipt: UnlockReceipt = self
            .call_rpc(rpc::UNLOCK_COUPON, &UnlockArgs { p_coupon_id: coupon_id })
            .await?
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))?;

        tracing::info!(
            user_id,
            coupon_id,
            star_balance = receipt.star_balance,
            already_owned = receipt.already_owned,
            "Coupon unlock confirmed"
        );
        Ok(receipt)
    }

    async fn transactions(&self, user_id: &str, limit: u32) -> Result<Vec<StarTransaction>> {
        self.select(
            tables::STAR_TRANSACTIONS,
            &[
                ("select", "*".to_string()),
                ("user_id", eq(user_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn star_packages(&self) -> Result<Vec<StarPackage>> {
        self.select(
            tables::STAR_PACKAGES,
            &[
                ("select", "*".to_string()),
                ("order", "stars.asc".to_string()),
            ],
        )
        .await
    }

    async fn delete_account_data(&self, user_id: &str) -> Result<()> {
        self.require_user(user_id)?;
        self.call_rpc(rpc::DELETE_ACCOUNT_DATA, &serde_json::json!({}))
            .await?;
        tracing::info!(user_id, "Account data deleted");
        Ok(())
    }
}
