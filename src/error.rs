// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

/// Application error type surfaced to the view layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stars: balance {balance}, cost {cost}")]
    InsufficientStars { balance: i32, cost: i32 },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Ad error: {0}")]
    Ads(String),

    #[error("Purchase error: {0}")]
    Purchases(String),

    #[error("Local storage error: {0}")]
    LocalStorage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker used by the HTTP client when the backend rejects a session token.
    pub const SESSION_EXPIRED: &'static str = "session_expired";

    /// Whether this error means the current session is no longer usable.
    pub fn is_auth_error(&self) -> bool {
        match self {
            AppError::Unauthorized => true,
            AppError::Backend(msg) => msg.contains(Self::SESSION_EXPIRED) || msg.contains("JWT"),
            _ => false,
        }
    }

    /// Short Turkish message suitable for inline form errors and alerts.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Devam etmek için giriş yapın.".to_string(),
            AppError::InvalidCredentials(_) => "E-posta veya şifre hatalı.".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(_) => "Bulunamadı.".to_string(),
            AppError::InsufficientStars { cost, .. } => {
                format!("Bu kuponu açmak için {} yıldız gerekiyor.", cost)
            }
            AppError::Ads(_) => "Reklam tamamlanamadı. Tekrar deneyin.".to_string(),
            AppError::Purchases(_) => "Satın alma tamamlanamadı.".to_string(),
            AppError::Conflict(_) | AppError::Backend(_) => {
                tracing::error!(error = %self, "Remote operation failed");
                "Bir hata oluştu. Lütfen tekrar deneyin.".to_string()
            }
            AppError::LocalStorage(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                "Bir hata oluştu. Lütfen tekrar deneyin.".to_string()
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        AppError::Validation(format!("Geçersiz alanlar: {}", fields.join(", ")))
    }
}

impl From<redb::Error> for AppError {
    fn from(err: redb::Error) -> Self {
        AppError::LocalStorage(err.to_string())
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, AppError>;
