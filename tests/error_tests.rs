// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use altilizeka::auth::Credentials;
use altilizeka::error::AppError;
use validator::Validate;

#[test]
fn test_is_auth_error_matches() {
    assert!(AppError::Unauthorized.is_auth_error());

    let err = AppError::Backend(format!("{}: JWT expired", AppError::SESSION_EXPIRED));
    assert!(err.is_auth_error());

    let err = AppError::Backend("JWT expired".to_string());
    assert!(err.is_auth_error());
}

#[test]
fn test_is_auth_error_no_match() {
    let err = AppError::Backend("connection reset".to_string());
    assert!(!err.is_auth_error());

    let err = AppError::InvalidCredentials("Invalid login credentials".to_string());
    assert!(!err.is_auth_error());

    let err = AppError::InsufficientStars {
        balance: 10,
        cost: 50,
    };
    assert!(!err.is_auth_error());
}

#[test]
fn test_user_message_names_cost() {
    let err = AppError::InsufficientStars {
        balance: 10,
        cost: 50,
    };
    assert_eq!(err.user_message(), "Bu kuponu açmak için 50 yıldız gerekiyor.");
}

#[test]
fn test_user_messages_are_turkish() {
    assert_eq!(
        AppError::Unauthorized.user_message(),
        "Devam etmek için giriş yapın."
    );
    assert_eq!(
        AppError::Ads("dismissed".to_string()).user_message(),
        "Reklam tamamlanamadı. Tekrar deneyin."
    );
    assert_eq!(
        AppError::Purchases("store error".to_string()).user_message(),
        "Satın alma tamamlanamadı."
    );
    assert_eq!(
        AppError::NotFound("coupon c1".to_string()).user_message(),
        "Bulunamadı."
    );
}

#[test]
fn test_user_message_hides_provider_credential_text() {
    let err = AppError::InvalidCredentials("Invalid login credentials".to_string());
    assert_eq!(err.user_message(), "E-posta veya şifre hatalı.");
}

#[test]
fn test_user_message_hides_backend_details() {
    let err = AppError::Backend("relation \"profiles\" does not exist".to_string());
    assert_eq!(err.user_message(), "Bir hata oluştu. Lütfen tekrar deneyin.");

    let err = AppError::Internal(anyhow::anyhow!("poisoned"));
    assert!(!err.user_message().contains("poisoned"));
}

#[test]
fn test_validation_errors_list_fields_sorted() {
    let errors = Credentials::new("not-an-email", "123").validate().unwrap_err();
    let err = AppError::from(errors);

    match err {
        AppError::Validation(msg) => assert_eq!(msg, "Geçersiz alanlar: email, password"),
        other => panic!("expected Validation, got {:?}", other),
    }
}
