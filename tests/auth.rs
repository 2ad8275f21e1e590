use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use croquettes_shop::{
    config::AppConfig,
    dto::auth::RegisterRequest,
    entity::users::{self, UserRole},
    error::AppError,
    middleware::auth::{bearer_token, decode_token, ensure_staff, ensure_superuser, issue_token},
    services::auth_service::{hash_password, validate_registration, verify_password},
};
use uuid::Uuid;

fn user(role: UserRole) -> users::Model {
    users::Model {
        id: Uuid::new_v4(),
        username: "moussa".into(),
        email: "moussa@example.com".into(),
        password_hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        role,
        created_at: Utc::now().fixed_offset(),
    }
}

fn registration(username: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.into(),
        email: email.into(),
        password: password.into(),
        first_name: String::new(),
        last_name: String::new(),
        phone: None,
    }
}

#[test]
fn issued_tokens_decode_to_the_same_user() {
    let config = AppConfig::with_defaults("postgres://unused", "test-secret");
    let account = user(UserRole::Staff);

    let token = issue_token(&config, &account).expect("token");
    let auth = decode_token(&config.jwt_secret, &token).expect("decode");

    assert_eq!(auth.user_id, account.id);
    assert_eq!(auth.username, "moussa");
    assert!(auth.is_staff());
    assert!(!auth.is_superuser());
}

#[test]
fn tokens_signed_with_another_secret_are_rejected() {
    let config = AppConfig::with_defaults("postgres://unused", "test-secret");
    let token = issue_token(&config, &user(UserRole::Customer)).expect("token");

    assert!(matches!(
        decode_token("another-secret", &token),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn role_guards() {
    let config = AppConfig::with_defaults("postgres://unused", "test-secret");
    let decode = |role| {
        let token = issue_token(&config, &user(role)).expect("token");
        decode_token(&config.jwt_secret, &token).expect("decode")
    };

    let customer = decode(UserRole::Customer);
    let staff = decode(UserRole::Staff);
    let superuser = decode(UserRole::Superuser);

    assert!(matches!(ensure_staff(&customer), Err(AppError::Forbidden)));
    assert!(ensure_staff(&staff).is_ok());
    assert!(ensure_staff(&superuser).is_ok());
    assert!(matches!(ensure_superuser(&staff), Err(AppError::Forbidden)));
    assert!(ensure_superuser(&superuser).is_ok());
}

#[test]
fn bearer_token_parsing() {
    let mut headers = HeaderMap::new();
    assert!(bearer_token(&headers).is_none());

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
    assert_eq!(bearer_token(&headers).expect("present").expect("valid"), "abc.def");

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
    assert!(matches!(
        bearer_token(&headers),
        Some(Err(AppError::BadRequest(_)))
    ));
}

#[test]
fn registration_validation() {
    let check = |username, email, password| {
        validate_registration(&registration(username, email, password)).is_ok()
    };

    assert!(check("fatou", "fatou@example.com", "croquettes"));
    assert!(!check("", "fatou@example.com", "croquettes"));
    assert!(!check("fa tou", "fatou@example.com", "croquettes"));
    assert!(!check("fatou", "not-an-email", "croquettes"));
    assert!(!check("fatou", "fatou@example.com", "short"));
}

#[test]
fn password_hashes_verify() {
    let hash = hash_password("croquettes").expect("hash");
    assert!(verify_password("croquettes", &hash).expect("verify"));
    assert!(!verify_password("patee", &hash).expect("verify"));
}
