use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use croquettes_shop::{
    config::AppConfig,
    entity::users::{self, UserRole},
    error::AppError,
    middleware::auth::issue_token,
    routes::ws::authenticate,
};
use uuid::Uuid;

const SECRET: &str = "socket-secret";

fn account(username: &str) -> users::Model {
    users::Model {
        id: Uuid::new_v4(),
        username: username.into(),
        email: format!("{username}@example.com"),
        password_hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        role: UserRole::Customer,
        created_at: Utc::now().fixed_offset(),
    }
}

fn token_for(user: &users::Model) -> String {
    let config = AppConfig::with_defaults("postgres://unused", SECRET);
    issue_token(&config, user).expect("token")
}

#[test]
fn query_token_is_accepted_with_or_without_scheme() {
    let fatou = account("fatou");
    let token = token_for(&fatou);
    let headers = HeaderMap::new();

    let bare = authenticate(SECRET, &headers, Some(&token)).expect("bare token");
    assert_eq!(bare.user_id, fatou.id);

    let prefixed = format!("Bearer {token}");
    let with_scheme = authenticate(SECRET, &headers, Some(&prefixed)).expect("bearer token");
    assert_eq!(with_scheme.user_id, fatou.id);
}

#[test]
fn authorization_header_wins_over_query_token() {
    let header_user = account("ibrahima");
    let query_user = account("khady");
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token_for(&header_user))).expect("header"),
    );

    let auth = authenticate(SECRET, &headers, Some(&token_for(&query_user))).expect("auth");
    assert_eq!(auth.user_id, header_user.id);

    let auth = authenticate(SECRET, &headers, Some("not-a-token")).expect("auth");
    assert_eq!(auth.username, "ibrahima");
}

#[test]
fn missing_or_blank_tokens_are_unauthorized() {
    let headers = HeaderMap::new();

    assert!(matches!(
        authenticate(SECRET, &headers, None),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        authenticate(SECRET, &headers, Some("")),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        authenticate(SECRET, &headers, Some("Bearer ")),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn tokens_from_another_secret_are_refused() {
    let token = token_for(&account("awa"));
    assert!(matches!(
        authenticate("rotated-secret", &HeaderMap::new(), Some(&token)),
        Err(AppError::Unauthorized)
    ));
}
