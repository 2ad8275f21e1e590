use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::Claims,
    entity::users::{self, UserRole},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_superuser(&self) -> bool {
        self.role.is_superuser()
    }
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_superuser(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_superuser() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn issue_token(config: &AppConfig, user: &users::Model) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        username: decoded.claims.username,
        role: decoded.claims.role,
    })
}

/// `None` when no Authorization header is present.
pub fn bearer_token(headers: &HeaderMap) -> Option<Result<&str, AppError>> {
    let auth_header = headers.get(header::AUTHORIZATION)?;
    let parsed = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))
        .and_then(|auth_str| {
            auth_str
                .strip_prefix("Bearer ")
                .map(str::trim)
                .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))
        });
    Some(parsed)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)??;
        decode_token(&state.config.jwt_secret, token)
    }
}

/// Anonymous requests resolve to `None`; a malformed or expired token is still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(&parts.headers) {
            None => Ok(None),
            Some(token) => decode_token(&state.config.jwt_secret, token?).map(Some),
        }
    }
}
