use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    entity::{
        reward_points::ActiveModel as RewardActive,
        user_profiles::ActiveModel as ProfileActive,
        users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users, UserRole},
    },
    error::{AppError, AppResult},
    middleware::auth::issue_token,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Everything needed to open an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: UserRole,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    let username = payload.username.trim();
    if username.is_empty() || username.len() > 150 {
        return Err(AppError::BadRequest(
            "username must be between 1 and 150 characters".into(),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::BadRequest("username cannot contain spaces".into()));
    }
    let email = payload.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Insert the user together with its profile and reward points. Run it inside
/// a transaction so the three rows exist together or not at all.
pub async fn create_account<C: ConnectionTrait>(
    conn: &C,
    account: NewAccount,
) -> AppResult<users::Model> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(account.username),
        email: Set(account.email),
        password_hash: Set(account.password_hash),
        first_name: Set(account.first_name),
        last_name: Set(account.last_name),
        role: Set(account.role),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    ProfileActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        phone: Set(account.phone),
        address: Set(String::new()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    RewardActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        points: Set(0),
        total_earned: Set(0),
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    validate_registration(&payload)?;
    let username = payload.username.trim().to_string();

    let exist = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Username is already taken".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;

    let txn = state.orm.begin().await?;
    let user = create_account(
        &txn,
        NewAccount {
            username,
            email: payload.email.trim().to_string(),
            password_hash,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            phone: payload.phone.unwrap_or_default().trim().to_string(),
            role: UserRole::Customer,
        },
    )
    .await
    .map_err(|e| e.on_unique_violation("Username is already taken"))?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    tracing::info!(user_id = %user.id, "account created");

    let token = issue_token(&state.config, &user)?;
    Ok(ApiResponse::success(
        "User created",
        RegisterResponse {
            user: User::from(user),
            token: format!("Bearer {token}"),
        },
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = Users::find()
        .filter(UserCol::Username.eq(username.trim()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid username or password".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid username or password".into()));
    }

    let token = issue_token(&state.config, &user)?;

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {token}"),
        },
        Some(Meta::empty()),
    ))
}
