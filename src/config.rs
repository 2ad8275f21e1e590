use std::env;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub session_ttl_seconds: i64,
    pub session_secure: bool,
    /// How many XOF of a delivered order earn one loyalty point.
    pub xof_per_point: i64,
    pub realtime_channel_capacity: usize,
    /// Browser origins allowed to make credentialed requests.
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let session_secure = env::var("SESSION_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
            session_ttl_seconds: parse_or("SESSION_TTL_SECONDS", 86_400),
            session_secure,
            xof_per_point: parse_or::<i64>("LOYALTY_XOF_PER_POINT", 1000).max(1),
            realtime_channel_capacity: parse_or::<usize>("REALTIME_CHANNEL_CAPACITY", 64).max(1),
            cors_allowed_origins: parse_origins(
                &env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
            ),
        })
    }

    /// Defaults for everything except the database URL and secret.
    pub fn with_defaults(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: 24,
            session_ttl_seconds: 86_400,
            session_secure: false,
            xof_per_point: 1000,
            realtime_channel_capacity: 64,
            cors_allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

/// Comma-separated origins; blanks and trailing slashes are dropped.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
