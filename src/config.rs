/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, Entra ID client id, JWKS endpoint など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動時に一度だけ構築し、以降は参照で渡す (グローバル参照はしない)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_JWKS_URL: &str = "https://login.microsoftonline.com/common/discovery/keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,

    pub app_env: AppEnv,
    pub request_timeout: Duration,

    pub entra_id_client_id: String,
    pub jwks_url: String,
    pub jwks_fetch_timeout: Duration,

    pub maps_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = match std::env::var("PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(5);

        let app_env = AppEnv::from_env();

        let request_timeout = seconds_from_env("REQUEST_TIMEOUT_SECONDS", 30)?;

        let entra_id_client_id = std::env::var("ENTRA_ID_CLIENT_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("ENTRA_ID_CLIENT_ID"))?;

        let jwks_url = std::env::var("ENTRA_JWKS_URL").unwrap_or_else(|_| DEFAULT_JWKS_URL.into());
        url::Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("ENTRA_JWKS_URL"))?;

        let jwks_fetch_timeout = seconds_from_env("JWKS_FETCH_TIMEOUT_SECONDS", 10)?;

        let maps_api_key = std::env::var("MAPS_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            addr,
            database_url,
            db_max_connections,
            app_env,
            request_timeout,
            entra_id_client_id,
            jwks_url,
            jwks_fetch_timeout,
            maps_api_key,
        })
    }

    /// `impersonated_user` is honored only when compiled in and outside production.
    pub fn impersonation_enabled(&self) -> bool {
        cfg!(feature = "impersonation") && !self.app_env.is_production()
    }
}

fn seconds_from_env(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = match std::env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid(key))?,
        Err(_) => default,
    };

    if secs == 0 {
        return Err(ConfigError::Invalid(key));
    }

    Ok(Duration::from_secs(secs))
}
