use std::{env, fmt, net::SocketAddr, path::PathBuf, time::Duration};

use super::{server_bind_address, DEFAULT_DATABASE_URL};

const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;
const MIN_SESSION_SECRET_BYTES: usize = 32;
/// Signing key used outside production when `SESSION_SECRET` is unset.
const DEV_SESSION_SECRET: &[u8] = b"sigforge-development-session-secret";

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns `true` for production deployments.
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Admin account provisioned at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
    pub admin_seed: Option<AdminSeed>,
    pub profile_path: Option<PathBuf>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;
        let database_url =
            non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let session_secret = session_secret(environment)?;
        let session_ttl = session_ttl()?;
        let admin_seed = admin_seed()?;
        let profile_path = non_empty_var("SIGNATURE_PROFILE_PATH").map(PathBuf::from);

        Ok(Self {
            bind_addr,
            environment,
            database_url,
            session_secret,
            session_ttl,
            admin_seed,
            profile_path,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn session_secret(environment: Environment) -> Result<Vec<u8>, ConfigError> {
    let Some(raw) = non_empty_var("SESSION_SECRET") else {
        if environment.is_production() {
            return Err(ConfigError::MissingSessionSecret);
        }
        return Ok(DEV_SESSION_SECRET.to_vec());
    };

    let secret = hex::decode(&raw).map_err(ConfigError::SessionSecretEncoding)?;
    if secret.len() < MIN_SESSION_SECRET_BYTES {
        return Err(ConfigError::SessionSecretTooShort(secret.len()));
    }
    Ok(secret)
}

fn session_ttl() -> Result<Duration, ConfigError> {
    let Some(raw) = non_empty_var("SESSION_TTL_SECS") else {
        return Ok(Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSessionTtl(raw)),
    }
}

fn admin_seed() -> Result<Option<AdminSeed>, ConfigError> {
    match (non_empty_var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD").ok()) {
        (Some(email), Some(password)) if !password.is_empty() => {
            Ok(Some(AdminSeed { email, password }))
        }
        (None, None) => Ok(None),
        (None, Some(password)) if password.is_empty() => Ok(None),
        _ => Err(ConfigError::IncompleteAdminSeed),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingSessionSecret,
    SessionSecretEncoding(hex::FromHexError),
    SessionSecretTooShort(usize),
    InvalidSessionTtl(String),
    IncompleteAdminSeed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingSessionSecret => {
                write!(f, "SESSION_SECRET must be set in production")
            }
            Self::SessionSecretEncoding(err) => {
                write!(f, "SESSION_SECRET must be hex encoded: {err}")
            }
            Self::SessionSecretTooShort(len) => write!(
                f,
                "SESSION_SECRET must decode to at least {MIN_SESSION_SECRET_BYTES} bytes (got {len})"
            ),
            Self::InvalidSessionTtl(value) => write!(
                f,
                "SESSION_TTL_SECS must be a positive number of seconds (got {value})"
            ),
            Self::IncompleteAdminSeed => write!(
                f,
                "ADMIN_EMAIL and ADMIN_PASSWORD must be set together"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
