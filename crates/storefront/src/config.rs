//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETSTALL_BACKEND_URL` - Managed backend project URL
//! - `MARKETSTALL_BACKEND_KEY` - Backend API key (sent as `apikey`)
//! - `STRIPE_SECRET_KEY` - Payment gateway secret key
//!
//! ## Optional
//! - `MARKETSTALL_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETSTALL_PORT` - Listen port (default: 3000)
//! - `MARKETSTALL_BASE_URL` - Public URL for redirects (default: <http://localhost:3000>)
//! - `MARKETSTALL_ADMIN_EMAIL` - Administrator address (default: admin@marketstall.shop)
//! - `STRIPE_API_BASE` - Payment gateway API base (default: <https://api.stripe.com>)
//! - `MARKETSTALL_SESSION_DB` - `SQLite` session database
//!   (default: `sqlite://marketstall-sessions.db?mode=rwc`)
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   Admin notification relay; notifications are only logged when `SMTP_HOST` is unset
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use marketstall_core::Email;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Address that receives new-order notifications and holds the admin role
    pub admin_email: Email,
    /// Managed backend configuration
    pub backend: BackendConfig,
    /// Payment gateway configuration
    pub payments: PaymentConfig,
    /// SMTP relay; `None` falls back to logging notifications
    pub smtp: Option<SmtpConfig>,
    /// `SQLite` URL of the session store
    pub session_db_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Managed backend (REST + auth) configuration.
#[derive(Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Hosted payment gateway configuration.
#[derive(Clone)]
pub struct PaymentConfig {
    pub api_base: String,
    pub secret_key: SecretString,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// SMTP relay configuration for admin notifications.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets look like placeholders.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("MARKETSTALL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETSTALL_HOST".to_string(), e.to_string())
            })?;
        let port = parse_port("MARKETSTALL_PORT", "3000")?;
        let base_url = get_env_or_default("MARKETSTALL_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        let admin_email = Email::parse(&get_env_or_default(
            "MARKETSTALL_ADMIN_EMAIL",
            "admin@marketstall.shop",
        ))
        .map_err(|e| {
            ConfigError::InvalidEnvVar("MARKETSTALL_ADMIN_EMAIL".to_string(), e.to_string())
        })?;

        Ok(Self {
            host,
            port,
            base_url,
            admin_email,
            backend: BackendConfig::from_env()?,
            payments: PaymentConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            session_db_url: get_env_or_default(
                "MARKETSTALL_SESSION_DB",
                "sqlite://marketstall-sessions.db?mode=rwc",
            ),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("MARKETSTALL_BACKEND_URL")?;
        let url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("MARKETSTALL_BACKEND_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            url,
            api_key: get_validated_secret("MARKETSTALL_BACKEND_KEY")?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
        })
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            host,
            port: parse_port("SMTP_PORT", "587")?,
            username: get_required_env("SMTP_USERNAME")?,
            password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_port(key: &str, default: &str) -> Result<u16, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            admin_email: Email::parse("admin@marketstall.shop").unwrap(),
            backend: BackendConfig {
                url: Url::parse("https://project.backend.example").unwrap(),
                api_key: SecretString::from("super_secret_backend_key"),
            },
            payments: PaymentConfig {
                api_base: "https://api.stripe.com".to_string(),
                secret_key: SecretString::from("sk_test_super_secret_value"),
            },
            smtp: Some(SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                username: "mailer".to_string(),
                password: SecretString::from("super_secret_smtp_password"),
                from_address: "orders@marketstall.shop".to_string(),
            }),
            session_db_url: "sqlite::memory:".to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err =
            validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_accepts_gateway_key() {
        assert!(
            validate_secret_strength("sk_test_51Hq8aB3xY9mK2nL5pQ7rT0uW4zC6", "TEST_VAR").is_ok()
        );
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_secure_cookies_follow_base_url_scheme() {
        let mut config = config();
        assert!(!config.secure_cookies());
        config.base_url = "https://marketstall.shop".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());

        assert!(debug_output.contains("project.backend.example"));
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_backend_key"));
        assert!(!debug_output.contains("sk_test_super_secret_value"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
