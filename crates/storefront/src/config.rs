//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API access token
//!
//! ## Optional
//! - `SHOPIFY_STORE` - Shopify store domain (default: heedless.myshopify.com)
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-04)
//! - `SHOPIFY_ENDPOINT` - Full GraphQL endpoint, overrides store + version
//! - `HEEDLESS_HOST` - Bind address (default: 127.0.0.1)
//! - `HEEDLESS_PORT` - Listen port (default: 3000)
//! - `HEEDLESS_STORAGE_DIR` - Directory for persisted cache and cart (default: .heedless)
//! - `HEEDLESS_FRONTPAGE` - Collection shown on `/` (default: frontpage)
//! - `HEEDLESS_COLLECTION_LIMIT` - Products per collection listing (default: 5)
//! - `HEEDLESS_SEARCH_LIMIT` - Search results shown (default: 3)
//! - `HEEDLESS_RETRY_ATTEMPTS` - Attempts per Shopify request (default: 3)
//! - `HEEDLESS_RETRY_BASE_MS` - First retry delay in milliseconds (default: 200)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use heedless_core::Handle;
use secrecy::SecretString;
use thiserror::Error;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
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
    /// Directory holding the persisted `products`, `collections`, `cart`
    /// and `shipping` entries
    pub storage_dir: PathBuf,
    /// Collection rendered on the home page
    pub frontpage: Handle,
    /// Products requested per collection listing
    pub collection_limit: u32,
    /// Products requested per search
    pub search_limit: u32,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., heedless.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2024-04)
    pub api_version: String,
    /// GraphQL endpoint the client posts to
    pub endpoint: String,
    /// Storefront API access token
    pub storefront_token: SecretString,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("endpoint", &self.endpoint)
            .field("storefront_token", &"[REDACTED]")
            .field("retry", &self.retry)
            .finish()
    }
}

/// How many times a transient Shopify failure is attempted, and how long to
/// wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least one.
    pub attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the access token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let frontpage = env.get_or_default("HEEDLESS_FRONTPAGE", "frontpage");
        let frontpage = Handle::parse(&frontpage).map_err(|e| {
            ConfigError::InvalidEnvVar("HEEDLESS_FRONTPAGE".to_string(), e.to_string())
        })?;

        Ok(Self {
            host: env.parse_or_default("HEEDLESS_HOST", "127.0.0.1")?,
            port: env.parse_or_default("HEEDLESS_PORT", "3000")?,
            storage_dir: PathBuf::from(env.get_or_default("HEEDLESS_STORAGE_DIR", ".heedless")),
            frontpage,
            collection_limit: env.parse_or_default("HEEDLESS_COLLECTION_LIMIT", "5")?,
            search_limit: env.parse_or_default("HEEDLESS_SEARCH_LIMIT", "3")?,
            shopify: ShopifyStorefrontConfig::from_lookup(&env)?,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyStorefrontConfig {
    fn from_lookup(env: &Env<'_>) -> Result<Self, ConfigError> {
        let store = env.get_or_default("SHOPIFY_STORE", "heedless.myshopify.com");
        let api_version = env.get_or_default("SHOPIFY_API_VERSION", "2024-04");
        let endpoint = env
            .get_optional("SHOPIFY_ENDPOINT")
            .unwrap_or_else(|| format!("https://{store}/api/{api_version}/graphql.json"));
        url::Url::parse(&endpoint).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPIFY_ENDPOINT".to_string(), e.to_string())
        })?;

        let storefront_token = env.get_required("SHOPIFY_STOREFRONT_TOKEN")?;
        validate_token(&storefront_token, "SHOPIFY_STOREFRONT_TOKEN")?;

        let attempts: u32 = env.parse_or_default("HEEDLESS_RETRY_ATTEMPTS", "3")?;
        let base_ms: u64 = env.parse_or_default("HEEDLESS_RETRY_BASE_MS", "200")?;

        Ok(Self {
            store,
            api_version,
            endpoint,
            storefront_token: SecretString::from(storefront_token),
            retry: RetryPolicy {
                attempts: attempts.max(1),
                base_delay: Duration::from_millis(base_ms),
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Reject tokens copied verbatim from a sample `.env`.
fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SHOPIFY_STOREFRONT_TOKEN", "3f2a9c1b7e")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.storage_dir, PathBuf::from(".heedless"));
        assert_eq!(config.frontpage.as_str(), "frontpage");
        assert_eq!(config.collection_limit, 5);
        assert_eq!(config.search_limit, 3);
        assert_eq!(
            config.shopify.endpoint,
            "https://heedless.myshopify.com/api/2024-04/graphql.json"
        );
        assert_eq!(config.shopify.retry, RetryPolicy::default());
        assert_eq!(config.shopify.storefront_token.expose_secret(), "3f2a9c1b7e");
    }

    #[test]
    fn test_missing_token() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SHOPIFY_STOREFRONT_TOKEN"));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = load(&[("SHOPIFY_STOREFRONT_TOKEN", "your-token-here")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_endpoint_override_and_numbers() {
        let config = load(&[
            ("SHOPIFY_STOREFRONT_TOKEN", "3f2a9c1b7e"),
            ("SHOPIFY_ENDPOINT", "http://127.0.0.1:9999/graphql"),
            ("HEEDLESS_PORT", "8080"),
            ("HEEDLESS_RETRY_ATTEMPTS", "0"),
            ("HEEDLESS_RETRY_BASE_MS", "5"),
        ])
        .unwrap();

        assert_eq!(config.shopify.endpoint, "http://127.0.0.1:9999/graphql");
        assert_eq!(config.port, 8080);
        assert_eq!(config.shopify.retry.attempts, 1);
        assert_eq!(config.shopify.retry.base_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[
            ("SHOPIFY_STOREFRONT_TOKEN", "3f2a9c1b7e"),
            ("HEEDLESS_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "HEEDLESS_PORT"));

        let err = load(&[
            ("SHOPIFY_STOREFRONT_TOKEN", "3f2a9c1b7e"),
            ("HEEDLESS_FRONTPAGE", "front page"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "HEEDLESS_FRONTPAGE"));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_shopify_config_debug_redacts_token() {
        let config = load(&[("SHOPIFY_STOREFRONT_TOKEN", "super_secret_token_value")]).unwrap();

        let debug_output = format!("{:?}", config.shopify);

        assert!(debug_output.contains("heedless.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }
}
