//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_SECRET_KEY` - Stripe secret (`sk_...`) or restricted (`rk_...`) key
//! - `STRIPE_WEBHOOK_SECRET` - Webhook endpoint signing secret (`whsec_...`)
//! - `PRINTFUL_API_KEY` - Printful private token
//! - `CLIENT_URL` - Browser client origin, also the base for checkout redirects
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `SHIPPING_COUNTRIES` - Comma-separated ISO codes Stripe may ship to (default: US,CA)
//! - `CHECKOUT_CURRENCY` - Currency for checkout price data (default: usd)
//! - `CATALOG_CONCURRENCY` - Parallel Printful detail lookups (default: 8)
//! - `CATALOG_CACHE_TTL_SECS` - Catalog cache TTL, 0 disables (default: 300)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Signature timestamp tolerance (default: 300)
//! - `UPSTREAM_TIMEOUT_SECS` - Outbound request timeout (default: 30)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com/v1>)
//! - `PRINTFUL_API_BASE` - Printful API base URL (default: <https://api.printful.com>)
//! - `PRINTFUL_CONFIRM_ORDERS` - Submit orders for fulfillment instead of as drafts (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (0.0-1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_PRINTFUL_API_BASE: &str = "https://api.printful.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
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

/// Service configuration.
///
/// Built once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Browser client origin (CORS) and checkout redirect base
    pub client_url: Url,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Printful configuration
    pub printful: PrintfulConfig,
    /// Checkout session options
    pub checkout: CheckoutConfig,
    /// Catalog reader tuning
    pub catalog: CatalogConfig,
    /// Timeout applied to every outbound request
    pub upstream_timeout: Duration,
    /// Sentry settings
    pub sentry: SentryConfig,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// API base URL (no trailing slash)
    pub api_base: String,
    /// Secret API key
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret
    pub webhook_secret: SecretString,
    /// Maximum age of a webhook signature timestamp
    pub webhook_tolerance: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("webhook_tolerance", &self.webhook_tolerance)
            .finish()
    }
}

/// Printful API configuration.
#[derive(Clone)]
pub struct PrintfulConfig {
    /// API base URL (no trailing slash)
    pub api_base: String,
    /// Private token
    pub api_key: SecretString,
    /// Confirm orders immediately instead of creating drafts
    pub confirm_orders: bool,
}

impl std::fmt::Debug for PrintfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("confirm_orders", &self.confirm_orders)
            .finish()
    }
}

/// Options applied to every checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Uppercase ISO 3166-1 alpha-2 codes Stripe may collect shipping for
    pub shipping_countries: Vec<String>,
    /// Lowercase ISO 4217 currency code
    pub currency: String,
    /// Redirect after payment (contains Stripe's `{CHECKOUT_SESSION_ID}` template)
    pub success_url: String,
    /// Redirect when the customer abandons payment
    pub cancel_url: String,
}

/// Catalog reader tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Maximum in-flight product detail lookups
    pub concurrency: usize,
    /// Cache TTL, `None` disables caching
    pub cache_ttl: Option<Duration>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            cache_ttl: Some(Duration::from_secs(300)),
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if secrets look like placeholders or carry the wrong key prefix.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("HOST", "0.0.0.0")?;
        let port = parse_env_or_default("PORT", "5000")?;
        let client_url = parse_client_url(&get_required_env("CLIENT_URL")?)?;

        let stripe = StripeConfig::from_env()?;
        let printful = PrintfulConfig::from_env()?;
        let checkout = CheckoutConfig::new(
            &client_url,
            &get_env_or_default("SHIPPING_COUNTRIES", "US,CA"),
            &get_env_or_default("CHECKOUT_CURRENCY", "usd"),
        )?;
        let catalog = CatalogConfig::from_env()?;
        let upstream_timeout = Duration::from_secs(parse_env_or_default("UPSTREAM_TIMEOUT_SECS", "30")?);
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            host,
            port,
            client_url,
            stripe,
            printful,
            checkout,
            catalog,
            upstream_timeout,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The browser origin allowed by CORS (scheme, host and port only).
    #[must_use]
    pub fn allowed_origin(&self) -> String {
        self.client_url.origin().ascii_serialization()
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_validated_secret("STRIPE_SECRET_KEY")?;
        require_prefix(&secret_key, "STRIPE_SECRET_KEY", &["sk_", "rk_"])?;

        let webhook_secret = get_validated_secret("STRIPE_WEBHOOK_SECRET")?;
        require_prefix(&webhook_secret, "STRIPE_WEBHOOK_SECRET", &["whsec_"])?;

        Ok(Self {
            api_base: trim_base(&get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)),
            secret_key,
            webhook_secret,
            webhook_tolerance: Duration::from_secs(parse_env_or_default(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                "300",
            )?),
        })
    }
}

impl PrintfulConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: trim_base(&get_env_or_default(
                "PRINTFUL_API_BASE",
                DEFAULT_PRINTFUL_API_BASE,
            )),
            api_key: get_validated_secret("PRINTFUL_API_KEY")?,
            confirm_orders: parse_env_or_default("PRINTFUL_CONFIRM_ORDERS", "false")?,
        })
    }
}

impl CheckoutConfig {
    /// Build checkout options from the client URL and raw setting values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the country list is empty or
    /// contains a code that is not two ASCII letters, or if the currency is
    /// not three ASCII letters.
    pub fn new(client_url: &Url, countries: &str, currency: &str) -> Result<Self, ConfigError> {
        let shipping_countries = parse_country_list(countries)?;

        let currency = currency.trim().to_ascii_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_CURRENCY".to_string(),
                format!("expected a 3-letter ISO 4217 code, got {currency:?}"),
            ));
        }

        let base = client_url.as_str().trim_end_matches('/');

        Ok(Self {
            shipping_countries,
            currency,
            success_url: format!("{base}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/cart"),
        })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let concurrency: usize = parse_env_or_default("CATALOG_CONCURRENCY", "8")?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let ttl_secs: u64 = parse_env_or_default("CATALOG_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            concurrency,
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
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

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_client_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("CLIENT_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "CLIENT_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url)
}

fn parse_country_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut countries = Vec::new();

    for code in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "SHIPPING_COUNTRIES".to_string(),
                format!("{code:?} is not an ISO 3166-1 alpha-2 code"),
            ));
        }
        let code = code.to_ascii_uppercase();
        if !countries.contains(&code) {
            countries.push(code);
        }
    }

    if countries.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "SHIPPING_COUNTRIES".to_string(),
            "at least one country is required".to_string(),
        ));
    }

    Ok(countries)
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Validate that a secret is not a placeholder.
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

    Ok(())
}

/// Validate that a secret carries one of the expected key prefixes.
fn require_prefix(
    secret: &SecretString,
    var_name: &str,
    prefixes: &[&str],
) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if prefixes.iter().any(|prefix| value.starts_with(prefix)) {
        Ok(())
    } else {
        Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("expected a key starting with one of {prefixes:?}"),
        ))
    }
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value.trim().to_string()))
}
