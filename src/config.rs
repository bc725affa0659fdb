use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_TAX_RATE: f64 = 0.18;
const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 1999;
const DEFAULT_SHIPPING_STANDARD_RATE: i64 = 99;
const DEFAULT_SHIPPING_EXPRESS_RATE: i64 = 199;
const DEFAULT_SHIPPING_SAME_DAY_RATE: i64 = 299;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration with validation.
///
/// Loaded from `config/default.toml`, `config/{environment}.toml` (both
/// optional) and `APP__`-prefixed environment variables, in that order.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Secret used to verify session tokens issued by the auth provider
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development", "staging", "production")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// GST-style flat tax rate applied to the discounted subtotal
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: f64,

    /// Orders at or above this (discounted) subtotal ship free on the standard tier, in rupees
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: i64,

    /// Flat shipping rates per tier, in rupees
    #[serde(default = "default_shipping_standard_rate")]
    pub shipping_standard_rate: i64,
    #[serde(default = "default_shipping_express_rate")]
    pub shipping_express_rate: i64,
    #[serde(default = "default_shipping_same_day_rate")]
    pub shipping_same_day_rate: i64,

    /// Payment gateway API credentials
    #[serde(default)]
    pub payment_gateway_key_id: Option<String>,
    #[serde(default)]
    pub payment_gateway_key_secret: Option<String>,

    /// Payment gateway API base URL
    #[serde(default = "default_payment_gateway_url")]
    pub payment_gateway_url: String,

    /// Transactional email service API key; emails are disabled when absent
    #[serde(default)]
    pub email_api_key: Option<String>,

    /// Sender address for transactional email
    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// Transactional email service endpoint
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    /// Public storefront URL, used in email links
    #[serde(default = "default_site_url")]
    pub public_site_url: String,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}
fn default_free_shipping_threshold() -> i64 {
    DEFAULT_FREE_SHIPPING_THRESHOLD
}
fn default_shipping_standard_rate() -> i64 {
    DEFAULT_SHIPPING_STANDARD_RATE
}
fn default_shipping_express_rate() -> i64 {
    DEFAULT_SHIPPING_EXPRESS_RATE
}
fn default_shipping_same_day_rate() -> i64 {
    DEFAULT_SHIPPING_SAME_DAY_RATE
}
fn default_payment_gateway_url() -> String {
    "https://api.razorpay.com".to_string()
}
fn default_email_from() -> String {
    "orders@threadline.example".to_string()
}
fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}
fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let environment = std::env::var("APP__ENVIRONMENT")
        .or_else(|_| std::env::var("ENVIRONMENT"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    if environment != "development" && secret == DEV_DEFAULT_JWT_SECRET {
        return Err(ValidationError::new(
            "development JWT secret must not be used outside development",
        ));
    }
    Ok(())
}

fn validate_tax_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 || rate >= 1.0 {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be a finite value within [0.0, 1.0)".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Gateway credentials, failing when unset. Required outside development.
    pub fn gateway_credentials(&self) -> Result<(String, String), ConfigLoadError> {
        match (
            self.payment_gateway_key_id.as_ref(),
            self.payment_gateway_key_secret.as_ref(),
        ) {
            (Some(key), Some(secret)) => Ok((key.clone(), secret.clone())),
            _ => Err(ConfigLoadError::MissingRequired(
                "payment_gateway_key_id / payment_gateway_key_secret".to_string(),
            )),
        }
    }
}

/// Load and validate configuration, failing fast on missing required values.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    let run_env = std::env::var("APP__ENVIRONMENT")
        .or_else(|_| std::env::var("ENVIRONMENT"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    if run_env == "development" {
        builder = builder
            .set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?
            .set_default("environment", "development")?;
    }

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;

    if !cfg.is_development() {
        // Production must not run without real gateway credentials
        cfg.gateway_credentials()?;
    }

    info!(
        environment = %cfg.environment,
        port = cfg.port,
        "configuration loaded"
    );
    Ok(cfg)
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("threadline_api={level},tower_http=info")));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
