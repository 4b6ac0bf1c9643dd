//! Service configuration
//!
//! Built once at startup from environment variables and handed to the
//! components that need it. [`IngestConfig::from_lookup`] takes any lookup
//! function so configurations can be constructed without touching the
//! process environment.

use crate::error::{IngestError, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default listener port
pub const DEFAULT_PORT: u16 = 8443;

/// Default deployment environment label
pub const DEFAULT_ENV_NAME: &str = "dev";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BODY_READ_TIMEOUT: Duration = Duration::from_secs(40);
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Configuration for the ingestion service
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// DynamoDB table receiving KYC items
    pub kyc_table: String,
    /// Deployment environment label
    pub env_name: String,
    /// Listener port
    pub port: u16,
    /// AWS region override; `None` uses the SDK default chain
    pub region: Option<String>,
    /// Deadline for the encrypt and persist steps of one request
    pub request_timeout: Duration,
    /// Deadline for reading a request body
    pub body_read_timeout: Duration,
    /// Largest request body accepted
    pub max_body_bytes: usize,
    /// How long shutdown waits for in-flight connections
    pub graceful_timeout: Duration,
}

impl IngestConfig {
    /// Creates a configuration with defaults for everything but the table
    pub fn new(kyc_table: impl Into<String>) -> Self {
        Self {
            kyc_table: kyc_table.into(),
            env_name: DEFAULT_ENV_NAME.to_string(),
            port: DEFAULT_PORT,
            region: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            body_read_timeout: DEFAULT_BODY_READ_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
        }
    }

    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let kyc_table = get("KYC_TABLE")
            .ok_or_else(|| IngestError::Config("KYC_TABLE env variable not set".to_string()))?;

        let mut config = Self::new(kyc_table);

        if let Some(env_name) = get("ENV_NAME") {
            config.env_name = env_name;
        }
        config.region = get("AWS_REGION");

        if let Some(port) = get("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = get("BODY_READ_TIMEOUT_SECS") {
            config.body_read_timeout =
                Duration::from_secs(parse_var("BODY_READ_TIMEOUT_SECS", &secs)?);
        }
        if let Some(bytes) = get("MAX_BODY_BYTES") {
            config.max_body_bytes = parse_var("MAX_BODY_BYTES", &bytes)?;
        }
        if let Some(secs) = get("GRACEFUL_TIMEOUT_SECS") {
            config.graceful_timeout =
                Duration::from_secs(parse_var("GRACEFUL_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestError::Config(format!("Invalid value for {}: {}", name, e)))
}
