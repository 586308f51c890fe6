//! Configuration management for the booking service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Secrets never have defaults: a delivery channel without credentials is
//! simply not configured, and the console channel takes its place.

use seatbook_runtime::{DispatcherConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors from interpreting configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The metrics host/port pair is not a socket address.
    #[error("Invalid metrics address '{0}'")]
    InvalidMetricsAddr(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub postgres: PostgresConfig,
    /// Notification dispatcher configuration
    pub notifications: NotificationConfig,
    /// SMTP email channel, if credentials are present
    pub smtp: Option<SmtpConfig>,
    /// SMS gateway channel, if credentials are present
    pub sms: Option<SmsConfig>,
    /// Ticket code rendering
    pub codes: CodeConfig,
    /// Process-level settings
    pub server: ServerConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Connection URL; in-memory adapters are used when unset
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Notification dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Bounded queue capacity
    pub queue_capacity: usize,
    /// Concurrent deliveries
    pub workers: usize,
    /// Retries after the first failed attempt
    pub max_retries: usize,
    /// First backoff delay in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Drain timeout at shutdown in seconds
    pub shutdown_timeout: u64,
}

impl NotificationConfig {
    /// Dispatcher settings built from this section.
    #[must_use]
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: self.queue_capacity,
            workers: self.workers,
            retry: RetryPolicy::builder()
                .max_retries(self.max_retries)
                .initial_delay(Duration::from_millis(self.initial_delay_ms))
                .max_delay(Duration::from_millis(self.max_delay_ms))
                .multiplier(self.multiplier)
                .build(),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
        }
    }
}

/// SMTP configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP port (587 for STARTTLS)
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// Sender address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// SMS gateway configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Gateway endpoint accepting `{to, from, body}` JSON
    pub gateway_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Sender ID or number
    pub sender_id: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_key", &"<redacted>")
            .field("sender_id", &self.sender_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Ticket code rendering configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Pixels per QR module
    pub module_size: u32,
    /// Whether to draw the quiet zone border
    pub quiet_zone: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Tracing filter directives, `RUST_LOG` syntax
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
}

impl ServerConfig {
    /// Tracing filter built from `log_level`, falling back to `info` when
    /// the directives do not parse.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Socket address for the metrics endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMetricsAddr`] if host and port do not
    /// form a valid address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.metrics_host, self.metrics_port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidMetricsAddr(addr))
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            postgres: PostgresConfig {
                url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            notifications: NotificationConfig {
                queue_capacity: env::var("NOTIFY_QUEUE_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1024),
                workers: env::var("NOTIFY_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4),
                max_retries: env::var("NOTIFY_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                initial_delay_ms: env::var("NOTIFY_INITIAL_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
                max_delay_ms: env::var("NOTIFY_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30_000),
                multiplier: env::var("NOTIFY_BACKOFF_MULTIPLIER")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2.0),
                shutdown_timeout: env::var("NOTIFY_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            smtp: smtp_from_env(),
            sms: sms_from_env(),
            codes: CodeConfig {
                module_size: env::var("QR_MODULE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8),
                quiet_zone: env::var("QR_QUIET_ZONE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
            server: ServerConfig {
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_host: env::var("METRICS_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
            },
        }
    }
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let host = env::var("SMTP_HOST").ok()?;
    let username = env::var("SMTP_USERNAME").ok()?;
    let password = env::var("SMTP_PASSWORD").ok()?;
    Some(SmtpConfig {
        host,
        port: env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587),
        from_email: env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| username.clone()),
        username,
        password,
        from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Seatbook".to_string()),
    })
}

fn sms_from_env() -> Option<SmsConfig> {
    Some(SmsConfig {
        gateway_url: env::var("SMS_GATEWAY_URL").ok()?,
        api_key: env::var("SMS_API_KEY").ok()?,
        sender_id: env::var("SMS_SENDER_ID").unwrap_or_else(|_| "Seatbook".to_string()),
        timeout: env::var("SMS_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10),
    })
}
