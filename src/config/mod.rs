//! Configuration module for the quote console.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the quoting backend API
    pub backend_url: String,
    /// Path to the SQLite file holding console sessions
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Sessions untouched for this long are logged out
    pub idle_timeout: Duration,
    /// Per-request timeout handed to the HTTP client
    pub request_timeout: Duration,
    /// Delay before the single retry of a failed GET
    pub retry_backoff: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let backend_url = env::var("CONSOLE_BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let db_path = env::var("CONSOLE_DB_PATH")
            .unwrap_or_else(|_| "./data/console.sqlite".to_string())
            .into();

        let bind_addr = env::var("CONSOLE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid CONSOLE_BIND_ADDR format");

        let log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let idle_timeout = Duration::from_secs(env_u64("CONSOLE_IDLE_TIMEOUT_SECS", 30 * 60));
        let request_timeout = Duration::from_secs(env_u64("CONSOLE_REQUEST_TIMEOUT_SECS", 15));
        let retry_backoff = Duration::from_millis(env_u64("CONSOLE_RETRY_BACKOFF_MS", 250));

        Self {
            backend_url,
            db_path,
            bind_addr,
            log_level,
            idle_timeout,
            request_timeout,
            retry_backoff,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
