use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub max_body_bytes: usize,

    // Backing store. `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    pub provision_catalog: bool,

    // Retention
    pub retention_cap: u64,
    pub retention_margin: u64,

    // Ingest
    pub max_batch: usize,

    // CORS
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            service_name: "eventsink".to_string(),
            max_body_bytes: 1024 * 1024,
            database_url: None,
            store_timeout: Duration::from_millis(10_000),
            provision_catalog: true,
            retention_cap: 5000,
            retention_margin: 100,
            max_batch: 500,
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            host: std::env::var("SINK_HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port)?,
            service_name: std::env::var("SINK_SERVICE_NAME").unwrap_or(defaults.service_name),
            max_body_bytes: env_parse("SINK_MAX_BODY_BYTES", defaults.max_body_bytes)?,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            store_timeout: Duration::from_millis(env_parse(
                "SINK_STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )?),
            provision_catalog: env_flag("SINK_PROVISION_CATALOG", defaults.provision_catalog),
            retention_cap: env_parse("SINK_RETENTION_CAP", defaults.retention_cap)?,
            retention_margin: env_parse("SINK_RETENTION_MARGIN", defaults.retention_margin)?,
            max_batch: env_parse("SINK_MAX_BATCH", defaults.max_batch)?,
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
