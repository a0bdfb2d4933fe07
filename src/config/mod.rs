//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//!
//! The configuration surface covers the identity provider, the studio
//! service (base URL + shared proxy secret), per-route rate limits, invite
//! token TTL bounds, and the RBAC cache TTL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub studio: StudioConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub invites: InviteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// SMTP configuration for invite delivery (optional; invites still work
    /// without it, the response just reports the email as unsent)
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Identity provider connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider
    pub url: String,
    /// API key sent alongside user lookups, if the provider requires one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Timeout for lookup-by-token calls, in seconds (short by design)
    #[serde(default = "default_identity_timeout", alias = "timeout")]
    pub timeout_secs: u64,
}

fn default_identity_timeout() -> u64 {
    5
}

/// Studio (downstream business-logic service) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudioConfig {
    /// Base URL of the studio service
    pub url: String,
    /// Shared secret proving forwarded requests originate from this gateway
    pub proxy_secret: String,
    /// Connect timeout in seconds
    #[serde(default = "default_studio_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total timeout for non-streaming proxied requests, in seconds.
    /// Long on purpose: the studio performs long-running generative work.
    #[serde(default = "default_studio_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    /// Path suffix identifying streaming routes ahead of the response
    #[serde(default = "default_stream_suffix")]
    pub stream_suffix: String,
}

fn default_studio_connect_timeout() -> u64 {
    10
}

fn default_studio_timeout() -> u64 {
    300
}

fn default_stream_suffix() -> String {
    "/stream".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// One fixed-window rate limit: at most `max` requests per `window_secs`
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct WindowLimit {
    pub window_secs: u64,
    pub max: u32,
}

/// Per-route rate limit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Default limit for authenticated API and proxy routes
    #[serde(default = "default_api_limit")]
    pub api: WindowLimit,
    /// Public session-check limit
    #[serde(default = "default_session_limit")]
    pub session: WindowLimit,
    /// Invite creation, the most sensitive route, gets the smallest limit
    #[serde(default = "default_invite_create_limit")]
    pub invite_create: WindowLimit,
    /// Public invite validation/consumption limit
    #[serde(default = "default_invite_validate_limit")]
    pub invite_validate: WindowLimit,
    /// How often stale window entries are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api: default_api_limit(),
            session: default_session_limit(),
            invite_create: default_invite_create_limit(),
            invite_validate: default_invite_validate_limit(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_api_limit() -> WindowLimit {
    WindowLimit {
        window_secs: 60,
        max: 300,
    }
}

fn default_session_limit() -> WindowLimit {
    WindowLimit {
        window_secs: 60,
        max: 60,
    }
}

fn default_invite_create_limit() -> WindowLimit {
    WindowLimit {
        window_secs: 60,
        max: 5,
    }
}

fn default_invite_validate_limit() -> WindowLimit {
    WindowLimit {
        window_secs: 60,
        max: 20,
    }
}

fn default_sweep_interval() -> u64 {
    300
}

/// Invite token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InviteConfig {
    #[serde(default = "default_invite_ttl_days")]
    pub default_ttl_days: u32,
    #[serde(default = "default_invite_min_ttl")]
    pub min_ttl_days: u32,
    #[serde(default = "default_invite_max_ttl")]
    pub max_ttl_days: u32,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_invite_ttl_days(),
            min_ttl_days: default_invite_min_ttl(),
            max_ttl_days: default_invite_max_ttl(),
        }
    }
}

fn default_invite_ttl_days() -> u32 {
    7
}

fn default_invite_min_ttl() -> u32 {
    1
}

fn default_invite_max_ttl() -> u32 {
    30
}

/// RBAC cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL for cached RBAC contexts, in seconds
    #[serde(default = "default_rbac_ttl")]
    pub rbac_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// How often expired entries are evicted
    #[serde(default = "default_cache_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            rbac_ttl_secs: default_rbac_ttl(),
            max_entries: default_cache_max_entries(),
            sweep_interval_secs: default_cache_sweep_interval(),
        }
    }
}

fn default_rbac_ttl() -> u64 {
    60
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_sweep_interval() -> u64 {
    120
}

/// SMTP configuration for the invite mailer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// From address, e.g. "Console <no-reply@example.com>"
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Log output target
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Console,
    File,
    Both,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// Search order: `GATEWAY_CONFIG`, `./config.yaml`,
    /// `/etc/console-gateway/config.yaml`. Environment variables override
    /// file values.
    pub fn load() -> Result<Self> {
        // Load .env file if present (development convenience)
        let _ = dotenvy::dotenv();

        let candidates: Vec<PathBuf> = std::env::var("GATEWAY_CONFIG")
            .map(|p| vec![PathBuf::from(p)])
            .unwrap_or_else(|_| {
                vec![
                    PathBuf::from("config.yaml"),
                    PathBuf::from("/etc/console-gateway/config.yaml"),
                ]
            });

        let mut config = None;
        for path in &candidates {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                let parsed: AppConfig = serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?;
                config = Some(parsed);
                break;
            }
        }

        let mut config = config.context(
            "No configuration file found (set GATEWAY_CONFIG or create ./config.yaml)",
        )?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of file configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GATEWAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = std::env::var("IDENTITY_URL") {
            self.identity.url = url;
        }
        if let Ok(key) = std::env::var("IDENTITY_API_KEY") {
            self.identity.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("STUDIO_URL") {
            self.studio.url = url;
        }
        if let Ok(secret) = std::env::var("PROXY_SECRET") {
            self.studio.proxy_secret = secret;
        }
        if let Ok(ttl) = std::env::var("RBAC_CACHE_TTL_SECS") {
            if let Ok(ttl) = ttl.parse() {
                self.cache.rbac_ttl_secs = ttl;
            }
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<()> {
        if self.identity.url.is_empty() {
            anyhow::bail!("identity.url must be set");
        }
        if self.studio.url.is_empty() {
            anyhow::bail!("studio.url must be set");
        }
        if self.studio.proxy_secret.len() < 32 {
            anyhow::bail!("studio.proxy_secret must be at least 32 characters");
        }
        if self.invites.min_ttl_days < 1
            || self.invites.max_ttl_days > 30
            || self.invites.min_ttl_days > self.invites.max_ttl_days
        {
            anyhow::bail!("invites TTL bounds must satisfy 1 <= min <= max <= 30 days");
        }
        if !(self.invites.min_ttl_days..=self.invites.max_ttl_days)
            .contains(&self.invites.default_ttl_days)
        {
            anyhow::bail!("invites.default_ttl_days must lie within the configured bounds");
        }
        if self.cache.rbac_ttl_secs == 0 {
            anyhow::bail!("cache.rbac_ttl_secs must be greater than zero");
        }
        Ok(())
    }
}
