//! Startup configuration.
//!
//! All environment-sourced settings are resolved once here and passed by
//! reference into each component, so dependencies stay visible in
//! constructors and are trivially replaced with fakes in tests. Required
//! repository access fails fast at startup rather than degrading silently.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,

    /// Base URL of the rule-evaluation engine
    pub engine_url: String,
    /// Decision document path on the engine (e.g. "authz/decision")
    pub engine_decision_path: String,
    pub engine_timeout: Duration,

    /// Remote policy repository URL
    pub repo_url: String,
    /// Access token for HTTPS remotes
    pub repo_token: Option<String>,
    pub repo_branch: String,
    /// Environment tag stamped onto scanned policy records
    pub environment: String,
    /// Timeout for each git network operation (clone, push, ls-remote)
    pub git_timeout: Duration,

    /// Interval enforcement points are expected to poll at
    pub sync_poll_interval: Duration,
    /// Heartbeat age beyond which a target is flagged stale
    pub sync_stale_after: Duration,

    pub cache_enabled: bool,
    pub cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let port: u16 = parse_env("PORT")?.unwrap_or(8080);
        let host: IpAddr = parse_env("HOST")?.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let engine_url = require_env("ENGINE_URL")?;
        let engine_decision_path =
            std::env::var("ENGINE_DECISION_PATH").unwrap_or_else(|_| "authz/decision".to_string());
        let engine_timeout = Duration::from_millis(parse_env("ENGINE_TIMEOUT_MS")?.unwrap_or(3000));

        let repo_url = require_env("POLICY_REPO_URL")?;
        let repo_token = std::env::var("POLICY_REPO_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        // A hosted HTTPS repository without credentials would fail on the
        // first push, long after startup; reject it up front instead.
        if repo_url.starts_with("https://") && repo_token.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "POLICY_REPO_TOKEN".to_string(),
            });
        }
        let repo_branch = std::env::var("POLICY_REPO_BRANCH").unwrap_or_else(|_| "main".to_string());
        let environment =
            std::env::var("POLICY_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let git_timeout = Duration::from_millis(parse_env("GIT_TIMEOUT_MS")?.unwrap_or(30_000));

        let sync_poll_interval =
            Duration::from_secs(parse_env("SYNC_POLL_INTERVAL_SECS")?.unwrap_or(30));
        let sync_stale_after = Duration::from_secs(
            parse_env("SYNC_STALE_AFTER_SECS")?.unwrap_or(sync_poll_interval.as_secs() * 3),
        );

        let cache_enabled = parse_env("DECISION_CACHE_ENABLED")?.unwrap_or(true);
        let cache_ttl = Duration::from_secs(parse_env("DECISION_CACHE_TTL_SECS")?.unwrap_or(10));

        let config = Self {
            bind_addr: SocketAddr::new(host, port),
            engine_url,
            engine_decision_path,
            engine_timeout,
            repo_url,
            repo_token,
            repo_branch,
            environment,
            git_timeout,
            sync_poll_interval,
            sync_stale_after,
            cache_enabled,
            cache_ttl,
        };

        tracing::info!(
            bind_addr = %config.bind_addr,
            engine_url = %config.engine_url,
            repo_branch = %config.repo_branch,
            environment = %config.environment,
            "configuration loaded"
        );

        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingRequired {
            key: key.to_string(),
        })
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}
