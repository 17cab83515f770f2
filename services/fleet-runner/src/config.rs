//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The file itself is
//! chosen by `--config`, then `CONFIG_PATH`, then `lightworker-fleet.toml` in
//! the working directory. Only the implicit default may be absent.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet::{SupervisorConfig, SupervisorTiming};
use rewards_api::{ApiEndpoints, RetryPolicy};
use serde::Deserialize;
use worker_session::SessionTiming;

const DEFAULT_CONFIG_FILE: &str = "lightworker-fleet.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub inputs: InputsConfig,
    pub admin: AdminConfig,
    pub timings: TimingsConfig,
    pub retry: RetryConfig,
    pub worker: WorkerConfig,
}

/// Base URLs of the issuer, the indexer and the coordination service
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub auth_base_url: String,
    pub rewards_base_url: String,
    pub ws_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            auth_base_url: "http://127.0.0.1:8080".into(),
            rewards_base_url: "http://127.0.0.1:8081".into(),
            ws_base_url: "ws://127.0.0.1:8080/ws".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub accounts_file: PathBuf,
    pub proxies_file: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("accounts.txt"),
            proxies_file: PathBuf::from("proxies.txt"),
        }
    }
}

/// Health/metrics listener. Disabled unless an address is set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub listen_addr: Option<SocketAddr>,
}

/// Cycle timings, all in seconds
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub heartbeat_secs: u64,
    pub reconnect_secs: u64,
    pub credential_retry_secs: u64,
    pub cycle_retry_secs: u64,
    pub points_poll_secs: u64,
    pub claim_poll_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 30,
            reconnect_secs: 5,
            credential_retry_secs: 3,
            cycle_retry_secs: 3,
            points_poll_secs: 600,
            claim_poll_secs: 3600,
            http_timeout_secs: 30,
        }
    }
}

impl TimingsConfig {
    fn named(&self) -> [(&'static str, u64); 7] {
        [
            ("heartbeat_secs", self.heartbeat_secs),
            ("reconnect_secs", self.reconnect_secs),
            ("credential_retry_secs", self.credential_retry_secs),
            ("cycle_retry_secs", self.cycle_retry_secs),
            ("points_poll_secs", self.points_poll_secs),
            ("claim_poll_secs", self.claim_poll_secs),
            ("http_timeout_secs", self.http_timeout_secs),
        ]
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn supervisor(&self) -> SupervisorTiming {
        SupervisorTiming {
            credential_retry: Duration::from_secs(self.credential_retry_secs),
            cycle_retry: Duration::from_secs(self.cycle_retry_secs),
            points_poll: Duration::from_secs(self.points_poll_secs),
            claim_poll: Duration::from_secs(self.claim_poll_secs),
            session: SessionTiming {
                heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
                reconnect_delay: Duration::from_secs(self.reconnect_secs),
            },
        }
    }
}

/// HTTP retry policy: linear backoff, `attempt * base_delay_ms`
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Host advertised in REGISTER and HEARTBEAT
    pub host: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: "extension".into(),
        }
    }
}

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    /// Named by `--config` or `CONFIG_PATH`, so it must exist
    pub explicit: bool,
}

impl Config {
    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigPath {
        if let Some(p) = cli_path {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigPath {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    /// Load the TOML file (or defaults when the implicit file is absent),
    /// overlay environment variables, then validate.
    pub fn load(source: &ConfigPath) -> common::Result<Self> {
        let mut config = if source.explicit || source.path.exists() {
            Self::from_file(&source.path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(v) = std::env::var("AUTH_BASE_URL") {
            self.endpoints.auth_base_url = v;
        }
        if let Ok(v) = std::env::var("REWARDS_BASE_URL") {
            self.endpoints.rewards_base_url = v;
        }
        if let Ok(v) = std::env::var("WS_BASE_URL") {
            self.endpoints.ws_base_url = v;
        }
        if let Ok(v) = std::env::var("ACCOUNTS_FILE") {
            self.inputs.accounts_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PROXIES_FILE") {
            self.inputs.proxies_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ADMIN_ADDR") {
            let addr = v.parse().map_err(|e| {
                common::Error::Config(format!("ADMIN_ADDR must be host:port, got {v}: {e}"))
            })?;
            self.admin.listen_addr = Some(addr);
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("auth_base_url", &self.endpoints.auth_base_url),
            ("rewards_base_url", &self.endpoints.rewards_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }
        let ws = &self.endpoints.ws_base_url;
        if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
            return Err(common::Error::Config(format!(
                "ws_base_url must start with ws:// or wss://, got: {ws}"
            )));
        }

        if let Some((name, _)) = self.timings.named().into_iter().find(|(_, v)| *v == 0) {
            return Err(common::Error::Config(format!(
                "{name} must be greater than 0"
            )));
        }

        if self.worker.host.trim().is_empty() {
            return Err(common::Error::Config("worker.host must not be empty".into()));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            auth_base_url: self.endpoints.auth_base_url.clone(),
            rewards_base_url: self.endpoints.rewards_base_url.clone(),
        }
    }

    pub fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            ws_base_url: self.endpoints.ws_base_url.clone(),
            worker_host: self.worker.host.clone(),
            timing: self.timings.supervisor(),
        }
    }
}
