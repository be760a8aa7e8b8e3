//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::relay::{AllowAnyOrigin, AllowListedOrigins, OriginPolicy, SameHostOrigin};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub fetch: FetchConfig,
    pub assets: AssetConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    pub open_browser: bool,
    pub log_level: String,
}

/// Connection relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub upstream_scheme: String,
    pub upstream_path: String,
    pub write_buffer_size: usize,
    pub max_message_size: Option<usize>,
    pub origin_policy: OriginPolicyConfig,
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub close_timeout: Duration,
}

/// Which browser origins may open a relay session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OriginPolicyConfig {
    Any,
    SameHost,
    AllowList { origins: Vec<String> },
}

impl OriginPolicyConfig {
    /// Build the policy the relay consults before upgrading
    pub fn build(&self) -> Arc<dyn OriginPolicy> {
        match self {
            OriginPolicyConfig::Any => Arc::new(AllowAnyOrigin),
            OriginPolicyConfig::SameHost => Arc::new(SameHostOrigin),
            OriginPolicyConfig::AllowList { origins } => {
                Arc::new(AllowListedOrigins::new(origins.iter().cloned()))
            }
        }
    }
}

/// Request relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

/// Page asset configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// File served instead of the built-in page when it exists
    pub override_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
            fetch: FetchConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            shutdown_timeout: Duration::from_secs(30),
            open_browser: true,
            log_level: "info".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_scheme: "ws".to_string(),
            upstream_path: "/websocket".to_string(),
            write_buffer_size: 1024,
            max_message_size: None,
            origin_policy: OriginPolicyConfig::Any,
            dial_timeout: None,
            idle_timeout: None,
            close_timeout: Duration::from_secs(1),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            user_agent: format!("toolshop-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            override_path: Some(PathBuf::from("toolshop.html")),
        }
    }
}
