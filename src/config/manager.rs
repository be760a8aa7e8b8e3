//! Configuration Manager

use super::{Config, OriginPolicyConfig};
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config = Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        Self::apply_env(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override `config` with whatever `lookup` returns for the known variables
    pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup("TOOLSHOP_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid TOOLSHOP_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(log_level) = lookup("TOOLSHOP_LOG_LEVEL") {
            config.server.log_level = log_level;
        }

        if let Some(open) = lookup("TOOLSHOP_OPEN_BROWSER") {
            config.server.open_browser = open
                .parse::<bool>()
                .with_context(|| format!("Invalid TOOLSHOP_OPEN_BROWSER: {}", open))?;
        }

        if let Some(path) = lookup("TOOLSHOP_ASSET_PATH") {
            config.assets.override_path = Some(PathBuf::from(path));
        }

        if let Some(timeout) = lookup("TOOLSHOP_DIAL_TIMEOUT") {
            config.relay.dial_timeout = Some(
                humantime::parse_duration(&timeout)
                    .with_context(|| format!("Invalid TOOLSHOP_DIAL_TIMEOUT: {}", timeout))?,
            );
        }

        if let Some(timeout) = lookup("TOOLSHOP_FETCH_TIMEOUT") {
            config.fetch.timeout = Some(
                humantime::parse_duration(&timeout)
                    .with_context(|| format!("Invalid TOOLSHOP_FETCH_TIMEOUT: {}", timeout))?,
            );
        }

        Ok(())
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_fetch_config()
            .with_context(|| "Fetch configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.server.log_level.as_str()) {
            bail!(
                "server.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        if self.server.shutdown_timeout.is_zero() {
            bail!("shutdown_timeout must be greater than 0");
        }

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        let relay = &self.relay;

        if !["ws", "wss"].contains(&relay.upstream_scheme.as_str()) {
            bail!("relay.upstream_scheme must be 'ws' or 'wss'");
        }

        if !relay.upstream_path.starts_with('/') {
            bail!("relay.upstream_path must start with '/'");
        }

        if relay.write_buffer_size == 0 {
            bail!("relay.write_buffer_size must be greater than 0");
        }

        if relay.write_buffer_size > 1048576 {
            bail!("relay.write_buffer_size cannot exceed 1MB");
        }

        if relay.max_message_size == Some(0) {
            bail!("relay.max_message_size must be greater than 0 when set");
        }

        if relay.dial_timeout.is_some_and(|t| t.is_zero()) {
            bail!("relay.dial_timeout must be greater than 0 when set");
        }

        if relay.idle_timeout.is_some_and(|t| t.is_zero()) {
            bail!("relay.idle_timeout must be greater than 0 when set");
        }

        if let OriginPolicyConfig::AllowList { origins } = &relay.origin_policy {
            if origins.is_empty() {
                bail!("relay.origin_policy allow_list needs at least one origin");
            }
            for (i, origin) in origins.iter().enumerate() {
                if origin.trim().is_empty() {
                    bail!("Allowed origin {} is empty", i);
                }
            }
        }

        Ok(())
    }

    fn validate_fetch_config(&self) -> Result<()> {
        if self.fetch.timeout.is_some_and(|t| t.is_zero()) {
            bail!("fetch.timeout must be greater than 0 when set");
        }

        if self.fetch.connect_timeout.is_some_and(|t| t.is_zero()) {
            bail!("fetch.connect_timeout must be greater than 0 when set");
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        asset: Option<&Path>,
        no_browser: bool,
        log_level: Option<&str>,
    ) -> Result<()> {
        if let Some(bind_str) = bind {
            let addr = bind_str
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {}", bind_str))?;
            self.server.bind_addr = addr;
            tracing::info!("CLI override: bind address set to {}", addr);
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(asset) = asset {
            self.assets.override_path = Some(asset.to_path_buf());
            tracing::info!("CLI override: page asset set to {}", asset.display());
        }

        if no_browser {
            self.server.open_browser = false;
            tracing::info!("CLI override: browser launch disabled");
        }

        if let Some(level) = log_level {
            self.server.log_level = level.to_string();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.relay.upstream_path, "/websocket");
        assert_eq!(config.relay.write_buffer_size, 1024);
        assert!(config.relay.dial_timeout.is_none());
        assert_eq!(config.relay.origin_policy, OriginPolicyConfig::Any);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = ConfigManager::parse(
            r#"
            [server]
            bind_addr = "0.0.0.0:9000"
            open_browser = false

            [relay]
            dial_timeout = "5s"

            [relay.origin_policy]
            mode = "allow_list"
            origins = ["http://localhost:9000"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 9000);
        assert!(!config.server.open_browser);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.relay.dial_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.relay.upstream_scheme, "ws");
        assert_eq!(
            config.relay.origin_policy,
            OriginPolicyConfig::AllowList {
                origins: vec!["http://localhost:9000".to_string()]
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.relay.upstream_scheme = "http".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relay.upstream_path = "websocket".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relay.origin_policy = OriginPolicyConfig::AllowList { origins: vec![] };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TOOLSHOP_BIND_ADDR", "127.0.0.1:7000"),
            ("TOOLSHOP_DIAL_TIMEOUT", "250ms"),
            ("TOOLSHOP_OPEN_BROWSER", "false"),
            ("TOOLSHOP_ASSET_PATH", "/tmp/page.html"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        ConfigManager::apply_env(&mut config, |key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.bind_addr.port(), 7000);
        assert_eq!(config.relay.dial_timeout, Some(Duration::from_millis(250)));
        assert!(!config.server.open_browser);
        assert_eq!(config.assets.override_path, Some(PathBuf::from("/tmp/page.html")));
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let mut config = Config::default();
        let result = ConfigManager::apply_env(&mut config, |key| {
            (key == "TOOLSHOP_BIND_ADDR").then(|| "not-an-address".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.merge_with_cli_args(
            Some("0.0.0.0:8000"),
            Some(8181),
            Some(Path::new("page.html")),
            true,
            Some("debug"),
        )
        .unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:8181".parse().unwrap());
        assert_eq!(config.assets.override_path, Some(PathBuf::from("page.html")));
        assert!(!config.server.open_browser);
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_cli_rejects_bad_bind_address() {
        let mut config = Config::default();
        let result = config.merge_with_cli_args(Some("not-an-address"), None, None, false, None);

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("not-an-address"));
        assert_eq!(config.server.bind_addr, Config::default().server.bind_addr);
    }
}
