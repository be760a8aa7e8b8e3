//! Toolshop Relay
//!
//! Serves the toolshop page on localhost and relays its WebSocket and schema
//! requests to the development server being inspected.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use toolshop_relay::{
    browser, config::ConfigManager, AppState, Config, RelayServer, ShutdownCoordinator,
};

/// CLI arguments for the relay
#[derive(Parser, Debug)]
#[command(name = "toolshop-relay")]
#[command(about = "Local relay for the toolshop page")]
#[command(version)]
#[command(long_about = "
Toolshop Relay

Serves the toolshop page at / and relays its traffic:
  /ws?target=host[:port]   WebSocket relay to ws://host[:port]/websocket
  /proxy-schema?url=URL    one GET to URL, response mirrored verbatim

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  TOOLSHOP_BIND_ADDR      - Bind address (e.g., 127.0.0.1:8080)
  TOOLSHOP_LOG_LEVEL      - Log level (trace, debug, info, warn, error)
  TOOLSHOP_ASSET_PATH     - Page served at / instead of the built-in one
  TOOLSHOP_DIAL_TIMEOUT   - Upstream WebSocket dial timeout (e.g., 10s)
  TOOLSHOP_FETCH_TIMEOUT  - Schema request timeout (e.g., 30s)
  TOOLSHOP_OPEN_BROWSER   - Open the page on startup (true/false)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:8080)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Page to serve at / instead of the built-in one
    #[arg(short, long, help = "Page file served at /")]
    pub asset: Option<PathBuf>,

    /// Do not open a browser on startup
    #[arg(long, help = "Do not open a browser on startup")]
    pub no_browser: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing
    let log_filter = init_tracing(&args)?;

    info!("Starting Toolshop Relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        info!(
            "Config file {} not found, checking environment variables",
            args.config.display()
        );
        ConfigManager::load_from_env()?
    };

    config
        .merge_with_cli_args(
            args.bind.as_deref(),
            args.port,
            args.asset.as_deref(),
            args.no_browser,
            args.log_level.as_deref(),
        )
        .context("Invalid command-line arguments")?;

    config
        .validate()
        .context("Final configuration validation failed")?;

    apply_configured_log_level(&log_filter, &args, &config)?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr);
        info!(
            "  Upstream endpoint: {}://<target>{}",
            config.relay.upstream_scheme, config.relay.upstream_path
        );
        info!("  Origin policy: {:?}", config.relay.origin_policy);
        info!("  Dial timeout: {:?}", config.relay.dial_timeout);
        info!("  Fetch timeout: {:?}", config.fetch.timeout);
        info!("  Page override: {:?}", config.assets.override_path);
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let app_state = AppState::from_config(&config)?;
    let server = RelayServer::new(config.server.bind_addr, app_state);
    let listener = server.bind().await?;
    let port = listener.local_addr()?.port();

    let server_handle = tokio::spawn(server.serve(listener, shutdown_coordinator.signal()));

    let page_url = format!("http://localhost:{}", port);
    info!("Toolshop available at {}", page_url);
    if config.server.open_browser {
        browser::open_or_warn(&page_url);
    }
    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    wait_for_shutdown(&shutdown_coordinator).await;

    info!("Initiating graceful shutdown...");
    shutdown_coordinator.drain(server_handle).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(coordinator: &ShutdownCoordinator) {
    if let Err(e) = coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        // without signal handling the server runs until killed
        std::future::pending::<()>().await;
    }
}

/// Handle for swapping the log filter once configuration is known
type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<LogFilterHandle> {
    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or("info")
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .init();

    Ok(handle)
}

/// Switch to the log level from the config file or environment.
///
/// `RUST_LOG`, `--verbose` and `--log-level` already decided the filter.
fn apply_configured_log_level(
    handle: &LogFilterHandle,
    args: &CliArgs,
    config: &Config,
) -> Result<()> {
    if args.verbose || args.log_level.is_some() || std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }

    handle
        .reload(EnvFilter::new(&config.server.log_level))
        .context("Failed to apply configured log level")?;
    Ok(())
}
