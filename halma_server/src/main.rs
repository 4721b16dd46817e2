// CLI entry point for the Halma match server.
//
// Starts a standalone server that game clients connect to. Players are
// paired in arrival order and each pair plays one match. See `server.rs` for
// the networking architecture and `session.rs` for the match rules.
//
// Usage:
//   halma-server [OPTIONS]
//     --config <PATH>         TOML config file (optional)
//     --host <HOST>           Interface to bind (default: 127.0.0.1)
//     --port <PORT>           Listen port (default: 12345)
//     --log-filter <FILTER>   Tracing filter, used when RUST_LOG is unset
//                             (default: halma_server=info)
//
// Flags override values from the config file. The process runs until it is
// killed; the OS tears down the connection threads on exit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use halma_server::{ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "halma_server=info";

#[derive(Debug, Parser)]
#[command(name = "halma-server", about = "Two-player Halma match server")]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Listen port (0 picks a free port).
    #[arg(long)]
    port: Option<u16>,

    /// Tracing filter directive, used when RUST_LOG is unset.
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

impl Cli {
    /// Load the config file (if any) and apply flag overrides.
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&cli.log_filter))?,
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.server_config()?;
    let (handle, addr) = start_server(config).context("failed to start server")?;
    info!(%addr, "halma server ready");

    handle.wait();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["halma-server", "--port", "4000", "--host", "0.0.0.0"]);
        let config = cli.server_config().unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.handshake_timeout_secs, ServerConfig::default().handshake_timeout_secs);
        assert_eq!(cli.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["halma-server", "--config", "/nonexistent/halma.toml"]);
        assert!(cli.server_config().is_err());
    }
}
