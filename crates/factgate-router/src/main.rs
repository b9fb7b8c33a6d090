//! Factgate server
//!
//! Starts the HTTP server for fact submission and attestation.

use anyhow::Context;
use clap::Parser;
use factgate_router::{config::RouterConfig, start_server};
use std::path::PathBuf;

/// Factgate - judge, record and attest community facts
#[derive(Debug, Parser)]
#[command(name = "factgate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FACTGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Hex private key for attestations (overrides the config file)
    #[arg(long, env = "FACTGATE_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// reCAPTCHA secret (overrides the config file)
    #[arg(long, env = "FACTGATE_RECAPTCHA_SECRET", hide_env_values = true)]
    recaptcha_secret: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            eprintln!("Warning: No config file specified, using defaults");
            eprintln!("Usage: factgate --config <path-to-config.toml>");
            eprintln!();
            toml::from_str("").context("Failed to build default configuration")?
        }
    };

    if let Some(key) = cli.signing_key {
        config.signing_key = Some(key);
    }
    if let Some(secret) = cli.recaptcha_secret {
        config.captcha.secret = Some(secret);
    }
    if let Some(port) = cli.port {
        config.bind_port = port;
    }

    start_server(config).await?;
    Ok(())
}
