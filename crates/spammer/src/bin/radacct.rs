//! radacct CLI
//!
//! Load-tests a RADIUS accounting server with simulated endpoint sessions.

use clap::Parser;
use radacct_radius::{RadiusAccountingClient, RadiusClientConfig};
use radacct_spammer::config::RunConfig;
use radacct_spammer::runner::Spammer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "radacct")]
#[command(about = "RADIUS accounting load generator")]
#[command(version)]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// The host to send the packets to [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// The port to send the packets to [default: 1813]
    #[arg(long)]
    port: Option<u16>,

    /// The RADIUS secret to use [default: secret]
    #[arg(long)]
    secret: Option<String>,

    /// The Called-Station-Id to use [default: 02:00:00:00:00:01]
    #[arg(long)]
    called_station_id: Option<String>,

    /// The prefix of the session IDs [default: acct-tester-]
    #[arg(long)]
    session_id_prefix: Option<String>,

    /// Number of simulated endpoints [default: 1]
    #[arg(long = "lt-nodes-count")]
    endpoint_count: Option<usize>,

    /// Minimum interim updates per endpoint [default: 0]
    #[arg(long = "lt-min-interim-per-node")]
    min_interim: Option<u32>,

    /// Modulus for extra interim updates per endpoint [default: 20]
    #[arg(long = "lt-max-interim-per-node")]
    max_interim: Option<u32>,

    /// Number of concurrent senders [default: 1]
    #[arg(long = "lt-concurrency")]
    concurrency: Option<usize>,

    /// Events buffered per sender before generation waits [default: 100]
    #[arg(long)]
    lane_capacity: Option<usize>,

    /// Deadline for one request (e.g. "5s", "250ms") [default: 5s]
    #[arg(long)]
    send_timeout: Option<humantime::Duration>,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secret) = self.secret {
            config.secret = secret;
        }
        if let Some(id) = self.called_station_id {
            config.called_station_id = id;
        }
        if let Some(prefix) = self.session_id_prefix {
            config.session_id_prefix = prefix;
        }
        if let Some(count) = self.endpoint_count {
            config.endpoint_count = count;
        }
        if let Some(min) = self.min_interim {
            config.min_interim_per_endpoint = min;
        }
        if let Some(max) = self.max_interim {
            config.max_interim_per_endpoint = max;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(capacity) = self.lane_capacity {
            config.lane_capacity = capacity;
        }
        if let Some(timeout) = self.send_timeout {
            config.send_timeout = *timeout;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    config.validate()?;

    let server = tokio::net::lookup_host(config.target())
        .await?
        .next()
        .ok_or_else(|| format!("No address found for {}", config.target()))?;

    let client = RadiusAccountingClient::new(
        RadiusClientConfig::new(server, config.secret.as_bytes())
            .with_session_id_prefix(config.session_id_prefix.clone())
            .with_called_station_id(config.called_station_id.clone()),
    );

    let spammer = Spammer::new(config, Arc::new(client))?;
    let summary = spammer.run().await?;
    summary.print();

    if !summary.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}
