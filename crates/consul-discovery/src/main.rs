//! Consul Discovery CLI
//!
//! Runs discovery rounds against a Consul agent and prints the peer list.

use anyhow::Context;
use clap::{Parser, Subcommand};
use consul_discovery::{
    config::split_list,
    consul_orchestrator,
    observability::{init_tracing, TracingConfig},
    DiscoveryConfig, DiscoveryOrchestrator,
};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, level_filters::LevelFilter};

#[derive(Parser)]
#[command(name = "consul-discovery")]
#[command(version, about = "Discover cluster peers registered in Consul")]
struct Cli {
    /// Consul agent host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Consul agent HTTP port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Service name to discover (repeatable, or comma-separated)
    #[arg(long = "service", global = true)]
    services: Vec<String>,

    /// Only instances carrying this tag
    #[arg(long, global = true)]
    tag: Option<String>,

    /// Include instances with failing health checks
    #[arg(long, global = true)]
    all_instances: bool,

    /// Consul ACL token
    #[arg(long, global = true, hide_env_values = true, env = "CONSUL_TOKEN")]
    token: Option<String>,

    /// Log at debug level when RUST_LOG is unset
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single discovery round and print the addresses
    Discover {
        /// Print a JSON array instead of one address per line
        #[arg(long)]
        json: bool,
    },
    /// Run discovery rounds periodically until interrupted
    Watch {
        /// Seconds between rounds (env: DISCOVERY_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl Cli {
    fn tracing_config(&self) -> TracingConfig {
        let config = TracingConfig::from_env();
        if self.verbose {
            config.with_default_level(LevelFilter::DEBUG)
        } else {
            config
        }
    }

    fn apply(&self, config: &mut DiscoveryConfig) {
        if let Some(host) = &self.host {
            config.registry_host = host.clone();
        }
        if let Some(port) = self.port {
            config.registry_port = port;
        }
        if !self.services.is_empty() {
            config.service_names = self.services.iter().flat_map(|s| split_list(s)).collect();
        }
        if let Some(tag) = &self.tag {
            config.tag = Some(tag.clone()).filter(|t| !t.is_empty());
        }
        if self.all_instances {
            config.healthy_only = false;
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.tracing_config())
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize tracing")?;

    let mut config = DiscoveryConfig::from_env();
    cli.apply(&mut config);
    config.validate().context("invalid discovery configuration")?;

    info!(
        registry = %config.registry_url(),
        services = ?config.service_names,
        tag = ?config.tag,
        healthy_only = config.healthy_only,
        "Consul discovery configured"
    );

    let orchestrator = consul_orchestrator(&config).context("failed to create registry client")?;

    match cli.command {
        Commands::Discover { json } => run_once(&orchestrator, json).await,
        Commands::Watch { interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or(config.discovery_interval);
            run_watch(&orchestrator, interval).await;
            Ok(())
        }
    }
}

async fn run_once(orchestrator: &DiscoveryOrchestrator, json: bool) -> anyhow::Result<()> {
    let addresses: Vec<String> = orchestrator
        .discover()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    if json {
        println!("{}", serde_json::to_string(&addresses)?);
    } else {
        for address in &addresses {
            println!("{address}");
        }
    }

    Ok(())
}

async fn run_watch(orchestrator: &DiscoveryOrchestrator, period: Duration) {
    info!(interval_secs = period.as_secs(), "Starting periodic discovery");

    let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let addresses = orchestrator.discover().await;
                let peers: Vec<String> = addresses.iter().map(ToString::to_string).collect();
                info!(peer_count = peers.len(), peers = ?peers, "Discovery round complete");
            }
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown requested");
                break;
            }
        }
    }
}
