//! AI conformance CLI.
//!
//! `preflight` checks a cluster's prerequisites before running the
//! conformance scenarios; `query` runs a one-shot query against the
//! configured metrics backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use conformance::config::TestConfig;
use conformance::{client, gpu, monitor, skip};
use probe::{MetricsClient, ResourceProbe};

/// AI conformance harness for Kubernetes clusters
#[derive(Parser)]
#[command(name = "ai-conformance")]
#[command(about = "AI conformance harness for Kubernetes clusters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check cluster prerequisites before running the conformance scenarios.
    Preflight,

    /// Run a single query against the configured metrics backend.
    Query {
        /// Query expression to evaluate.
        #[arg(long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = TestConfig::from_env();
    match cli.command {
        Commands::Preflight => preflight(&config).await,
        Commands::Query { query } => run_query(&config, &query).await,
    }
}

/// Group/versions whose presence gates entire scenario families.
const WATCHED_GROUP_VERSIONS: [&str; 4] = [
    "resource.k8s.io/v1",
    "gateway.networking.k8s.io/v1",
    "monitoring.coreos.com/v1",
    "kueue.x-k8s.io/v1beta1",
];

async fn preflight(config: &TestConfig) -> Result<()> {
    let client = client::cluster_client(config).await?;

    let (major, minor) = client::server_version(&client).await?;
    println!("API server: v{major}.{minor}");

    let probe = ResourceProbe::new(client.clone());
    for group_version in WATCHED_GROUP_VERSIONS {
        let served = probe
            .group_version_served(group_version)
            .await
            .with_context(|| format!("Failed to probe {group_version}"))?;
        let state = if served.is_satisfied() {
            "served"
        } else {
            "not served"
        };
        println!("  {group_version}: {state}");
    }

    let inventory = gpu::inventory(&client, &config.gpu_resource_name)
        .await
        .context("Failed to read accelerator inventory")?;
    println!(
        "Accelerators ({}): capacity={} allocatable={} across {} ready nodes",
        config.gpu_resource_name, inventory.capacity, inventory.allocatable, inventory.nodes
    );
    match skip::unless_gpus(&inventory, 1) {
        skip::Gate::Run => {}
        skip::Gate::Skip(reason) => println!("  accelerator scenarios would skip: {reason}"),
    }

    match monitor::first_prometheus(&client).await? {
        Some(prometheus) => println!(
            "Prometheus: {}/{}",
            prometheus.namespace, prometheus.name
        ),
        None => println!("Prometheus: no instance found"),
    }

    match MetricsClient::from_config(&config.metrics, Some(client)) {
        Ok(metrics) => {
            let result = metrics
                .query("up")
                .await
                .context("Metrics backend is configured but unreachable")?;
            println!("Metrics backend: reachable ({} bytes)", result.body.len());
        }
        Err(probe::MetricsError::NotConfigured) => {
            println!("Metrics backend: not configured (scenarios fall back to the service proxy)");
        }
        Err(err) => return Err(err).context("Failed to build metrics client"),
    }

    Ok(())
}

async fn run_query(config: &TestConfig, query: &str) -> Result<()> {
    let client = client::cluster_client(config).await.ok();
    let metrics = MetricsClient::from_config(&config.metrics, client)
        .context("No metrics backend addressing configured")?;
    let result = metrics.query(query).await?;
    println!("{}", result.body);
    Ok(())
}
