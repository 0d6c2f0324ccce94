//! nirmata-reconciler - apply, refresh or destroy Nirmata clusters from manifests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use nirmata_reconciler::client::HttpControlPlane;
use nirmata_reconciler::config::{ClientConfig, ReconcileConfig};
use nirmata_reconciler::controller::Context;
use nirmata_reconciler::host::{load_manifests, Command, Host, StateStore};
use nirmata_reconciler::telemetry::{init_tracing, LogFormat};

/// Declarative lifecycle management for Nirmata clusters and cluster types
#[derive(Parser, Debug)]
#[command(name = "nirmata-reconciler", version, about, long_about = None)]
struct Cli {
    /// Control plane base URL
    #[arg(long, env = "NIRMATA_URL", default_value = "https://nirmata.io")]
    url: String,

    /// API token
    #[arg(long, env = "NIRMATA_TOKEN", hide_env_values = true)]
    token: String,

    /// State file recording resource identities
    #[arg(long, default_value = "nirmata-state.json")]
    state: PathBuf,

    /// Seconds between provisioning status polls
    #[arg(long, env = "NIRMATA_POLL_INTERVAL_SECS", default_value_t = 10)]
    poll_interval_secs: u64,

    /// Seconds Create waits for a cluster to provision
    #[arg(long, env = "NIRMATA_CREATE_TIMEOUT_SECS", default_value_t = 3600)]
    create_timeout_secs: u64,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create missing resources and converge existing ones
    Apply(ManifestArgs),
    /// Refresh recorded state from the control plane
    Refresh(ManifestArgs),
    /// Delete the resources
    Destroy(ManifestArgs),
}

#[derive(Args, Debug)]
struct ManifestArgs {
    /// Manifest files (multi-document YAML)
    #[arg(short = 'f', long = "file", required = true)]
    files: Vec<PathBuf>,
}

impl Commands {
    fn split(self) -> (Command, Vec<PathBuf>) {
        match self {
            Self::Apply(args) => (Command::Apply, args.files),
            Self::Refresh(args) => (Command::Refresh, args.files),
            Self::Destroy(args) => (Command::Destroy, args.files),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let client_config = ClientConfig::new(cli.url, cli.token);
    let reconcile = ReconcileConfig {
        poll_interval: Duration::from_secs(cli.poll_interval_secs),
        create_timeout: Duration::from_secs(cli.create_timeout_secs),
    };
    reconcile.validate()?;

    let api = HttpControlPlane::new(&client_config).context("invalid client configuration")?;
    let ctx = Context::builder(Arc::new(api))
        .reconcile_config(reconcile)
        .build();
    let host = Host::new(Arc::new(ctx));

    let (command, files) = cli.command.split();
    let manifests = load_manifests(&files).await?;
    let mut store = StateStore::load(&cli.state)
        .await
        .with_context(|| format!("failed to load state file {}", cli.state.display()))?;

    info!(?command, resources = manifests.len(), "starting");
    let outcomes = host.run(command, manifests, &mut store).await?;
    store
        .save()
        .await
        .with_context(|| format!("failed to write state file {}", cli.state.display()))?;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => println!("{}: ok", outcome.key),
            Err(e) => {
                failed += 1;
                println!("{}: {e}", outcome.key);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} resources failed", outcomes.len());
    }
    Ok(())
}
