use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use snapkeeper::{CloudApiClient, Config, DecisionEngine, FieldKeys, Reconciler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Create and prune instance snapshots according to per-instance policy.
///
/// Connection settings come from the environment (`TRITON_URL`,
/// `TRITON_ACCOUNT`, `TRITON_AUTH_TOKEN`); flags override the rest.
#[derive(Debug, Parser)]
#[command(name = "snapkeeper", version, about)]
struct Cli {
    /// Decide and log, but do not create or delete snapshots.
    #[arg(long)]
    dry_run: bool,

    /// Number of instances reconciled at once.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: Option<u16>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    report: bool,

    /// Log filter, e.g. `debug` or `snapkeeper=trace`. `RUST_LOG` wins.
    #[arg(long)]
    log_level: Option<String>,

    /// Metadata/tag key holding the snapshot frequency.
    #[arg(long)]
    frequency_key: Option<String>,

    /// Metadata/tag key holding the minimum snapshot count.
    #[arg(long)]
    min_snapshots_key: Option<String>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::from_env();
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&level);

    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(event = "Config", phase = "Load", error = %err);
            return ExitCode::FAILURE;
        }
    };
    config.dry_run |= cli.dry_run;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = usize::from(concurrency);
    }
    if let Some(key) = cli.frequency_key {
        config.keys.frequency = FieldKeys::same(key);
    }
    if let Some(key) = cli.min_snapshots_key {
        config.keys.min_snapshots = FieldKeys::same(key);
    }

    let client = match CloudApiClient::new(&config.cloudapi) {
        Ok(client) => client,
        Err(err) => {
            error!(event = "Config", phase = "Client", error = %err);
            return ExitCode::FAILURE;
        }
    };
    info!(
        event = "Config",
        phase = "Loaded",
        url = %config.cloudapi.url,
        account = %config.cloudapi.account,
        dry_run = config.dry_run,
        concurrency = config.concurrency
    );

    let reconciler = Reconciler::new(Arc::new(client), DecisionEngine::new(config.keys.clone()))
        .with_options(config.reconcile_options());
    let report = reconciler.run().await;

    if cli.report {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => error!(event = "Report", phase = "Serialize", error = %err),
        }
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
