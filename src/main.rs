use clap::Parser;
use claimd::config::AppConfig;
use claimd::error::{ClaimdError, Result};
use claimd::{
    ChainClaimer, ChainConnector, ClaimOrchestrator, FileAccountSource, OrchestratorConfig,
};
use ethers::types::Address;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Unattended reward-claim daemon. Re-checks eligibility for every
/// configured account on a fixed cadence and submits claim transactions,
/// each account optionally routed through its own proxy.
#[derive(Parser, Debug)]
#[command(name = "claimd", version)]
struct Cli {
    /// JSON-RPC node endpoint
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Reward contract address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// File with one private key per line
    #[arg(long, env = "PRIVATE_KEYS_FILE")]
    private_keys_file: Option<PathBuf>,

    /// File with one proxy per line, paired positionally with the keys
    #[arg(long, env = "PROXY_FILE")]
    proxy_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    // Interrupt exits 0; the missing-credential case (and any startup
    // error) exits 1.
    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;

    if let Some(rpc_url) = cli.rpc_url {
        config.chain.rpc_url = rpc_url;
    }
    if let Some(contract_address) = cli.contract_address {
        config.chain.contract_address = contract_address;
    }
    if let Some(path) = cli.private_keys_file {
        config.accounts.private_keys_file = path.display().to_string();
    }
    if let Some(path) = cli.proxy_file {
        config.accounts.proxy_file = path.display().to_string();
    }

    config
        .validate()
        .map_err(|errors| ClaimdError::Validation(errors.join("; ")))?;

    // validate() already vetted both of these.
    let node_url = Url::parse(&config.chain.rpc_url)
        .map_err(|e| ClaimdError::Validation(e.to_string()))?;
    let contract_address: Address = config
        .chain
        .contract_address
        .parse()
        .map_err(|_| ClaimdError::Validation("invalid contract address".to_string()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Interrupt received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    let connector = ChainConnector::new(
        node_url,
        Duration::from_secs(config.chain.request_timeout_secs),
    );
    let claimer = ChainClaimer::new(connector, contract_address);
    let source = FileAccountSource::new(
        PathBuf::from(&config.accounts.private_keys_file),
        PathBuf::from(&config.accounts.proxy_file),
    );
    let orchestrator_config = OrchestratorConfig {
        cycle_interval: Duration::from_secs(config.scheduler.cycle_interval_secs),
        error_backoff: Duration::from_secs(config.scheduler.error_backoff_secs),
        run_once: cli.once,
    };

    let mut orchestrator =
        ClaimOrchestrator::new(source, claimer, orchestrator_config, shutdown_rx);
    orchestrator.run().await
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,claimd=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
