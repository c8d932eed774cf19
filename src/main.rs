use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use prophecy_bridge::api::{self, StatusHandles};
use prophecy_bridge::claims::ClaimBuilder;
use prophecy_bridge::config::Config;
use prophecy_bridge::contracts;
use prophecy_bridge::seen_events::SeenEventCache;
use prophecy_bridge::watchers::{CosmosWatcher, EthereumWatcher, WatcherManager};
use prophecy_bridge::writers::{CosmosWriter, EthereumWriter, RetryConfig, WriterManager};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // Initialize logging
    init_logging();

    tracing::info!("Starting prophecy bridge relayer");

    // Load configuration; validation failures exit nonzero with a
    // readable message.
    let config = Config::load()?;
    tracing::info!(
        ethereum_chain_id = config.ethereum.chain_id,
        cosmos_chain_id = %config.cosmos.chain_id,
        validator = %config.cosmos.validator_moniker,
        "Configuration loaded"
    );

    // Resolve the bridge contracts from the registry once at startup
    let resolved = contracts::resolve_contracts(
        &config.ethereum.rpc_url,
        &config.ethereum.bridge_registry_address,
    )
    .await?;

    let retry_config = RetryConfig::from_relayer_config(&config.relayer);
    let poll_interval = Duration::from_millis(config.relayer.poll_interval_ms);

    // Claim channels: Ethereum watcher feeds the Cosmos writer; both
    // watchers feed the Ethereum writer.
    let (claim_tx, claim_rx) = mpsc::channel(256);
    let (submission_tx, submission_rx) = mpsc::channel(256);

    // Session-scoped dedup caches, shared with the status endpoint
    let ethereum_seen = Arc::new(Mutex::new(SeenEventCache::default()));
    let cosmos_seen = Arc::new(Mutex::new(SeenEventCache::default()));

    // Writers own the signing clients for their chains
    let cosmos_writer = CosmosWriter::new(&config.cosmos, retry_config.clone(), claim_rx)?;
    let ethereum_writer = EthereumWriter::new(
        &config.ethereum,
        resolved.cosmos_bridge,
        resolved.oracle,
        retry_config.clone(),
        submission_rx,
    )?;

    // Claims carry the relayer's validator identity on the destination
    // chain.
    let claim_builder = ClaimBuilder::new(
        cosmos_writer.relayer_address(),
        &config.cosmos.account_prefix,
        &config.relayer.token_prefix,
        config.ethereum.chain_id,
    );

    let ethereum_watcher = EthereumWatcher::new(
        &config.ethereum,
        &format!("{:#x}", resolved.bridge_bank),
        &format!("{:#x}", resolved.cosmos_bridge),
        claim_builder.clone(),
        poll_interval,
        retry_config.clone(),
        ethereum_seen.clone(),
        claim_tx,
        submission_tx.clone(),
    )?;
    let cosmos_watcher = CosmosWatcher::new(
        &config.cosmos,
        claim_builder,
        poll_interval,
        retry_config,
        cosmos_seen.clone(),
        submission_tx,
    )?;

    let watcher_manager = WatcherManager::new(ethereum_watcher, cosmos_watcher);
    let writer_manager = WriterManager::new(cosmos_writer, ethereum_writer);

    tracing::info!("Managers initialized, starting processing");

    // Create shutdown channels
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let (shutdown_tx2, shutdown_rx2) = mpsc::channel::<()>(1);

    // Setup signal handlers
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
        let _ = shutdown_tx2.send(()).await;
    });

    // Start metrics/API server
    let api_addr = std::net::SocketAddr::from(([0, 0, 0, 0], 9090));
    let handles = StatusHandles::new(ethereum_seen, cosmos_seen);
    tokio::spawn(async move {
        if let Err(e) = api::start_api_server(api_addr, handles).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Run watchers and writers concurrently
    tokio::select! {
        result = watcher_manager.run(shutdown_rx) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Watcher manager error");
            }
        }
        result = writer_manager.run(shutdown_rx2) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Writer manager error");
            }
        }
    }

    tracing::info!("Prophecy bridge relayer stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,prophecy_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
