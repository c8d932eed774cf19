//! Cosmos transaction watcher for bridge burn/lock messages
//!
//! Polls the node height via tendermint RPC and queries the LCD tx
//! service one block at a time, scanning event attributes for burn and
//! lock messages destined for Ethereum.

use eyre::{Result, WrapErr};
use std::sync::Arc;
use std::time::Duration;
use tendermint_rpc::{Client, HttpClient, Url};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::claims::ClaimBuilder;
use crate::events::cosmos::TxSearchResponse;
use crate::metrics;
use crate::seen_events::SeenEventCache;
use crate::writers::retry::RetryConfig;
use crate::writers::EthereumSubmission;

/// Cosmos chain watcher for outbound bridge messages
pub struct CosmosWatcher {
    rpc_client: HttpClient,
    http: reqwest::Client,
    lcd_url: String,
    chain_id: String,
    claim_builder: ClaimBuilder,
    poll_interval: Duration,
    retry_config: RetryConfig,
    seen: Arc<Mutex<SeenEventCache<(String, u64)>>>,
    submission_tx: mpsc::Sender<EthereumSubmission>,
}

impl CosmosWatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &crate::config::CosmosConfig,
        claim_builder: ClaimBuilder,
        poll_interval: Duration,
        retry_config: RetryConfig,
        seen: Arc<Mutex<SeenEventCache<(String, u64)>>>,
        submission_tx: mpsc::Sender<EthereumSubmission>,
    ) -> Result<Self> {
        let url: Url = config.rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
        let rpc_client = HttpClient::new(url).wrap_err("Failed to create RPC client")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            rpc_client,
            http,
            lcd_url: config.lcd_url.clone(),
            chain_id: config.chain_id.clone(),
            claim_builder,
            poll_interval,
            retry_config,
            seen,
            submission_tx,
        })
    }

    /// Run the watcher loop with bounded backoff on transport errors.
    pub async fn run(self) -> Result<()> {
        let mut last_height = self
            .get_current_height()
            .await
            .wrap_err("Failed to get initial height")?;
        let mut consecutive_failures = 0u32;

        info!(chain_id = %self.chain_id, start_height = last_height, "Cosmos watcher started");

        loop {
            match self.poll_once(&mut last_height).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    metrics::record_successful_poll("cosmos");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    metrics::record_error("cosmos", "poll");
                    if !self.retry_config.should_retry(consecutive_failures) {
                        error!(error = %e, "Cosmos watcher exhausted retries");
                        return Err(e).wrap_err("Cosmos watcher exhausted retries");
                    }
                    let backoff = self.retry_config.backoff_for_attempt(consecutive_failures);
                    warn!(
                        error = %e,
                        consecutive_failures,
                        backoff_secs = backoff.as_secs(),
                        "Cosmos poll failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Process new blocks one at a time.
    async fn poll_once(&self, last_height: &mut u64) -> Result<()> {
        let current_height = self.get_current_height().await?;

        if current_height <= *last_height {
            return Ok(());
        }

        for height in (*last_height + 1)..=current_height {
            debug!(chain_id = %self.chain_id, height, "Processing Cosmos block");
            self.process_block(height).await?;
            *last_height = height;
            metrics::record_block_processed("cosmos", height);
        }

        Ok(())
    }

    /// Scan one block's transactions for burn/lock events.
    async fn process_block(&self, height: u64) -> Result<()> {
        // Skip the LCD round-trip for empty blocks.
        let block_height = tendermint::block::Height::try_from(height)
            .map_err(|e| eyre::eyre!("Invalid block height {}: {}", height, e))?;
        let block_results = self
            .rpc_client
            .block_results(block_height)
            .await
            .wrap_err("Failed to get block results")?;
        let has_txs = block_results
            .txs_results
            .as_ref()
            .is_some_and(|txs| !txs.is_empty());
        if !has_txs {
            return Ok(());
        }

        let url = format!(
            "{}/cosmos/tx/v1beta1/txs?events=tx.height={}",
            self.lcd_url, height
        );

        let response: TxSearchResponse = self
            .http
            .get(&url)
            .send()
            .await
            .wrap_err("Failed to query transactions")?
            .json()
            .await
            .wrap_err("Failed to parse transaction response")?;

        for tx in response.tx_responses {
            for (msg_index, event) in tx.events.iter().enumerate() {
                match self
                    .claim_builder
                    .cosmos_event_to_claim(event, &tx.txhash, msg_index as u64)
                {
                    Ok(Some(bridge_event)) => {
                        if self
                            .seen
                            .lock()
                            .await
                            .check_and_insert(bridge_event.dedup_key())
                        {
                            debug!(tx_hash = %tx.txhash, msg_index, "Skipping duplicate event");
                            continue;
                        }
                        metrics::record_event_witnessed("cosmos", bridge_event.kind.as_str());
                        info!(
                            tx_hash = %tx.txhash,
                            nonce = bridge_event.nonce,
                            kind = %bridge_event.kind,
                            receiver = %bridge_event.ethereum_receiver,
                            amount = %bridge_event.amount,
                            "Witnessed Cosmos bridge message"
                        );
                        self.submission_tx
                            .send(EthereumSubmission::ProphecyClaim(bridge_event))
                            .await
                            .wrap_err("Ethereum submission channel closed")?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // Malformed bridge events are logged and
                        // skipped, never fatal.
                        warn!(
                            tx_hash = %tx.txhash,
                            msg_index,
                            error = %e,
                            "Rejected malformed bridge event"
                        );
                        metrics::record_error("cosmos", "claim_validation");
                    }
                }
            }
        }

        Ok(())
    }

    /// Get the current block height
    async fn get_current_height(&self) -> Result<u64> {
        let status = self
            .rpc_client
            .status()
            .await
            .wrap_err("Failed to get node status")?;

        Ok(status.sync_info.latest_block_height.value())
    }
}
