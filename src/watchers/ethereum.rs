//! Ethereum log watcher for bridge events
//!
//! Polls one block range at a time over both bridge contracts and
//! routes logs by event signature: BridgeBank lock/burn events become
//! claims for the destination chain, CosmosBridge prophecy claim events
//! are handed to the Ethereum writer for signing and oracle relay.

use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use eyre::{Result, WrapErr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::claims::ClaimBuilder;
use crate::contracts::{BridgeBank, CosmosBridge};
use crate::events::ethereum::{decode_prophecy_claim, EthereumBridgeEvent};
use crate::metrics;
use crate::seen_events::SeenEventCache;
use crate::types::CreateBridgeClaim;
use crate::writers::retry::RetryConfig;
use crate::writers::EthereumSubmission;

/// Ethereum event watcher for both bridge contracts
pub struct EthereumWatcher {
    provider: RootProvider<Http<Client>>,
    bridge_bank: Address,
    cosmos_bridge: Address,
    claim_builder: ClaimBuilder,
    poll_interval: Duration,
    retry_config: RetryConfig,
    seen: Arc<Mutex<SeenEventCache<(B256, u64)>>>,
    claim_tx: mpsc::Sender<CreateBridgeClaim>,
    submission_tx: mpsc::Sender<EthereumSubmission>,
}

impl EthereumWatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &crate::config::EthereumConfig,
        bridge_bank: &str,
        cosmos_bridge: &str,
        claim_builder: ClaimBuilder,
        poll_interval: Duration,
        retry_config: RetryConfig,
        seen: Arc<Mutex<SeenEventCache<(B256, u64)>>>,
        claim_tx: mpsc::Sender<CreateBridgeClaim>,
        submission_tx: mpsc::Sender<EthereumSubmission>,
    ) -> Result<Self> {
        let url = config.rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
        let provider = ProviderBuilder::new().on_http(url);

        let bridge_bank = Address::from_str(bridge_bank).wrap_err("Invalid BridgeBank address")?;
        let cosmos_bridge =
            Address::from_str(cosmos_bridge).wrap_err("Invalid CosmosBridge address")?;

        Ok(Self {
            provider,
            bridge_bank,
            cosmos_bridge,
            claim_builder,
            poll_interval,
            retry_config,
            seen,
            claim_tx,
            submission_tx,
        })
    }

    /// Run the watcher loop. Transport errors are retried with bounded
    /// backoff; exhausting the retry budget returns the error to the
    /// supervising manager.
    pub async fn run(self) -> Result<()> {
        // Start at the current head; historical events are the chain's
        // own record, not this session's.
        let mut last_block = self
            .provider
            .get_block_number()
            .await
            .wrap_err("Failed to get initial block number")?;
        let mut consecutive_failures = 0u32;

        info!(start_block = last_block, "Ethereum watcher started");

        loop {
            match self.poll_once(&mut last_block).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    metrics::record_successful_poll("ethereum");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    metrics::record_error("ethereum", "poll");
                    if !self.retry_config.should_retry(consecutive_failures) {
                        error!(error = %e, "Ethereum watcher exhausted retries");
                        return Err(e).wrap_err("Ethereum watcher exhausted retries");
                    }
                    let backoff = self.retry_config.backoff_for_attempt(consecutive_failures);
                    warn!(
                        error = %e,
                        consecutive_failures,
                        backoff_secs = backoff.as_secs(),
                        "Ethereum poll failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Process all new blocks since the last poll.
    async fn poll_once(&self, last_block: &mut u64) -> Result<()> {
        let current_block = self
            .provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")?;

        if current_block <= *last_block {
            return Ok(());
        }

        let from_block = *last_block + 1;
        debug!(from_block, to_block = current_block, "Processing Ethereum blocks");

        let filter = Filter::new()
            .address(vec![self.bridge_bank, self.cosmos_bridge])
            .from_block(from_block)
            .to_block(current_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to get logs")?;

        for log in logs {
            self.handle_log(&log).await?;
        }

        *last_block = current_block;
        metrics::record_block_processed("ethereum", current_block);
        Ok(())
    }

    /// Route a log by its event signature. Decode failures are logged
    /// and skipped; a closed channel propagates and stops the watcher.
    async fn handle_log(&self, log: &Log) -> Result<()> {
        let topics = log.topics();
        let Some(&topic0) = topics.first() else {
            return Ok(());
        };

        if topic0 == BridgeBank::LogLock::SIGNATURE_HASH {
            match EthereumBridgeEvent::from_lock_log(log) {
                Ok(event) => self.handle_bridge_event(event).await?,
                Err(e) => self.log_decode_error(log, "LogLock", e),
            }
        } else if topic0 == BridgeBank::LogBurn::SIGNATURE_HASH {
            match EthereumBridgeEvent::from_burn_log(log) {
                Ok(event) => self.handle_bridge_event(event).await?,
                Err(e) => self.log_decode_error(log, "LogBurn", e),
            }
        } else if topic0 == CosmosBridge::LogNewProphecyClaim::SIGNATURE_HASH {
            self.handle_prophecy_claim_log(log).await?;
        }

        Ok(())
    }

    async fn handle_bridge_event(&self, event: EthereumBridgeEvent) -> Result<()> {
        if self.seen.lock().await.check_and_insert(event.dedup_key()) {
            debug!(tx_hash = %event.tx_hash, log_index = event.log_index, "Skipping duplicate event");
            return Ok(());
        }
        metrics::record_event_witnessed("ethereum", event.kind.as_str());

        match self
            .claim_builder
            .ethereum_event_to_claim(&event, self.bridge_bank)
        {
            Ok(claim) => {
                info!(
                    prophecy_id = %claim.prophecy_id(),
                    claim_type = %claim.claim_type,
                    symbol = %claim.symbol,
                    amount = %claim.amount,
                    "Witnessed bridge event"
                );
                self.claim_tx
                    .send(claim)
                    .await
                    .wrap_err("Cosmos claim channel closed")?;
            }
            Err(e) => {
                warn!(
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    error = %e,
                    "Rejected bridge event during canonicalization"
                );
                metrics::record_error("ethereum", "claim_validation");
            }
        }

        Ok(())
    }

    async fn handle_prophecy_claim_log(&self, log: &Log) -> Result<()> {
        let key = (
            log.transaction_hash.unwrap_or_default(),
            log.log_index.unwrap_or_default(),
        );
        if self.seen.lock().await.check_and_insert(key) {
            return Ok(());
        }

        match decode_prophecy_claim(log) {
            Ok(relay) => {
                metrics::record_event_witnessed("ethereum", "prophecy_claim");
                info!(
                    prophecy_id = %relay.prophecy_id,
                    symbol = %relay.symbol,
                    amount = %relay.amount,
                    "Witnessed prophecy claim, queueing oracle relay"
                );
                self.submission_tx
                    .send(EthereumSubmission::OracleClaim(relay))
                    .await
                    .wrap_err("Ethereum submission channel closed")?;
            }
            Err(e) => self.log_decode_error(log, "LogNewProphecyClaim", e),
        }

        Ok(())
    }

    fn log_decode_error(&self, log: &Log, event_name: &str, error: eyre::Report) {
        error!(
            tx_hash = ?log.transaction_hash,
            log_index = ?log.log_index,
            event = event_name,
            error = %error,
            "Failed to decode bridge log"
        );
        metrics::record_error("ethereum", "decode");
    }
}
