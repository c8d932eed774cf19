//! Cosmos Writer - Submits bridge claim transactions
//!
//! Drains canonicalized claims from the Ethereum watcher and broadcasts
//! them as `CreateBridgeClaim` transactions on the destination chain.
//! This task is the single owner of the signing client, which keeps
//! account sequence allocation serialized.

use eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::CosmosConfig;
use crate::cosmos_client::CosmosClient;
use crate::metrics;
use crate::types::CreateBridgeClaim;
use crate::writers::retry::{with_retry, RetryConfig};
use crate::writers::CircuitBreakerConfig;

/// Cosmos transaction writer for submitting bridge claims
pub struct CosmosWriter {
    client: CosmosClient,
    rx: mpsc::Receiver<CreateBridgeClaim>,
    retry_config: RetryConfig,
    circuit_breaker: CircuitBreakerConfig,
    consecutive_failures: u32,
}

impl CosmosWriter {
    pub fn new(
        config: &CosmosConfig,
        retry_config: RetryConfig,
        rx: mpsc::Receiver<CreateBridgeClaim>,
    ) -> Result<Self> {
        let client = CosmosClient::new(
            &config.lcd_url,
            &config.chain_id,
            &config.account_prefix,
            &config.fee_denom,
            config.gas_price,
            &config.mnemonic,
        )
        .wrap_err("Failed to create Cosmos client")?;

        info!(
            relayer_address = %client.address,
            chain_id = %config.chain_id,
            "Cosmos writer initialized"
        );

        Ok(Self {
            client,
            rx,
            retry_config,
            circuit_breaker: CircuitBreakerConfig::default(),
            consecutive_failures: 0,
        })
    }

    /// The relayer's account address on the destination chain.
    pub fn relayer_address(&self) -> String {
        self.client.address.to_string()
    }

    /// Drain claims until the channel closes. A single failed claim is
    /// logged and dropped after retries; repeated failures trip the
    /// circuit breaker and pause the writer.
    pub async fn run(mut self) -> Result<()> {
        while let Some(claim) = self.rx.recv().await {
            if self.consecutive_failures >= self.circuit_breaker.threshold {
                warn!(
                    failures = self.consecutive_failures,
                    pause_secs = self.circuit_breaker.pause_duration.as_secs(),
                    "Cosmos circuit breaker tripped, pausing writer"
                );
                tokio::time::sleep(self.circuit_breaker.pause_duration).await;
                self.consecutive_failures = 0;
            }

            let prophecy_id = claim.prophecy_id();
            let result = with_retry(&self.retry_config, |_, _| {
                self.client.submit_bridge_claim(&claim)
            })
            .await;

            match result {
                Ok(tx_hash) => {
                    self.consecutive_failures = 0;
                    metrics::record_claim_submitted("cosmos", true);
                    info!(
                        prophecy_id = %prophecy_id,
                        tx_hash = %tx_hash,
                        claim_type = %claim.claim_type,
                        "Submitted bridge claim"
                    );
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    metrics::record_claim_submitted("cosmos", false);
                    metrics::record_error("cosmos", "claim_submission");
                    metrics::set_consecutive_failures("cosmos", self.consecutive_failures);
                    error!(
                        prophecy_id = %prophecy_id,
                        error = %e,
                        consecutive_failures = self.consecutive_failures,
                        "Failed to submit bridge claim"
                    );
                }
            }
        }

        info!("Cosmos claim channel closed, writer stopping");
        Ok(())
    }
}
