//! Ethereum Writer - Submits prophecy and oracle claims
//!
//! Two submission paths share one signing account:
//!
//! 1. Witnessed Cosmos burns/locks open prophecy claims on the
//!    CosmosBridge contract.
//! 2. Witnessed `LogNewProphecyClaim` events are signed with the
//!    validator key and relayed to the Oracle contract, which runs the
//!    on-chain weighted-consensus check.
//!
//! Pending-nonce fetch and broadcast happen inside one mutex-guarded
//! critical section so concurrent submissions from this account can
//! never allocate the same nonce.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use eyre::{eyre, Result, WrapErr};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::EthereumConfig;
use crate::contracts::{CosmosBridge, Oracle};
use crate::events::cosmos::CosmosBridgeEvent;
use crate::metrics;
use crate::signer::ClaimSigner;
use crate::types::ProphecyClaimRelay;
use crate::writers::retry::{with_retry, RetryConfig};
use crate::writers::CircuitBreakerConfig;

/// Fixed gas limit for claim submissions.
const CLAIM_GAS_LIMIT: u64 = 300_000;

/// Work items for the Ethereum writer.
#[derive(Debug, Clone)]
pub enum EthereumSubmission {
    /// Open a prophecy claim for a witnessed Cosmos burn/lock.
    ProphecyClaim(CosmosBridgeEvent),
    /// Sign and relay a witnessed prophecy claim to the Oracle.
    OracleClaim(ProphecyClaimRelay),
}

/// Ethereum transaction writer for both claim paths
pub struct EthereumWriter {
    rpc_url: String,
    cosmos_bridge_address: Address,
    oracle_address: Address,
    signer: PrivateKeySigner,
    claim_signer: ClaimSigner,
    rx: mpsc::Receiver<EthereumSubmission>,
    retry_config: RetryConfig,
    circuit_breaker: CircuitBreakerConfig,
    consecutive_failures: u32,
    /// Serializes nonce allocation: held from pending-nonce fetch
    /// through broadcast.
    nonce_lock: Mutex<()>,
}

impl EthereumWriter {
    pub fn new(
        config: &EthereumConfig,
        cosmos_bridge_address: Address,
        oracle_address: Address,
        retry_config: RetryConfig,
        rx: mpsc::Receiver<EthereumSubmission>,
    ) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .wrap_err("Invalid private key")?;
        let claim_signer = ClaimSigner::from_hex(&config.private_key)
            .wrap_err("Invalid claim signing key")?;

        info!(
            relayer_address = %signer.address(),
            chain_id = config.chain_id,
            cosmos_bridge = %cosmos_bridge_address,
            oracle = %oracle_address,
            "Ethereum writer initialized"
        );

        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            cosmos_bridge_address,
            oracle_address,
            signer,
            claim_signer,
            rx,
            retry_config,
            circuit_breaker: CircuitBreakerConfig::default(),
            consecutive_failures: 0,
            nonce_lock: Mutex::new(()),
        })
    }

    /// Drain submissions until the channel closes.
    pub async fn run(mut self) -> Result<()> {
        while let Some(submission) = self.rx.recv().await {
            if self.consecutive_failures >= self.circuit_breaker.threshold {
                warn!(
                    failures = self.consecutive_failures,
                    pause_secs = self.circuit_breaker.pause_duration.as_secs(),
                    "Ethereum circuit breaker tripped, pausing writer"
                );
                tokio::time::sleep(self.circuit_breaker.pause_duration).await;
                self.consecutive_failures = 0;
            }

            let result = match &submission {
                EthereumSubmission::ProphecyClaim(event) => {
                    with_retry(&self.retry_config, |_, gas_override| {
                        self.submit_prophecy_claim(event, gas_override)
                    })
                    .await
                }
                EthereumSubmission::OracleClaim(relay) => {
                    with_retry(&self.retry_config, |_, gas_override| {
                        self.submit_oracle_claim(relay, gas_override)
                    })
                    .await
                }
            };

            match result {
                Ok(tx_hash) => {
                    self.consecutive_failures = 0;
                    metrics::record_claim_submitted("ethereum", true);
                    info!(tx_hash = %tx_hash, "Submitted Ethereum claim transaction");
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    metrics::record_claim_submitted("ethereum", false);
                    metrics::record_error("ethereum", "claim_submission");
                    metrics::set_consecutive_failures("ethereum", self.consecutive_failures);
                    error!(
                        error = %e,
                        consecutive_failures = self.consecutive_failures,
                        "Failed to submit Ethereum claim"
                    );
                }
            }
        }

        info!("Ethereum submission channel closed, writer stopping");
        Ok(())
    }

    /// Open a prophecy claim on the CosmosBridge contract.
    async fn submit_prophecy_claim(
        &self,
        event: &CosmosBridgeEvent,
        gas_override: Option<u128>,
    ) -> Result<String> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .on_http(self.rpc_url.parse().wrap_err("Invalid RPC URL")?);
        let contract = CosmosBridge::new(self.cosmos_bridge_address, &provider);

        debug!(
            nonce = event.nonce,
            receiver = %event.ethereum_receiver,
            symbol = %event.symbol,
            amount = %event.amount,
            "Submitting newProphecyClaim"
        );

        let call = contract.newProphecyClaim(
            U256::from(event.nonce),
            Bytes::from(event.cosmos_sender.clone().into_bytes()),
            event.ethereum_receiver,
            event.token_contract,
            event.symbol.clone(),
            event.amount,
        );

        // Hold the nonce lock across fetch and broadcast: two
        // submissions may never observe the same pending nonce.
        // get_transaction_count returns the pending nonce by default.
        let pending_tx = {
            let _guard = self.nonce_lock.lock().await;
            let nonce = provider
                .get_transaction_count(self.signer.address())
                .await
                .wrap_err("Failed to fetch pending nonce")?;
            let gas_price = match gas_override {
                Some(price) => price,
                None => provider
                    .get_gas_price()
                    .await
                    .wrap_err("Failed to fetch gas price")?,
            };
            call.nonce(nonce)
                .gas(CLAIM_GAS_LIMIT)
                .gas_price(gas_price)
                .send()
                .await
                .map_err(|e| eyre!("Failed to send transaction: {}", e))?
        };

        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

        if !receipt.status() {
            return Err(eyre!("Transaction reverted"));
        }

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Sign a witnessed prophecy claim and relay it to the Oracle.
    async fn submit_oracle_claim(
        &self,
        relay: &ProphecyClaimRelay,
        gas_override: Option<u128>,
    ) -> Result<String> {
        let signed = self.claim_signer.sign_oracle_claim(relay)?;
        metrics::record_oracle_claim_signed();

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .on_http(self.rpc_url.parse().wrap_err("Invalid RPC URL")?);
        let contract = Oracle::new(self.oracle_address, &provider);

        let r = B256::from_slice(&signed.signature[..32]);
        let s = B256::from_slice(&signed.signature[32..64]);
        let v = signed.signature[64];

        debug!(
            prophecy_id = %signed.prophecy_id,
            message = %hex::encode(signed.message),
            "Submitting newOracleClaim"
        );

        let call = contract.newOracleClaim(
            signed.prophecy_id,
            B256::from(signed.message),
            v,
            r,
            s,
        );

        let pending_tx = {
            let _guard = self.nonce_lock.lock().await;
            let nonce = provider
                .get_transaction_count(self.signer.address())
                .await
                .wrap_err("Failed to fetch pending nonce")?;
            let gas_price = match gas_override {
                Some(price) => price,
                None => provider
                    .get_gas_price()
                    .await
                    .wrap_err("Failed to fetch gas price")?,
            };
            call.nonce(nonce)
                .gas(CLAIM_GAS_LIMIT)
                .gas_price(gas_price)
                .send()
                .await
                .map_err(|e| eyre!("Failed to send transaction: {}", e))?
        };

        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

        if !receipt.status() {
            return Err(eyre!("Oracle claim transaction reverted"));
        }

        Ok(format!("{:#x}", receipt.transaction_hash))
    }
}
