//! Cosmos LCD client for transaction signing and broadcasting
//!
//! Signs transactions with cosmrs and broadcasts them via the LCD REST
//! API. Account number and sequence are fetched immediately before
//! signing; the single writer task that owns this client is what keeps
//! sequence allocation serialized for the account.

use std::time::Duration;

use bip39::Mnemonic;
use cosmrs::{
    bip32::DerivationPath,
    crypto::secp256k1::SigningKey,
    tx::{self, Fee, SignDoc, SignerInfo},
    AccountId, Any, Coin,
};
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::{CreateBridgeClaim, CREATE_BRIDGE_CLAIM_TYPE_URL};

/// Cosmos SDK derivation path (ATOM coin type)
const COSMOS_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// Fixed gas limit for claim submissions.
const CLAIM_GAS_LIMIT: u64 = 250_000;

/// Cosmos client for signing and broadcasting claim transactions
pub struct CosmosClient {
    lcd_url: String,
    chain_id: String,
    fee_denom: String,
    gas_price: f64,
    /// Signing key derived from mnemonic
    signing_key: SigningKey,
    /// Account address
    pub address: AccountId,
    /// HTTP client
    client: Client,
}

/// Account info from LCD
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub sequence: u64,
    pub account_number: u64,
}

impl CosmosClient {
    /// Create a new client from mnemonic. Key derivation failures are
    /// fatal: retrying with the same material cannot succeed.
    pub fn new(
        lcd_url: &str,
        chain_id: &str,
        account_prefix: &str,
        fee_denom: &str,
        gas_price: f64,
        mnemonic: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        // Parse mnemonic and derive signing key
        let mnemonic = Mnemonic::parse(mnemonic).map_err(|e| eyre!("Invalid mnemonic: {}", e))?;

        let seed = mnemonic.to_seed("");
        let path: DerivationPath = COSMOS_DERIVATION_PATH
            .parse()
            .map_err(|e| eyre!("Invalid derivation path: {:?}", e))?;

        let signing_key = SigningKey::derive_from_path(seed, &path)
            .map_err(|e| eyre!("Failed to derive signing key: {}", e))?;

        // Get account address
        let public_key = signing_key.public_key();
        let address = public_key
            .account_id(account_prefix)
            .map_err(|e| eyre!("Failed to get account ID: {}", e))?;

        info!(
            address = %address,
            chain_id = chain_id,
            "Cosmos client initialized"
        );

        Ok(Self {
            lcd_url: lcd_url.to_string(),
            chain_id: chain_id.to_string(),
            fee_denom: fee_denom.to_string(),
            gas_price,
            signing_key,
            address,
            client,
        })
    }

    /// Get account info (sequence and account number)
    pub async fn get_account_info(&self) -> Result<AccountInfo> {
        let url = format!(
            "{}/cosmos/auth/v1beta1/accounts/{}",
            self.lcd_url, self.address
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("Failed to query account info")?;

        if !response.status().is_success() {
            return Err(eyre!(
                "Account query failed: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let data: serde_json::Value = response.json().await?;

        // Handle different account response formats
        let account = data
            .get("account")
            .ok_or_else(|| eyre!("Missing 'account' field in response"))?;

        let sequence = account
            .get("sequence")
            .or_else(|| account.get("base_account").and_then(|b| b.get("sequence")))
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        let account_number = account
            .get("account_number")
            .or_else(|| {
                account
                    .get("base_account")
                    .and_then(|b| b.get("account_number"))
            })
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        Ok(AccountInfo {
            sequence,
            account_number,
        })
    }

    /// Sign and broadcast a bridge claim message.
    ///
    /// Sequence fetch, signing, and broadcast happen inside this one
    /// call; the owning writer task serializes calls per account.
    pub async fn submit_bridge_claim(&self, claim: &CreateBridgeClaim) -> Result<String> {
        let account_info = self.get_account_info().await?;

        let fee_amount = ((CLAIM_GAS_LIMIT as f64) * self.gas_price).ceil() as u128;

        // The host chain's codec registration is external; the claim
        // travels as a versioned Any with a canonical JSON body.
        let msg = Any {
            type_url: CREATE_BRIDGE_CLAIM_TYPE_URL.to_string(),
            value: claim
                .to_canonical_json()
                .wrap_err("Failed to encode claim")?,
        };

        let body = tx::Body::new(vec![msg], "", 0u32);

        let public_key = self.signing_key.public_key();
        let signer_info = SignerInfo::single_direct(Some(public_key), account_info.sequence);

        let fee = Fee::from_amount_and_gas(
            Coin {
                denom: self
                    .fee_denom
                    .parse()
                    .map_err(|e| eyre!("Invalid fee denom: {:?}", e))?,
                amount: fee_amount,
            },
            CLAIM_GAS_LIMIT,
        );

        let auth_info = signer_info.auth_info(fee);

        let chain_id = self
            .chain_id
            .parse()
            .map_err(|_| eyre!("Invalid chain ID"))?;

        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, account_info.account_number)
            .map_err(|e| eyre!("Failed to create sign doc: {}", e))?;

        let tx_raw = sign_doc
            .sign(&self.signing_key)
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

        let tx_bytes = tx_raw
            .to_bytes()
            .map_err(|e| eyre!("Failed to serialize transaction: {}", e))?;

        self.broadcast_tx(&tx_bytes).await
    }

    /// Broadcast a signed transaction and surface mempool rejections.
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<String> {
        let tx_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx_bytes);

        let broadcast_request = serde_json::json!({
            "tx_bytes": tx_b64,
            "mode": "BROADCAST_MODE_SYNC"
        });

        let broadcast_url = format!("{}/cosmos/tx/v1beta1/txs", self.lcd_url);
        debug!(url = %broadcast_url, "Broadcasting transaction");

        let response = self
            .client
            .post(&broadcast_url)
            .json(&broadcast_request)
            .send()
            .await
            .wrap_err("Failed to broadcast transaction")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({"error": "Failed to parse response"}));

        if !status.is_success() {
            return Err(eyre!("Broadcast failed: {} - {}", status, body));
        }

        let tx_response = body
            .get("tx_response")
            .ok_or_else(|| eyre!("Broadcast response missing tx_response: {}", body))?;

        let code = tx_response
            .get("code")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        if code != 0 {
            let raw_log = tx_response
                .get("raw_log")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            // Sequence/fee/mempool rejections land here; the caller's
            // retry classification decides what to do.
            return Err(eyre!("Transaction rejected (code {}): {}", code, raw_log));
        }

        let txhash = tx_response
            .get("txhash")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        info!(txhash = %txhash, "Claim transaction broadcast successful");
        Ok(txhash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derivation_path() {
        let path: Result<DerivationPath, _> = COSMOS_DERIVATION_PATH.parse();
        assert!(path.is_ok());
    }

    #[test]
    fn test_client_derives_prefixed_address() {
        let client = CosmosClient::new(
            "http://localhost:1317",
            "prophecy-1",
            "cosmos",
            "stake",
            0.025,
            TEST_MNEMONIC,
        )
        .unwrap();
        assert!(client.address.to_string().starts_with("cosmos1"));
    }

    #[test]
    fn test_invalid_mnemonic_is_fatal() {
        let result = CosmosClient::new(
            "http://localhost:1317",
            "prophecy-1",
            "cosmos",
            "stake",
            0.025,
            "definitely not a mnemonic",
        );
        assert!(result.is_err());
    }
}
