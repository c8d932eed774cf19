//! Canonicalization of witnessed events into claims.
//!
//! Both directions share one builder carrying the relayer's identity
//! and the chain conventions: the destination chain's bech32 account
//! prefix, the bridge token prefix, and the source chain's native asset
//! symbol. Validation failures are typed and recoverable; the offending
//! event is skipped, never the process.

use alloy::primitives::{Address, U256};
use std::str::FromStr;

use crate::error::ClaimError;
use crate::events::cosmos::{
    self, Attribute, CosmosBridgeEvent, ATTR_AMOUNT, ATTR_COSMOS_SENDER, ATTR_ETHEREUM_RECEIVER,
    ATTR_NONCE, ATTR_SYMBOL, ATTR_TOKEN_CONTRACT, BURN_EVENT_TYPE, LOCK_EVENT_TYPE,
};
use crate::events::ethereum::EthereumBridgeEvent;
use crate::types::{ClaimType, CreateBridgeClaim};

/// Default prefix for bridge-wrapped denominations.
pub const DEFAULT_TOKEN_PREFIX: &str = "peggy";

/// Symbol of the Ethereum chain's native asset.
pub const NATIVE_SYMBOL: &str = "eth";

/// Canonicalizes witnessed events into chain-agnostic claims.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    /// The relaying validator's bech32 address.
    validator_address: String,
    /// Bech32 human-readable prefix of destination chain accounts.
    account_prefix: String,
    /// Prefix carried by bridge-wrapped denoms.
    token_prefix: String,
    ethereum_chain_id: u64,
}

impl ClaimBuilder {
    pub fn new(
        validator_address: impl Into<String>,
        account_prefix: impl Into<String>,
        token_prefix: impl Into<String>,
        ethereum_chain_id: u64,
    ) -> Self {
        Self {
            validator_address: validator_address.into(),
            account_prefix: account_prefix.into(),
            token_prefix: token_prefix.into(),
            ethereum_chain_id,
        }
    }

    /// Canonicalize a witnessed BridgeBank event into the claim message
    /// submitted to the destination chain.
    ///
    /// Burn events carry a bridge-wrapped symbol; the prefix is
    /// stripped to recover the native denom being released. Lock events
    /// mint a prefixed denom; a lock of the native asset must pair with
    /// the zero token address.
    pub fn ethereum_event_to_claim(
        &self,
        event: &EthereumBridgeEvent,
        bridge_contract: Address,
    ) -> Result<CreateBridgeClaim, ClaimError> {
        let receiver = self.validate_receiver(&event.to)?;
        let symbol = event.symbol.to_lowercase();

        let denom = match event.kind {
            ClaimType::Burn => match symbol.strip_prefix(&self.token_prefix) {
                Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                _ => return Err(ClaimError::MissingTokenPrefix(event.symbol.clone())),
            },
            ClaimType::Lock => {
                if symbol == NATIVE_SYMBOL && event.token != Address::ZERO {
                    return Err(ClaimError::NativeTokenMismatch {
                        symbol: event.symbol.clone(),
                        token: format!("{:#x}", event.token),
                    });
                }
                format!("{}{}", self.token_prefix, symbol)
            }
        };

        Ok(CreateBridgeClaim {
            ethereum_chain_id: self.ethereum_chain_id,
            nonce: event.nonce,
            bridge_contract_address: format!("{:#x}", bridge_contract),
            sender: format!("{:#x}", event.from),
            receiver,
            validator_address: self.validator_address.clone(),
            symbol: denom,
            amount: event.value.to_string(),
            claim_type: event.kind,
        })
    }

    /// Parse a burn/lock event from a Cosmos transaction into the typed
    /// event relayed to the CosmosBridge contract. Returns `Ok(None)`
    /// for unrelated event types.
    pub fn cosmos_event_to_claim(
        &self,
        event: &cosmos::Event,
        tx_hash: &str,
        msg_index: u64,
    ) -> Result<Option<CosmosBridgeEvent>, ClaimError> {
        let kind = match event.type_str.as_str() {
            BURN_EVENT_TYPE => ClaimType::Burn,
            LOCK_EVENT_TYPE => ClaimType::Lock,
            _ => return Ok(None),
        };

        let cosmos_sender = extract(&event.attributes, ATTR_COSMOS_SENDER)?.to_string();
        let ethereum_receiver = extract_address(&event.attributes, ATTR_ETHEREUM_RECEIVER)?;
        let token_contract = extract_address(&event.attributes, ATTR_TOKEN_CONTRACT)?;
        let symbol = extract(&event.attributes, ATTR_SYMBOL)?.to_string();
        let amount = extract_u256(&event.attributes, ATTR_AMOUNT)?;
        let nonce = extract_u64(&event.attributes, ATTR_NONCE)?;

        Ok(Some(CosmosBridgeEvent {
            kind,
            cosmos_sender,
            ethereum_receiver,
            token_contract,
            symbol,
            amount,
            nonce,
            tx_hash: tx_hash.to_string(),
            msg_index,
        }))
    }

    /// A well-formed receiver is non-empty UTF-8 bech32 with the
    /// destination chain's account prefix.
    fn validate_receiver(&self, raw: &[u8]) -> Result<String, ClaimError> {
        if raw.is_empty() {
            return Err(ClaimError::EmptyReceiver);
        }
        let receiver = String::from_utf8(raw.to_vec()).map_err(|_| ClaimError::InvalidReceiver {
            address: hex::encode(raw),
            reason: "not valid utf-8".to_string(),
        })?;
        let (hrp, _, _) = bech32::decode(&receiver).map_err(|e| ClaimError::InvalidReceiver {
            address: receiver.clone(),
            reason: e.to_string(),
        })?;
        if hrp != self.account_prefix {
            return Err(ClaimError::InvalidReceiver {
                address: receiver,
                reason: format!("expected {} account, got {}", self.account_prefix, hrp),
            });
        }
        Ok(receiver)
    }
}

fn extract<'a>(attrs: &'a [Attribute], key: &str) -> Result<&'a str, ClaimError> {
    cosmos::find_attribute(attrs, key).ok_or_else(|| ClaimError::MissingAttribute(key.to_string()))
}

fn extract_address(attrs: &[Attribute], key: &str) -> Result<Address, ClaimError> {
    let value = extract(attrs, key)?;
    Address::from_str(value).map_err(|e| ClaimError::InvalidHexAddress {
        address: value.to_string(),
        reason: e.to_string(),
    })
}

fn extract_u256(attrs: &[Attribute], key: &str) -> Result<U256, ClaimError> {
    let value = extract(attrs, key)?;
    U256::from_str(value).map_err(|_| ClaimError::InvalidInteger {
        field: key.to_string(),
        value: value.to_string(),
    })
}

fn extract_u64(attrs: &[Attribute], key: &str) -> Result<u64, ClaimError> {
    let value = extract(attrs, key)?;
    value.parse().map_err(|_| ClaimError::InvalidInteger {
        field: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    const RECEIVER: &str = "cosmos1x54ltnyg88k0ejmk8ytwrhd3ltm84xehrnlslf";

    fn builder() -> ClaimBuilder {
        ClaimBuilder::new(
            "cosmosvaloper1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqn6mnvy",
            "cosmos",
            DEFAULT_TOKEN_PREFIX,
            5,
        )
    }

    fn lock_event() -> EthereumBridgeEvent {
        EthereumBridgeEvent {
            kind: ClaimType::Lock,
            id: B256::ZERO,
            from: Address::repeat_byte(0x01),
            to: RECEIVER.as_bytes().to_vec(),
            token: Address::ZERO,
            symbol: "ETH".to_string(),
            value: U256::from(1_000_000u64),
            nonce: 7,
            tx_hash: B256::repeat_byte(0xaa),
            log_index: 0,
        }
    }

    #[test]
    fn test_lock_claim_mints_prefixed_denom() {
        let claim = builder()
            .ethereum_event_to_claim(&lock_event(), Address::repeat_byte(0xbb))
            .unwrap();
        assert_eq!(claim.symbol, "peggyeth");
        assert_eq!(claim.claim_type, ClaimType::Lock);
        assert_eq!(claim.receiver, RECEIVER);
        assert_eq!(claim.amount, "1000000");
        assert_eq!(claim.prophecy_id(), "5-7-0x0101010101010101010101010101010101010101");
    }

    #[test]
    fn test_native_lock_requires_zero_token_address() {
        let mut event = lock_event();
        event.token = Address::repeat_byte(0x02);
        let err = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap_err();
        assert!(matches!(err, ClaimError::NativeTokenMismatch { .. }));

        // A non-native lock may carry any token contract.
        event.symbol = "USDC".to_string();
        let claim = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap();
        assert_eq!(claim.symbol, "peggyusdc");
    }

    #[test]
    fn test_burn_claim_strips_bridge_prefix() {
        let mut event = lock_event();
        event.kind = ClaimType::Burn;
        event.symbol = "peggyatom".to_string();
        event.token = Address::repeat_byte(0x03);
        let claim = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap();
        assert_eq!(claim.symbol, "atom");
        assert_eq!(claim.claim_type, ClaimType::Burn);
    }

    #[test]
    fn test_burn_claim_without_prefix_rejected() {
        let mut event = lock_event();
        event.kind = ClaimType::Burn;
        for bad in ["atom", "peggy", ""] {
            event.symbol = bad.to_string();
            let err = builder()
                .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
                .unwrap_err();
            assert!(matches!(err, ClaimError::MissingTokenPrefix(_)), "{bad}");
        }
    }

    #[test]
    fn test_receiver_validation() {
        let mut event = lock_event();

        event.to = Vec::new();
        let err = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap_err();
        assert_eq!(err, ClaimError::EmptyReceiver);

        event.to = b"not-a-bech32-address".to_vec();
        let err = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidReceiver { .. }));

        // Valid bech32 for the wrong chain prefix.
        event.to = b"terra1k82qfzhxmk3xd2tkqty8gcs83nnsgrcwcuylmu".to_vec();
        let err = builder()
            .ethereum_event_to_claim(&event, Address::repeat_byte(0xbb))
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidReceiver { .. }));
    }

    fn burn_attributes() -> Vec<Attribute> {
        [
            (ATTR_COSMOS_SENDER, RECEIVER),
            (ATTR_ETHEREUM_RECEIVER, "0x1111111111111111111111111111111111111111"),
            (ATTR_TOKEN_CONTRACT, "0x0000000000000000000000000000000000000000"),
            (ATTR_SYMBOL, "eth"),
            (ATTR_AMOUNT, "250000"),
            (ATTR_NONCE, "9"),
        ]
        .into_iter()
        .map(|(k, v)| Attribute {
            key: k.to_string(),
            value: v.to_string(),
        })
        .collect()
    }

    #[test]
    fn test_cosmos_burn_event_parses() {
        let event = cosmos::Event {
            type_str: "burn".to_string(),
            attributes: burn_attributes(),
        };
        let parsed = builder()
            .cosmos_event_to_claim(&event, "TXHASH", 0)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.kind, ClaimType::Burn);
        assert_eq!(parsed.cosmos_sender, RECEIVER);
        assert_eq!(
            parsed.ethereum_receiver,
            Address::repeat_byte(0x11)
        );
        assert_eq!(parsed.amount, U256::from(250_000u64));
        assert_eq!(parsed.nonce, 9);
        assert_eq!(parsed.dedup_key(), ("TXHASH".to_string(), 0));
    }

    #[test]
    fn test_cosmos_unrelated_event_skipped() {
        let event = cosmos::Event {
            type_str: "transfer".to_string(),
            attributes: vec![],
        };
        assert!(builder()
            .cosmos_event_to_claim(&event, "TXHASH", 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_cosmos_event_malformed_attributes_are_typed_errors() {
        let mut attrs = burn_attributes();
        attrs.retain(|a| a.key != ATTR_AMOUNT);
        let event = cosmos::Event {
            type_str: "burn".to_string(),
            attributes: attrs,
        };
        let err = builder()
            .cosmos_event_to_claim(&event, "TXHASH", 0)
            .unwrap_err();
        assert!(matches!(err, ClaimError::MissingAttribute(_)));

        let mut attrs = burn_attributes();
        for a in &mut attrs {
            if a.key == ATTR_ETHEREUM_RECEIVER {
                a.value = "0x1234".to_string();
            }
        }
        let event = cosmos::Event {
            type_str: "burn".to_string(),
            attributes: attrs,
        };
        let err = builder()
            .cosmos_event_to_claim(&event, "TXHASH", 0)
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidHexAddress { .. }));

        let mut attrs = burn_attributes();
        for a in &mut attrs {
            if a.key == ATTR_AMOUNT {
                a.value = "not-a-number".to_string();
            }
        }
        let event = cosmos::Event {
            type_str: "burn".to_string(),
            attributes: attrs,
        };
        let err = builder()
            .cosmos_event_to_claim(&event, "TXHASH", 0)
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidInteger { .. }));
    }
}
