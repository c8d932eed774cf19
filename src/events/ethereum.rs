//! Decoded BridgeBank and CosmosBridge log events.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use eyre::{eyre, Result, WrapErr};

use crate::contracts::{BridgeBank, CosmosBridge};
use crate::types::{ClaimType, ProphecyClaimRelay};

/// A lock or burn witnessed on the BridgeBank contract, decoded but not
/// yet canonicalized.
#[derive(Debug, Clone)]
pub struct EthereumBridgeEvent {
    pub kind: ClaimType,
    /// Event id assigned by the contract.
    pub id: B256,
    /// Ethereum sender.
    pub from: Address,
    /// Destination chain recipient, raw bytes as emitted.
    pub to: Vec<u8>,
    /// Token contract; the zero address for the chain's native asset.
    pub token: Address,
    pub symbol: String,
    pub value: U256,
    pub nonce: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl EthereumBridgeEvent {
    /// Decode a BridgeBank LogLock.
    pub fn from_lock_log(log: &Log) -> Result<Self> {
        let event = BridgeBank::LogLock::decode_log_data(log.data(), true)
            .wrap_err("Failed to decode LogLock")?;
        Self::from_parts(
            ClaimType::Lock,
            event.id,
            event.from,
            event.to.to_vec(),
            event.token,
            event.symbol,
            event.value,
            event.nonce,
            log,
        )
    }

    /// Decode a BridgeBank LogBurn.
    pub fn from_burn_log(log: &Log) -> Result<Self> {
        let event = BridgeBank::LogBurn::decode_log_data(log.data(), true)
            .wrap_err("Failed to decode LogBurn")?;
        Self::from_parts(
            ClaimType::Burn,
            event.id,
            event.from,
            event.to.to_vec(),
            event.token,
            event.symbol,
            event.value,
            event.nonce,
            log,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn from_parts(
        kind: ClaimType,
        id: B256,
        from: Address,
        to: Vec<u8>,
        token: Address,
        symbol: String,
        value: U256,
        nonce: U256,
        log: &Log,
    ) -> Result<Self> {
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| eyre!("Missing transaction hash"))?;
        let log_index = log.log_index.ok_or_else(|| eyre!("Missing log index"))?;
        let nonce: u64 = nonce
            .try_into()
            .map_err(|_| eyre!("Event nonce {} out of u64 range", nonce))?;

        Ok(Self {
            kind,
            id,
            from,
            to,
            token,
            symbol,
            value,
            nonce,
            tx_hash,
            log_index,
        })
    }

    /// Session dedup key.
    pub fn dedup_key(&self) -> (B256, u64) {
        (self.tx_hash, self.log_index)
    }
}

/// Decode a CosmosBridge LogNewProphecyClaim into the relay payload the
/// signer consumes.
pub fn decode_prophecy_claim(log: &Log) -> Result<ProphecyClaimRelay> {
    let event = CosmosBridge::LogNewProphecyClaim::decode_log_data(log.data(), true)
        .wrap_err("Failed to decode LogNewProphecyClaim")?;
    Ok(ProphecyClaimRelay {
        prophecy_id: event.prophecyId,
        cosmos_sender: event.cosmosSender.to_vec(),
        ethereum_receiver: event.ethereumReceiver,
        symbol: event.symbol,
        amount: event.amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData};

    fn lock_log() -> (BridgeBank::LogLock, Log) {
        let event = BridgeBank::LogLock {
            id: B256::repeat_byte(0x07),
            from: Address::repeat_byte(0x01),
            to: Bytes::from_static(b"cosmos1x54ltnyg88k0ejmk8ytwrhd3ltm84xehrnlslf"),
            token: Address::ZERO,
            symbol: "eth".to_string(),
            value: U256::from(1_000_000_000_000_000_000u128),
            nonce: U256::from(12u64),
        };
        let data: LogData = event.encode_log_data();
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xbb),
                data,
            },
            transaction_hash: Some(B256::repeat_byte(0xaa)),
            log_index: Some(3),
            ..Default::default()
        };
        (event, log)
    }

    #[test]
    fn test_lock_event_decode_round_trip() {
        let (original, log) = lock_log();
        let decoded = EthereumBridgeEvent::from_lock_log(&log).unwrap();

        assert_eq!(decoded.kind, ClaimType::Lock);
        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.from, original.from);
        assert_eq!(decoded.to, original.to.to_vec());
        assert_eq!(decoded.token, original.token);
        assert_eq!(decoded.symbol, original.symbol);
        assert_eq!(decoded.value, original.value);
        assert_eq!(decoded.nonce, 12);
        assert_eq!(decoded.dedup_key(), (B256::repeat_byte(0xaa), 3));
    }

    #[test]
    fn test_burn_log_does_not_decode_as_lock() {
        let event = BridgeBank::LogBurn {
            id: B256::ZERO,
            from: Address::repeat_byte(0x01),
            to: Bytes::from_static(b"cosmos1x54ltnyg88k0ejmk8ytwrhd3ltm84xehrnlslf"),
            token: Address::repeat_byte(0x02),
            symbol: "peggyatom".to_string(),
            value: U256::from(5u64),
            nonce: U256::from(1u64),
        };
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xbb),
                data: event.encode_log_data(),
            },
            transaction_hash: Some(B256::repeat_byte(0xaa)),
            log_index: Some(0),
            ..Default::default()
        };
        assert!(EthereumBridgeEvent::from_lock_log(&log).is_err());
        assert!(EthereumBridgeEvent::from_burn_log(&log).is_ok());
    }

    #[test]
    fn test_missing_log_metadata_is_an_error() {
        let (_, mut log) = lock_log();
        log.transaction_hash = None;
        assert!(EthereumBridgeEvent::from_lock_log(&log).is_err());
    }

    #[test]
    fn test_prophecy_claim_decode_round_trip() {
        let event = CosmosBridge::LogNewProphecyClaim {
            prophecyId: U256::from(44u64),
            cosmosSender: Bytes::from_static(b"cosmos1x54ltnyg88k0ejmk8ytwrhd3ltm84xehrnlslf"),
            ethereumReceiver: Address::repeat_byte(0x42),
            symbol: "eth".to_string(),
            amount: U256::from(77u64),
        };
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xcc),
                data: event.encode_log_data(),
            },
            ..Default::default()
        };
        let relay = decode_prophecy_claim(&log).unwrap();
        assert_eq!(relay.prophecy_id, U256::from(44u64));
        assert_eq!(relay.ethereum_receiver, Address::repeat_byte(0x42));
        assert_eq!(relay.symbol, "eth");
        assert_eq!(relay.amount, U256::from(77u64));
    }
}
