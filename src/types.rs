//! Common types for cross-chain claims.
//!
//! Claim content carries an explicit versioned canonical encoding so the
//! consensus engine's notion of "same claim" is reproducible across
//! implementations and independent of any serialization library.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OracleError;

/// Version tag for the canonical claim content encoding.
const CONTENT_ENCODING_VERSION: &str = "v1";

/// Separator for canonical claim content fields. Must not occur in
/// bech32 addresses, denoms, or decimal amounts.
const CONTENT_SEPARATOR: char = '|';

/// Kind of cross-chain claim.
///
/// `Burn` releases a previously locked native asset on the destination
/// chain; `Lock` mints a bridge-wrapped asset there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Burn,
    Lock,
}

impl ClaimType {
    /// All claim kinds; used to validate settlement handler coverage.
    pub const ALL: [ClaimType; 2] = [ClaimType::Burn, ClaimType::Lock];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Burn => "burn",
            ClaimType::Lock => "lock",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = crate::error::ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "burn" => Ok(ClaimType::Burn),
            "lock" => Ok(ClaimType::Lock),
            other => Err(crate::error::ClaimError::UnknownClaimType(other.to_string())),
        }
    }
}

/// Canonical content of a claim: what the validators must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimContent {
    pub kind: ClaimType,
    /// Receiver on the destination chain.
    pub receiver: String,
    /// Denomination on the destination chain.
    pub denom: String,
    /// Amount in base units, decimal.
    pub amount: U256,
}

impl ClaimContent {
    /// Canonical string form: `v1|<kind>|<receiver>|<denom>|<amount>`.
    ///
    /// Two claims are "the same" exactly when their canonical strings
    /// are byte-equal.
    pub fn canonical(&self) -> String {
        format!(
            "{ver}{sep}{kind}{sep}{receiver}{sep}{denom}{sep}{amount}",
            ver = CONTENT_ENCODING_VERSION,
            sep = CONTENT_SEPARATOR,
            kind = self.kind,
            receiver = self.receiver,
            denom = self.denom,
            amount = self.amount,
        )
    }

    /// Parse a canonical string back into structured content.
    pub fn from_canonical(s: &str) -> Result<Self, OracleError> {
        let parts: Vec<&str> = s.split(CONTENT_SEPARATOR).collect();
        if parts.len() != 5 || parts[0] != CONTENT_ENCODING_VERSION {
            return Err(OracleError::MalformedContent(s.to_string()));
        }
        let kind = parts[1]
            .parse::<ClaimType>()
            .map_err(|_| OracleError::MalformedContent(s.to_string()))?;
        let amount = U256::from_str(parts[4])
            .map_err(|_| OracleError::MalformedContent(s.to_string()))?;
        Ok(ClaimContent {
            kind,
            receiver: parts[2].to_string(),
            denom: parts[3].to_string(),
            amount,
        })
    }
}

/// One validator's assertion about one cross-chain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeClaim {
    /// Target prophecy id.
    pub prophecy_id: String,
    /// Bech32 address of the submitting validator.
    pub validator_address: String,
    pub content: ClaimContent,
}

/// Message broadcast to the destination chain carrying a witnessed
/// Ethereum bridge event. Mirrors the chain's `CreateBridgeClaim`
/// message shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBridgeClaim {
    /// Ethereum chain id the event was witnessed on.
    pub ethereum_chain_id: u64,
    /// Event nonce from the bridge contract.
    pub nonce: u64,
    /// BridgeBank contract the event was emitted by.
    pub bridge_contract_address: String,
    /// Ethereum sender, 0x hex.
    pub sender: String,
    /// Destination chain receiver, bech32.
    pub receiver: String,
    /// Submitting validator, bech32.
    pub validator_address: String,
    /// Destination denom after canonicalization.
    pub symbol: String,
    /// Amount in base units, decimal string.
    pub amount: String,
    pub claim_type: ClaimType,
}

/// Type URL carried in the protobuf `Any` wrapping the claim message.
/// Versioned so the wire format can evolve without ambiguity.
pub const CREATE_BRIDGE_CLAIM_TYPE_URL: &str = "/prophecybridge.ethbridge.v1.MsgCreateBridgeClaim";

impl CreateBridgeClaim {
    /// Deterministic prophecy id for this claim:
    /// `<chain id>-<nonce>-<lowercase sender>`.
    pub fn prophecy_id(&self) -> String {
        prophecy_id(self.ethereum_chain_id, self.nonce, &self.sender)
    }

    /// The consensus-level content this message asserts.
    pub fn content(&self) -> Result<ClaimContent, OracleError> {
        let amount = U256::from_str(&self.amount)
            .map_err(|_| OracleError::MalformedContent(self.amount.clone()))?;
        Ok(ClaimContent {
            kind: self.claim_type,
            receiver: self.receiver.clone(),
            denom: self.symbol.clone(),
            amount,
        })
    }

    /// Canonical JSON bytes for the wire. Field order is fixed by the
    /// struct definition; the encoding is versioned by the type URL.
    pub fn to_canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Deterministic prophecy id from the witnessed event's coordinates.
pub fn prophecy_id(ethereum_chain_id: u64, nonce: u64, sender: &str) -> String {
    format!("{}-{}-{}", ethereum_chain_id, nonce, sender.to_lowercase())
}

/// Signed payload relayed back to the Ethereum Oracle contract.
#[derive(Debug, Clone)]
pub struct SignedOracleClaim {
    /// Prophecy id assigned by the CosmosBridge contract.
    pub prophecy_id: U256,
    /// Keccak-256 claim message hash (pre personal-sign prefix).
    pub message: [u8; 32],
    /// 65-byte r||s||v signature over the prefixed message.
    pub signature: [u8; 65],
}

/// A prophecy claim witnessed on the Ethereum CosmosBridge contract,
/// pending signature and relay to the Oracle contract.
#[derive(Debug, Clone)]
pub struct ProphecyClaimRelay {
    pub prophecy_id: U256,
    pub cosmos_sender: Vec<u8>,
    pub ethereum_receiver: Address,
    pub symbol: String,
    pub amount: U256,
}
