//! Error taxonomy for the consensus engine and claim canonicalization.
//!
//! Relayer transport paths use `eyre` like the rest of the daemon code;
//! the library surface (oracle, claim builder) keeps typed errors so
//! callers can distinguish recoverable validation failures from
//! terminal consensus outcomes.

use thiserror::Error;

use crate::types::ClaimType;

/// Errors returned by the prophecy consensus engine.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("prophecy id cannot be empty")]
    EmptyProphecyId,

    #[error("claim submitted by non-active validator {0}")]
    ClaimByNonValidator(String),

    #[error("prophecy {0} already finalized, no further claims accepted")]
    ProphecyFinalized(String),

    #[error("validator {validator} already submitted a claim for prophecy {prophecy_id}")]
    DuplicateClaim {
        prophecy_id: String,
        validator: String,
    },

    #[error("prophecy {0} not found")]
    ProphecyNotFound(String),

    #[error("consensus_needed must be in (0, 1], got {0}")]
    InvalidConsensusNeeded(f64),

    #[error("no settlement handler registered for claim type {0}")]
    MissingSettlementHandler(ClaimType),

    #[error("settlement failed for prophecy {prophecy_id}: {reason}")]
    Settlement {
        prophecy_id: String,
        reason: String,
    },

    #[error("malformed claim content: {0}")]
    MalformedContent(String),
}

/// Validation errors raised while canonicalizing a witnessed event into
/// a claim. All recoverable: the offending event is logged and skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("receiver address is empty")]
    EmptyReceiver,

    #[error("invalid receiver address {address}: {reason}")]
    InvalidReceiver { address: String, reason: String },

    #[error("burn claim symbol {0} is missing the bridge token prefix")]
    MissingTokenPrefix(String),

    #[error("lock claim of native asset {symbol} must use the zero token address, got {token}")]
    NativeTokenMismatch { symbol: String, token: String },

    #[error("missing event attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid hex address {address}: {reason}")]
    InvalidHexAddress { address: String, reason: String },

    #[error("invalid integer value for {field}: {value}")]
    InvalidInteger { field: String, value: String },

    #[error("unknown claim type: {0}")]
    UnknownClaimType(String),
}
