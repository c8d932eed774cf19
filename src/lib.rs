//! Prophecy bridge: validator relayer and claim consensus for
//! Ethereum <-> Cosmos asset transfers.
//!
//! The crate has two halves:
//!
//! - [`oracle`] is the destination chain's consensus component. It
//!   aggregates independently submitted validator claims about one
//!   cross-chain event (a *prophecy*) and resolves them to a final
//!   outcome under weighted-majority rules. It runs inside the host
//!   chain's deterministic transaction pipeline and is plain
//!   single-threaded Rust.
//! - The relayer ([`watchers`], [`claims`], [`signer`], [`writers`])
//!   witnesses lock/burn events on both chains, canonicalizes them into
//!   claims, signs them per each chain's verification convention, and
//!   submits them with nonce and retry discipline.

pub mod api;
pub mod claims;
pub mod config;
pub mod contracts;
pub mod cosmos_client;
pub mod error;
pub mod events;
pub mod metrics;
pub mod oracle;
pub mod seen_events;
pub mod signer;
pub mod types;
pub mod watchers;
pub mod writers;

pub use error::{ClaimError, OracleError};
pub use oracle::{Oracle, Prophecy, ProphecyStatus};
pub use types::{BridgeClaim, ClaimContent, ClaimType, CreateBridgeClaim, SignedOracleClaim};
