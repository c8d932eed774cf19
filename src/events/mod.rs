//! Typed witnessed events, one module per source chain.
//!
//! A witnessed event is ephemeral: it exists between log/transaction
//! decoding and claim construction, surviving only as a dedup key in
//! the session-scoped seen-events cache.

pub mod cosmos;
pub mod ethereum;

pub use cosmos::CosmosBridgeEvent;
pub use ethereum::EthereumBridgeEvent;
