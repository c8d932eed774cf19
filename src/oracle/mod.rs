//! Prophecy consensus: aggregation of validator claims about one
//! cross-chain event into a final, tamper-resistant outcome.

pub mod engine;
pub mod prophecy;

pub use engine::{
    Oracle, ProphecyQueryParams, ProphecyResponse, SettlementAction, SettlementRegistry,
    StaticValidatorSet, ValidatorSet,
};
pub use prophecy::{Prophecy, ProphecyStatus};
