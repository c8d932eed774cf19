//! Prometheus metrics for the prophecy relayer
//!
//! Exposes metrics on /metrics endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};

lazy_static! {
    // Block processing metrics
    pub static ref BLOCKS_PROCESSED: CounterVec = register_counter_vec!(
        "relayer_blocks_processed_total",
        "Total number of blocks processed",
        &["chain"]
    ).unwrap();

    pub static ref LATEST_BLOCK: GaugeVec = register_gauge_vec!(
        "relayer_latest_block",
        "Latest block number processed",
        &["chain"]
    ).unwrap();

    // Event metrics
    pub static ref EVENTS_WITNESSED: CounterVec = register_counter_vec!(
        "relayer_events_witnessed_total",
        "Total number of bridge events witnessed",
        &["chain", "kind"]
    ).unwrap();

    pub static ref CLAIMS_SUBMITTED: CounterVec = register_counter_vec!(
        "relayer_claims_submitted_total",
        "Total number of claims submitted",
        &["chain", "status"]
    ).unwrap();

    pub static ref ORACLE_CLAIMS_SIGNED: Counter = register_counter!(
        "relayer_oracle_claims_signed_total",
        "Total number of oracle claims signed"
    ).unwrap();

    // Error metrics
    pub static ref ERRORS: CounterVec = register_counter_vec!(
        "relayer_errors_total",
        "Total number of errors",
        &["chain", "type"]
    ).unwrap();

    pub static ref CONSECUTIVE_FAILURES: GaugeVec = register_gauge_vec!(
        "relayer_consecutive_failures",
        "Number of consecutive failures (circuit breaker)",
        &["chain"]
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "relayer_up",
        "Whether the relayer is up and running"
    ).unwrap();

    pub static ref LAST_SUCCESSFUL_POLL: GaugeVec = register_gauge_vec!(
        "relayer_last_successful_poll_timestamp",
        "Unix timestamp of last successful poll",
        &["chain"]
    ).unwrap();

    pub static ref SEEN_EVENTS: GaugeVec = register_gauge_vec!(
        "relayer_seen_events",
        "Number of entries in the session dedup cache",
        &["chain"]
    ).unwrap();
}

/// Record a block processed
pub fn record_block_processed(chain: &str, block_number: u64) {
    BLOCKS_PROCESSED.with_label_values(&[chain]).inc();
    LATEST_BLOCK
        .with_label_values(&[chain])
        .set(block_number as f64);
}

/// Record a witnessed bridge event
pub fn record_event_witnessed(chain: &str, kind: &str) {
    EVENTS_WITNESSED.with_label_values(&[chain, kind]).inc();
}

/// Record a claim submission
pub fn record_claim_submitted(chain: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    CLAIMS_SUBMITTED.with_label_values(&[chain, status]).inc();
}

/// Record an oracle claim signature
pub fn record_oracle_claim_signed() {
    ORACLE_CLAIMS_SIGNED.inc();
}

/// Record an error
pub fn record_error(chain: &str, error_type: &str) {
    ERRORS.with_label_values(&[chain, error_type]).inc();
}

/// Update consecutive failures (circuit breaker)
pub fn set_consecutive_failures(chain: &str, count: u32) {
    CONSECUTIVE_FAILURES
        .with_label_values(&[chain])
        .set(count as f64);
}

/// Record last successful poll
pub fn record_successful_poll(chain: &str) {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    LAST_SUCCESSFUL_POLL
        .with_label_values(&[chain])
        .set(timestamp);
}

/// Update the dedup cache size
pub fn set_seen_events(chain: &str, count: usize) {
    SEEN_EVENTS.with_label_values(&[chain]).set(count as f64);
}
