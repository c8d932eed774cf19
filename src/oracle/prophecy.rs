//! The prophecy record: everything known about one cross-chain event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resolution state of a prophecy. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProphecyStatus {
    Pending,
    Success,
    Failed,
}

impl ProphecyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProphecyStatus::Pending => "pending",
            ProphecyStatus::Success => "success",
            ProphecyStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProphecyStatus::Success | ProphecyStatus::Failed)
    }
}

impl fmt::Display for ProphecyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consensus record for one cross-chain event.
///
/// Claim contents are kept in `BTreeMap`s so every walk over them is in
/// sorted order regardless of insertion history; `arrival` additionally
/// records the order in which distinct contents were first seen, which
/// is the tie-break when two contents reach equal aggregate power.
#[derive(Debug, Clone)]
pub struct Prophecy {
    pub id: String,
    pub status: ProphecyStatus,
    /// Canonical claim content -> validators that submitted exactly it.
    pub claim_validators: BTreeMap<String, Vec<String>>,
    /// Validator -> the canonical content they submitted. At most one
    /// entry per validator.
    pub validator_claims: BTreeMap<String, String>,
    /// Power threshold fixed when the prophecy was created.
    pub minimum_power: u64,
    /// Winning content; set exactly when `status == Success`.
    pub final_claim: Option<String>,
    /// Distinct contents in first-submission order.
    arrival: Vec<String>,
}

impl Prophecy {
    pub fn new(id: String, minimum_power: u64) -> Self {
        Self {
            id,
            status: ProphecyStatus::Pending,
            claim_validators: BTreeMap::new(),
            validator_claims: BTreeMap::new(),
            minimum_power,
            final_claim: None,
            arrival: Vec::new(),
        }
    }

    /// Whether this validator already has a recorded claim, matching
    /// content or not.
    pub fn has_claim_from(&self, validator: &str) -> bool {
        self.validator_claims.contains_key(validator)
    }

    /// Record a claim. The caller must have checked for duplicates and
    /// terminal status.
    pub fn record_claim(&mut self, validator: &str, content: &str) {
        self.validator_claims
            .insert(validator.to_string(), content.to_string());
        let validators = self.claim_validators.entry(content.to_string()).or_default();
        if validators.is_empty() && !self.arrival.contains(&content.to_string()) {
            self.arrival.push(content.to_string());
        }
        validators.push(validator.to_string());
    }

    /// First-seen position of a content; used for the equal-power
    /// tie-break (earliest submission wins).
    pub fn arrival_index(&self, content: &str) -> usize {
        self.arrival
            .iter()
            .position(|c| c == content)
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(ProphecyStatus::Pending.as_str(), "pending");
        assert_eq!(ProphecyStatus::Success.as_str(), "success");
        assert_eq!(ProphecyStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_terminal() {
        assert!(!ProphecyStatus::Pending.is_terminal());
        assert!(ProphecyStatus::Success.is_terminal());
        assert!(ProphecyStatus::Failed.is_terminal());
    }

    #[test]
    fn test_record_claim_groups_by_content() {
        let mut p = Prophecy::new("1-1-0xab".to_string(), 10);
        p.record_claim("val-a", "content-x");
        p.record_claim("val-b", "content-y");
        p.record_claim("val-c", "content-x");

        assert_eq!(p.claim_validators["content-x"], vec!["val-a", "val-c"]);
        assert_eq!(p.claim_validators["content-y"], vec!["val-b"]);
        assert_eq!(p.validator_claims["val-a"], "content-x");
        assert!(p.has_claim_from("val-b"));
        assert!(!p.has_claim_from("val-d"));
    }

    #[test]
    fn test_arrival_order_tracks_first_submission() {
        let mut p = Prophecy::new("1-1-0xab".to_string(), 10);
        // "z" sorts after "a" but arrives first.
        p.record_claim("val-a", "z-content");
        p.record_claim("val-b", "a-content");
        p.record_claim("val-c", "z-content");

        assert_eq!(p.arrival_index("z-content"), 0);
        assert_eq!(p.arrival_index("a-content"), 1);
        assert_eq!(p.arrival_index("never-seen"), usize::MAX);
    }
}
