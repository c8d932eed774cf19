//! The prophecy consensus engine.
//!
//! Executes inside the destination chain's transaction pipeline:
//! single-threaded, deterministic, one `process_claim` call per accepted
//! claim message. Validator powers are read through the [`ValidatorSet`]
//! seam at call time; settlement side effects go through a handler table
//! that is validated at construction, one handler per claim kind.

use eyre::Result;
use std::collections::{BTreeMap, HashMap};

use crate::error::OracleError;
use crate::oracle::prophecy::{Prophecy, ProphecyStatus};
use crate::types::{prophecy_id, BridgeClaim, ClaimContent, ClaimType};

/// Read-only view of the active validator set and its bonded power.
pub trait ValidatorSet {
    /// Whether the address is in the current active/bonded set.
    fn is_active(&self, validator: &str) -> bool;

    /// Bonded power of a validator; 0 for unknown addresses.
    fn power(&self, validator: &str) -> u64;

    /// Sum of bonded power over the active set.
    fn total_power(&self) -> u64;
}

/// Fixed validator set backed by a map. Used by hosts without a live
/// staking view and throughout the test suite.
#[derive(Debug, Clone, Default)]
pub struct StaticValidatorSet {
    powers: BTreeMap<String, u64>,
}

impl StaticValidatorSet {
    pub fn new<I, S>(powers: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            powers: powers.into_iter().map(|(v, p)| (v.into(), p)).collect(),
        }
    }
}

impl ValidatorSet for StaticValidatorSet {
    fn is_active(&self, validator: &str) -> bool {
        self.powers.contains_key(validator)
    }

    fn power(&self, validator: &str) -> u64 {
        self.powers.get(validator).copied().unwrap_or(0)
    }

    fn total_power(&self) -> u64 {
        self.powers.values().sum()
    }
}

/// Chain-specific effect of a successful prophecy (mint, burn, unlock).
///
/// Handlers receive the prophecy id so they can key their own
/// idempotency record; the engine itself guarantees at most one
/// invocation per prophecy via the terminal-status guard.
pub trait SettlementAction: Send + Sync {
    fn settle(&self, prophecy_id: &str, content: &ClaimContent) -> Result<()>;
}

/// Handler table mapping each claim kind to its settlement action.
#[derive(Default)]
pub struct SettlementRegistry {
    handlers: BTreeMap<ClaimType, Box<dyn SettlementAction>>,
}

impl SettlementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: ClaimType, handler: Box<dyn SettlementAction>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    fn handler(&self, kind: ClaimType) -> Result<&dyn SettlementAction, OracleError> {
        self.handlers
            .get(&kind)
            .map(|h| h.as_ref())
            .ok_or(OracleError::MissingSettlementHandler(kind))
    }

    fn validate(&self) -> Result<(), OracleError> {
        for kind in ClaimType::ALL {
            if !self.handlers.contains_key(&kind) {
                return Err(OracleError::MissingSettlementHandler(kind));
            }
        }
        Ok(())
    }
}

/// Query parameters mirroring the chain's `prophecies` endpoint.
#[derive(Debug, Clone)]
pub struct ProphecyQueryParams {
    pub ethereum_chain_id: u64,
    pub bridge_contract_address: String,
    pub nonce: u64,
    pub symbol: String,
    pub token_contract_address: String,
    pub sender: String,
}

/// Query response: the prophecy id, its status, and all recorded claims.
#[derive(Debug, Clone)]
pub struct ProphecyResponse {
    pub id: String,
    pub status: ProphecyStatus,
    pub claims: Vec<ClaimRecord>,
}

#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub validator_address: String,
    pub content: String,
}

/// The consensus engine: a prophecy store plus the resolution rules.
pub struct Oracle<V: ValidatorSet> {
    validators: V,
    consensus_needed: f64,
    settlements: SettlementRegistry,
    prophecies: HashMap<String, Prophecy>,
}

impl<V: ValidatorSet> Oracle<V> {
    /// `consensus_needed` is the fraction of total bonded power required
    /// to finalize a prophecy; it must lie in (0, 1]. A value outside
    /// that range, or a registry missing a handler for any claim kind,
    /// is a configuration error and refuses construction.
    pub fn new(
        validators: V,
        consensus_needed: f64,
        settlements: SettlementRegistry,
    ) -> Result<Self, OracleError> {
        if !(consensus_needed > 0.0 && consensus_needed <= 1.0) {
            return Err(OracleError::InvalidConsensusNeeded(consensus_needed));
        }
        settlements.validate()?;
        Ok(Self {
            validators,
            consensus_needed,
            settlements,
            prophecies: HashMap::new(),
        })
    }

    /// Look up a prophecy by id.
    pub fn prophecy(&self, id: &str) -> Result<&Prophecy, OracleError> {
        self.prophecies
            .get(id)
            .ok_or_else(|| OracleError::ProphecyNotFound(id.to_string()))
    }

    /// Resolve the `prophecies` query: derive the deterministic id from
    /// the event coordinates and return the recorded claims.
    pub fn query_prophecy(
        &self,
        params: &ProphecyQueryParams,
    ) -> Result<ProphecyResponse, OracleError> {
        let id = prophecy_id(params.ethereum_chain_id, params.nonce, &params.sender);
        let prophecy = self.prophecy(&id)?;
        let claims = prophecy
            .validator_claims
            .iter()
            .map(|(validator, content)| ClaimRecord {
                validator_address: validator.clone(),
                content: content.clone(),
            })
            .collect();
        Ok(ProphecyResponse {
            id,
            status: prophecy.status,
            claims,
        })
    }

    /// Record one validator claim and evaluate consensus.
    ///
    /// Rules, in order: empty ids and non-active validators are
    /// rejected; terminal prophecies accept nothing further, winning
    /// duplicates included; a second claim from the same validator is a
    /// duplicate whether or not the content matches. An accepted claim
    /// is recorded and the prophecy re-evaluated:
    ///
    /// - the content with the highest aggregate power wins if it meets
    ///   the threshold fixed at prophecy creation;
    /// - if no content could reach the threshold even with all
    ///   still-unclaimed power, the prophecy fails;
    /// - otherwise it stays pending.
    ///
    /// Equal-power ties go to the earliest-submitted content.
    pub fn process_claim(&mut self, claim: &BridgeClaim) -> Result<ProphecyStatus, OracleError> {
        if claim.prophecy_id.is_empty() {
            return Err(OracleError::EmptyProphecyId);
        }

        let validators = &self.validators;
        if !validators.is_active(&claim.validator_address) {
            return Err(OracleError::ClaimByNonValidator(
                claim.validator_address.clone(),
            ));
        }

        let canonical = claim.content.canonical();
        let total_power = validators.total_power();
        let minimum_power = required_power(total_power, self.consensus_needed);

        let prophecy = self
            .prophecies
            .entry(claim.prophecy_id.clone())
            .or_insert_with(|| {
                tracing::debug!(
                    prophecy_id = %claim.prophecy_id,
                    minimum_power,
                    total_power,
                    "Created prophecy"
                );
                Prophecy::new(claim.prophecy_id.clone(), minimum_power)
            });

        if prophecy.status.is_terminal() {
            return Err(OracleError::ProphecyFinalized(claim.prophecy_id.clone()));
        }
        if prophecy.has_claim_from(&claim.validator_address) {
            return Err(OracleError::DuplicateClaim {
                prophecy_id: claim.prophecy_id.clone(),
                validator: claim.validator_address.clone(),
            });
        }

        prophecy.record_claim(&claim.validator_address, &canonical);
        tracing::debug!(
            prophecy_id = %claim.prophecy_id,
            validator = %claim.validator_address,
            "Recorded claim"
        );

        // Tally aggregate power per distinct content. Contents are
        // walked in sorted order; ties on power fall back to arrival
        // order, so the selection is deterministic for any store.
        let mut winner: Option<(String, u64, usize)> = None;
        let mut total_claims_power = 0u64;
        for (content, submitters) in &prophecy.claim_validators {
            let power: u64 = submitters.iter().map(|v| validators.power(v)).sum();
            total_claims_power += power;
            let arrival = prophecy.arrival_index(content);
            let better = match &winner {
                None => true,
                Some((_, best_power, best_arrival)) => {
                    power > *best_power || (power == *best_power && arrival < *best_arrival)
                }
            };
            if better {
                winner = Some((content.clone(), power, arrival));
            }
        }
        let (winning_content, highest_power) = match winner {
            Some((content, power, _)) => (content, power),
            None => (String::new(), 0),
        };

        if highest_power >= prophecy.minimum_power {
            prophecy.status = ProphecyStatus::Success;
            prophecy.final_claim = Some(winning_content.clone());
            tracing::info!(
                prophecy_id = %claim.prophecy_id,
                highest_power,
                minimum_power = prophecy.minimum_power,
                "Prophecy resolved successfully"
            );

            // The consensus transition stays committed even if the
            // settlement action fails; the host chain decides whether
            // to abort the surrounding transaction.
            let content = ClaimContent::from_canonical(&winning_content)?;
            let handler = self.settlements.handler(content.kind)?;
            handler
                .settle(&claim.prophecy_id, &content)
                .map_err(|e| OracleError::Settlement {
                    prophecy_id: claim.prophecy_id.clone(),
                    reason: e.to_string(),
                })?;
            return Ok(ProphecyStatus::Success);
        }

        // Remaining unclaimed power could at best join the current
        // leader; if even that cannot reach the threshold, no content
        // ever will.
        let unclaimed_power = total_power.saturating_sub(total_claims_power);
        if unclaimed_power + highest_power < prophecy.minimum_power {
            prophecy.status = ProphecyStatus::Failed;
            tracing::info!(
                prophecy_id = %claim.prophecy_id,
                highest_power,
                unclaimed_power,
                minimum_power = prophecy.minimum_power,
                "Prophecy failed, threshold unreachable"
            );
            return Ok(ProphecyStatus::Failed);
        }

        Ok(ProphecyStatus::Pending)
    }
}

/// Threshold power: `ceil(total_power * consensus_needed)`.
fn required_power(total_power: u64, consensus_needed: f64) -> u64 {
    (total_power as f64 * consensus_needed).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use std::sync::{Arc, Mutex};

    /// Settlement handler that records its invocations.
    #[derive(Default)]
    struct RecordingSettlement {
        calls: Arc<Mutex<Vec<(String, ClaimContent)>>>,
    }

    impl SettlementAction for RecordingSettlement {
        fn settle(&self, prophecy_id: &str, content: &ClaimContent) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((prophecy_id.to_string(), content.clone()));
            Ok(())
        }
    }

    struct FailingSettlement;

    impl SettlementAction for FailingSettlement {
        fn settle(&self, _prophecy_id: &str, _content: &ClaimContent) -> Result<()> {
            Err(eyre::eyre!("mint refused"))
        }
    }

    fn registry_with(calls: Arc<Mutex<Vec<(String, ClaimContent)>>>) -> SettlementRegistry {
        SettlementRegistry::new()
            .register(
                ClaimType::Burn,
                Box::new(RecordingSettlement {
                    calls: calls.clone(),
                }),
            )
            .register(ClaimType::Lock, Box::new(RecordingSettlement { calls }))
    }

    fn claim(id: &str, validator: &str, receiver: &str, amount: u64) -> BridgeClaim {
        BridgeClaim {
            prophecy_id: id.to_string(),
            validator_address: validator.to_string(),
            content: ClaimContent {
                kind: ClaimType::Lock,
                receiver: receiver.to_string(),
                denom: "peggyeth".to_string(),
                amount: U256::from(amount),
            },
        }
    }

    #[test]
    fn test_consensus_needed_must_be_a_valid_fraction() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let calls = Arc::default();
            let result = Oracle::new(
                StaticValidatorSet::new([("val-1", 10u64)]),
                bad,
                registry_with(calls),
            );
            assert!(matches!(
                result.err(),
                Some(OracleError::InvalidConsensusNeeded(_))
            ));
        }
        let calls = Arc::default();
        assert!(Oracle::new(
            StaticValidatorSet::new([("val-1", 10u64)]),
            1.0,
            registry_with(calls)
        )
        .is_ok());
    }

    #[test]
    fn test_registry_must_cover_every_claim_kind() {
        let registry = SettlementRegistry::new().register(
            ClaimType::Burn,
            Box::new(RecordingSettlement::default()),
        );
        let result = Oracle::new(StaticValidatorSet::new([("val-1", 10u64)]), 0.7, registry);
        assert!(matches!(
            result.err(),
            Some(OracleError::MissingSettlementHandler(ClaimType::Lock))
        ));
    }

    #[test]
    fn test_threshold_correctness() {
        // Powers [3, 7], consensus 0.7 => threshold ceil(10 * 0.7) = 7.
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-small", 3u64), ("val-large", 7u64)]),
            0.7,
            registry_with(calls.clone()),
        )
        .unwrap();

        // Power-3 validator alone leaves the prophecy pending.
        let status = oracle
            .process_claim(&claim("5-1-0xaa", "val-small", "cosmos1recv", 100))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Pending);
        assert!(calls.lock().unwrap().is_empty());

        // A single claim from the power-7 validator resolves a fresh
        // prophecy immediately.
        let status = oracle
            .process_claim(&claim("5-2-0xaa", "val-large", "cosmos1recv", 100))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Success);
        let prophecy = oracle.prophecy("5-2-0xaa").unwrap();
        assert_eq!(prophecy.minimum_power, 7);
        assert_eq!(
            prophecy.final_claim.as_deref(),
            Some(claim("5-2-0xaa", "val-large", "cosmos1recv", 100).content.canonical().as_str())
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_correctness() {
        // Powers [3, 3, 4], consensus 0.6 => threshold ceil(10 * 0.6) = 6.
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 3u64), ("val-2", 3u64), ("val-3", 4u64)]),
            0.6,
            registry_with(calls.clone()),
        )
        .unwrap();

        let id = "5-9-0xbb";
        // Three distinct contents: A, B, C.
        let status = oracle
            .process_claim(&claim(id, "val-1", "cosmos1aaa", 1))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Pending);

        let status = oracle
            .process_claim(&claim(id, "val-2", "cosmos1bbb", 2))
            .unwrap();
        // 3 vs 3, remaining 4 could still tip either content to 7.
        assert_eq!(status, ProphecyStatus::Pending);

        let status = oracle
            .process_claim(&claim(id, "val-3", "cosmos1ccc", 3))
            .unwrap();
        // No unclaimed power left; best content holds 4 < 6.
        assert_eq!(status, ProphecyStatus::Failed);

        let prophecy = oracle.prophecy(id).unwrap();
        assert_eq!(prophecy.status, ProphecyStatus::Failed);
        assert!(prophecy.final_claim.is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_claim_is_rejected_and_state_unchanged() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 3u64), ("val-2", 7u64)]),
            0.9,
            registry_with(calls),
        )
        .unwrap();

        let c = claim("5-1-0xaa", "val-1", "cosmos1recv", 100);
        oracle.process_claim(&c).unwrap();
        let before = oracle.prophecy("5-1-0xaa").unwrap().clone();

        // Same claim again: duplicate, matching content or not.
        let err = oracle.process_claim(&c).unwrap_err();
        assert!(matches!(err, OracleError::DuplicateClaim { .. }));
        let mut divergent = c.clone();
        divergent.content.amount = U256::from(999u64);
        let err = oracle.process_claim(&divergent).unwrap_err();
        assert!(matches!(err, OracleError::DuplicateClaim { .. }));

        let after = oracle.prophecy("5-1-0xaa").unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.validator_claims, before.validator_claims);
        assert_eq!(after.claim_validators, before.claim_validators);
    }

    #[test]
    fn test_terminal_prophecy_is_immutable() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 7u64), ("val-2", 3u64)]),
            0.7,
            registry_with(calls),
        )
        .unwrap();

        let id = "5-3-0xcc";
        let winning = claim(id, "val-1", "cosmos1recv", 100);
        assert_eq!(
            oracle.process_claim(&winning).unwrap(),
            ProphecyStatus::Success
        );
        let before = oracle.prophecy(id).unwrap().clone();

        // Even a duplicate of the winning claim from another validator
        // is refused once the prophecy is terminal.
        let err = oracle
            .process_claim(&claim(id, "val-2", "cosmos1recv", 100))
            .unwrap_err();
        assert!(matches!(err, OracleError::ProphecyFinalized(_)));

        let after = oracle.prophecy(id).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.final_claim, before.final_claim);
        assert_eq!(after.validator_claims, before.validator_claims);
    }

    #[test]
    fn test_non_validator_rejected_without_creating_prophecy() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 10u64)]),
            0.7,
            registry_with(calls),
        )
        .unwrap();

        let err = oracle
            .process_claim(&claim("5-4-0xdd", "val-outsider", "cosmos1recv", 1))
            .unwrap_err();
        assert!(matches!(err, OracleError::ClaimByNonValidator(_)));
        assert!(matches!(
            oracle.prophecy("5-4-0xdd").unwrap_err(),
            OracleError::ProphecyNotFound(_)
        ));
    }

    #[test]
    fn test_empty_prophecy_id_rejected() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 10u64)]),
            0.7,
            registry_with(calls),
        )
        .unwrap();
        let err = oracle
            .process_claim(&claim("", "val-1", "cosmos1recv", 1))
            .unwrap_err();
        assert!(matches!(err, OracleError::EmptyProphecyId));
    }

    /// Validator set whose powers can change between claims, as bonded
    /// stake does on a live chain.
    #[derive(Clone, Default)]
    struct SharedValidatorSet(Arc<Mutex<std::collections::BTreeMap<String, u64>>>);

    impl SharedValidatorSet {
        fn set_power(&self, validator: &str, power: u64) {
            self.0.lock().unwrap().insert(validator.to_string(), power);
        }
    }

    impl ValidatorSet for SharedValidatorSet {
        fn is_active(&self, validator: &str) -> bool {
            self.0.lock().unwrap().contains_key(validator)
        }

        fn power(&self, validator: &str) -> u64 {
            self.0.lock().unwrap().get(validator).copied().unwrap_or(0)
        }

        fn total_power(&self) -> u64 {
            self.0.lock().unwrap().values().sum()
        }
    }

    #[test]
    fn test_equal_power_tie_goes_to_earliest_submission() {
        // Powers are read live; a bonding change between claims can
        // bring two contents to the threshold in the same evaluation.
        // The earliest-submitted content must win the tie.
        let validators = SharedValidatorSet::default();
        validators.set_power("val-1", 3);
        validators.set_power("val-2", 3);
        validators.set_power("val-3", 2);

        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        // Threshold fixed at creation: ceil(8 * 0.5) = 4.
        let mut oracle =
            Oracle::new(validators.clone(), 0.5, registry_with(calls)).unwrap();

        let id = "5-5-0xee";
        // "cosmos1zzz" sorts after "cosmos1aaa" but is submitted first.
        let status = oracle
            .process_claim(&claim(id, "val-1", "cosmos1zzz", 1))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Pending);
        let status = oracle
            .process_claim(&claim(id, "val-2", "cosmos1aaa", 1))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Pending);

        // Both backers bond up to 4 before the next claim arrives.
        validators.set_power("val-1", 4);
        validators.set_power("val-2", 4);

        let status = oracle
            .process_claim(&claim(id, "val-3", "cosmos1bbb", 1))
            .unwrap();
        assert_eq!(status, ProphecyStatus::Success);
        let prophecy = oracle.prophecy(id).unwrap();
        let final_claim = prophecy.final_claim.as_deref().unwrap();
        assert!(
            final_claim.contains("cosmos1zzz"),
            "earliest submission must win: {final_claim}"
        );
    }

    #[test]
    fn test_settlement_receives_prophecy_id_once() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 10u64)]),
            0.5,
            registry_with(calls.clone()),
        )
        .unwrap();

        oracle
            .process_claim(&claim("5-6-0xff", "val-1", "cosmos1recv", 7))
            .unwrap();
        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "5-6-0xff");
        assert_eq!(recorded[0].1.amount, U256::from(7u64));
    }

    #[test]
    fn test_settlement_failure_propagates_but_state_stays_resolved() {
        let registry = SettlementRegistry::new()
            .register(ClaimType::Burn, Box::new(FailingSettlement))
            .register(ClaimType::Lock, Box::new(FailingSettlement));
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 10u64)]),
            0.5,
            registry,
        )
        .unwrap();

        let err = oracle
            .process_claim(&claim("5-7-0x11", "val-1", "cosmos1recv", 1))
            .unwrap_err();
        assert!(matches!(err, OracleError::Settlement { .. }));

        // Consensus state is not rolled back; atomicity is the host
        // chain's concern.
        let prophecy = oracle.prophecy("5-7-0x11").unwrap();
        assert_eq!(prophecy.status, ProphecyStatus::Success);
        assert!(prophecy.final_claim.is_some());
    }

    #[test]
    fn test_query_prophecy_by_event_coordinates() {
        let calls: Arc<Mutex<Vec<_>>> = Arc::default();
        let mut oracle = Oracle::new(
            StaticValidatorSet::new([("val-1", 3u64), ("val-2", 7u64)]),
            0.9,
            registry_with(calls),
        )
        .unwrap();

        let id = prophecy_id(5, 42, "0xAbC0000000000000000000000000000000000001");
        oracle
            .process_claim(&claim(&id, "val-1", "cosmos1recv", 5))
            .unwrap();

        let response = oracle
            .query_prophecy(&ProphecyQueryParams {
                ethereum_chain_id: 5,
                bridge_contract_address: "0x0000000000000000000000000000000000000001".to_string(),
                nonce: 42,
                symbol: "peggyeth".to_string(),
                token_contract_address: "0x0000000000000000000000000000000000000002".to_string(),
                sender: "0xabc0000000000000000000000000000000000001".to_string(),
            })
            .unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.status, ProphecyStatus::Pending);
        assert_eq!(response.claims.len(), 1);
        assert_eq!(response.claims[0].validator_address, "val-1");
    }

    #[test]
    fn test_required_power_rounds_up() {
        assert_eq!(required_power(10, 0.7), 7);
        assert_eq!(required_power(10, 0.6), 6);
        assert_eq!(required_power(3, 0.5), 2);
        assert_eq!(required_power(0, 0.7), 0);
        assert_eq!(required_power(10, 1.0), 10);
    }
}
