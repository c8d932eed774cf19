//! Cosmos tx service response types and bridge message events.
//!
//! The LCD returns events as flat key/value attribute lists; the typed
//! [`CosmosBridgeEvent`] is produced from them by the claim builder,
//! which owns the validation rules.

use alloy::primitives::{Address, U256};
use serde::{de, Deserialize, Deserializer};

use crate::types::ClaimType;

/// Event types emitted by the bridge module for outbound transfers.
pub const BURN_EVENT_TYPE: &str = "burn";
pub const LOCK_EVENT_TYPE: &str = "lock";

/// Attribute keys carried by burn/lock events.
pub const ATTR_COSMOS_SENDER: &str = "cosmos_sender";
pub const ATTR_ETHEREUM_RECEIVER: &str = "ethereum_receiver";
pub const ATTR_TOKEN_CONTRACT: &str = "token_contract";
pub const ATTR_SYMBOL: &str = "symbol";
pub const ATTR_AMOUNT: &str = "amount";
pub const ATTR_NONCE: &str = "nonce";

/// Response types for LCD tx service queries
#[derive(Debug, Deserialize)]
pub struct TxSearchResponse {
    #[serde(default)]
    pub tx_responses: Vec<TxResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TxResponse {
    pub txhash: String,
    #[serde(deserialize_with = "deserialize_string_to_i64")]
    pub height: i64,
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub type_str: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// A burn or lock witnessed on the Cosmos chain, attribute-decoded and
/// validated, pending relay to the Ethereum CosmosBridge contract.
#[derive(Debug, Clone)]
pub struct CosmosBridgeEvent {
    pub kind: ClaimType,
    pub cosmos_sender: String,
    pub ethereum_receiver: Address,
    pub token_contract: Address,
    pub symbol: String,
    pub amount: U256,
    pub nonce: u64,
    pub tx_hash: String,
    pub msg_index: u64,
}

impl CosmosBridgeEvent {
    /// Session dedup key.
    pub fn dedup_key(&self) -> (String, u64) {
        (self.tx_hash.clone(), self.msg_index)
    }
}

/// Find a string attribute by key.
pub fn find_attribute<'a>(attrs: &'a [Attribute], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
}

/// Custom deserializer for Cosmos API responses that return numbers as
/// strings. Handles both string "123" and numeric 123 formats.
fn deserialize_string_to_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrI64Visitor;

    impl de::Visitor<'_> for StringOrI64Visitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<i64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<i64, E>
        where
            E: de::Error,
        {
            i64::try_from(value)
                .map_err(|_| E::custom(format!("u64 {} out of range for i64", value)))
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<i64, E>
        where
            E: de::Error,
        {
            value.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(StringOrI64Visitor)
}
