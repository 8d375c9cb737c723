//! Request and response bodies exchanged with the provider, and their
//! canonical byte encoding.
//!
//! Types here use snake_case field names. On the way out, top-level keys are
//! respelled per [`FieldNaming`]; on the way in, keys are matched back to
//! their snake_case names regardless of how the provider spelled them.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::protocol::{normalize_key, FieldNaming};
use crate::model::ticket::VotingKey;
use crate::model::votes::VoteChoices;

/// Every top-level field name used by any envelope.
const FIELD_NAMES: &[&str] = &[
    "api_versions",
    "expiration",
    "fee",
    "fee_address",
    "fee_amount",
    "fee_percentage",
    "fee_tx",
    "fee_tx_hash",
    "fee_tx_status",
    "network",
    "pub_key",
    "request",
    "ticket_confirmed",
    "ticket_hash",
    "ticket_hex",
    "timestamp",
    "vote_choices",
    "voting_key",
    "vsp_closed",
];

/// Serialise an envelope to the exact bytes that are signed and sent.
/// Keys come out sorted, so equal envelopes always encode identically.
pub fn encode<T: Serialize>(envelope: &T, naming: FieldNaming) -> Result<Vec<u8>> {
    let value = serde_json::to_value(envelope).map_err(|e| Error::Encoding(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(Error::Encoding("envelope is not a JSON object".into()));
    };
    let renamed: BTreeMap<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (naming.apply(&key), value))
        .collect();
    serde_json::to_vec(&renamed).map_err(|e| Error::Encoding(e.to_string()))
}

/// Parse an envelope written in any field naming.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(Error::MalformedResponse("expected a JSON object".into()));
    };
    let fields: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (canonical_name(&key), value))
        .collect();
    serde_json::from_value(Value::Object(fields)).map_err(|e| Error::MalformedResponse(e.to_string()))
}

fn canonical_name(key: &str) -> String {
    let normalized = normalize_key(key);
    FIELD_NAMES
        .iter()
        .find(|name| normalize_key(name) == normalized)
        .map(|name| name.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Go-style `[]byte` fields travel as base64 strings.
mod base64_bytes {
    use data_encoding::BASE64;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64
            .decode(text.as_bytes())
            .map_err(|e| D::Error::custom(format!("invalid base64: {e}")))
    }
}

/// Body of the identity endpoint. It carries its own verification key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityResponse {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(with = "base64_bytes")]
    pub pub_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub vsp_closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_percentage: Option<f64>,
}

/// Body of the fee endpoint: a flat fee, or a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAddressRequest {
    pub timestamp: i64,
    pub ticket_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAddressResponse {
    pub fee_address: String,
    /// Units depend on the protocol; see [`crate::model::protocol::FeeUnits`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayFeeRequest {
    pub timestamp: i64,
    pub ticket_hash: String,
    pub fee_tx: String,
    pub voting_key: VotingKey,
    pub vote_choices: VoteChoices,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatusRequest {
    pub timestamp: i64,
    pub ticket_hash: String,
}

/// What the provider knows about a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatus {
    #[serde(default)]
    pub ticket_confirmed: bool,
    #[serde(default)]
    pub fee_tx_status: String,
    #[serde(default)]
    pub fee_tx_hash: String,
    #[serde(default)]
    pub vote_choices: VoteChoices,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVoteChoicesRequest {
    pub timestamp: i64,
    pub ticket_hash: String,
    pub vote_choices: VoteChoices,
}
