//! The wallet boundary. Everything that touches keys or coins goes through
//! [`Wallet`]; [`rpc::RpcWallet`] is the real implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::amount::Amount;
use crate::model::ticket::VotingKey;

pub mod rpc;

pub use rpc::RpcWallet;

/// A wallet transaction lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletTransaction {
    pub hex: String,
    #[serde(default)]
    pub confirmations: i64,
}

/// A previous output being spent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub tree: i8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptPubKey {
    #[serde(rename = "type", default)]
    pub script_type: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecodedOutput {
    #[serde(default)]
    pub value: f64,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// The parts of `decoderawtransaction` output we use.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransaction {
    pub txid: String,
    /// Spent outpoints. Coinbase/stakebase inputs are omitted.
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<DecodedOutput>,
}

/// Which account to fund from, and how confirmed its coins must be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPolicy {
    pub account: String,
    pub conf_target: i32,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
            conf_target: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FundedTransaction {
    pub hex: String,
    #[serde(default)]
    pub fee: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    pub complete: bool,
}

/// Operations the client needs from the local wallet.
pub trait Wallet {
    fn list_tickets(&self, include_immature: bool) -> Result<Vec<String>>;

    /// Fails with `TicketNotFound` if the wallet has never seen `hash`.
    fn get_transaction(&self, hash: &str) -> Result<WalletTransaction>;

    fn decode_raw_transaction(&self, hex: &str) -> Result<DecodedTransaction>;

    fn sign_message(&self, address: &str, message: &str) -> Result<String>;

    fn dump_private_key(&self, address: &str) -> Result<VotingKey>;

    fn create_raw_transaction(&self, outputs: &BTreeMap<String, Amount>) -> Result<String>;

    fn fund_raw_transaction(&self, hex: &str, policy: &FundingPolicy) -> Result<FundedTransaction>;

    /// Returns whether the wallet granted the lock.
    fn lock_unspent(&self, inputs: &[OutPoint]) -> Result<bool>;

    fn unlock_unspent(&self, inputs: &[OutPoint]) -> Result<bool>;

    fn sign_raw_transaction(&self, hex: &str) -> Result<SignedTransaction>;

    /// Returns the transaction hash.
    fn send_raw_transaction(&self, hex: &str) -> Result<String>;
}
