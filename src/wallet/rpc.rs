use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{
    DecodedOutput, DecodedTransaction, FundedTransaction, FundingPolicy, OutPoint,
    SignedTransaction, Wallet, WalletTransaction,
};
use crate::config::WalletConfig;
use crate::error::{Error, Result};
use crate::model::amount::Amount;
use crate::model::ticket::VotingKey;

/// RPC error code for "no information available about transaction".
const RPC_NO_TX_INFO: i64 = -5;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("wallet unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("wallet answered {status} with an unreadable body: {reason}")]
    Body { status: u16, reason: String },
    #[error("{method}: {} (code {})", .error.message, .error.code)]
    Rpc { method: String, error: JsonRpcError },
    #[error("{0} returned no result")]
    Empty(String),
}

impl RpcError {
    fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { error, .. } => Some(error.code),
            _ => None,
        }
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(_) => Error::Transport(err.to_string()),
            other => Error::Wallet(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetTicketsResult {
    #[serde(default)]
    hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    txid: Option<String>,
    vout: Option<u32>,
    #[serde(default)]
    tree: i8,
}

#[derive(Debug, Deserialize)]
struct DecodeRawTransactionResult {
    txid: String,
    #[serde(default)]
    vin: Vec<RawInput>,
    #[serde(default)]
    vout: Vec<DecodedOutput>,
}

/// A wallet reached over JSON-RPC (HTTP POST, basic auth).
pub struct RpcWallet {
    client: Client,
    url: String,
    user: String,
    password: String,
    next_id: AtomicU64,
}

impl RpcWallet {
    pub fn new(config: &WalletConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs())
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| Error::Wallet(format!("could not build RPC client: {e}")))?;
        Ok(Self {
            client,
            url: config.url().to_string(),
            user: config.user().to_string(),
            password: config.password().to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    fn call<P, T>(&self, method: &str, params: P) -> std::result::Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("->rpc{id} {method}");
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id,
            method,
            params,
        };
        // RPC failures come back as non-2xx with a JSON error body, so the
        // status alone tells us nothing.
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()?;
        let status = response.status().as_u16();
        let body: JsonRpcResponse<T> = response.json().map_err(|e| RpcError::Body {
            status,
            reason: e.to_string(),
        })?;
        debug!("<-rpc{id} {status} {method}");

        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                method: method.to_string(),
                error,
            });
        }
        body.result.ok_or_else(|| RpcError::Empty(method.to_string()))
    }
}

impl Wallet for RpcWallet {
    fn list_tickets(&self, include_immature: bool) -> Result<Vec<String>> {
        let result: GetTicketsResult = self.call("gettickets", [include_immature])?;
        Ok(result.hashes)
    }

    fn get_transaction(&self, hash: &str) -> Result<WalletTransaction> {
        self.call("gettransaction", json!([hash, false]))
            .map_err(|e| match e.code() {
                Some(RPC_NO_TX_INFO) => Error::TicketNotFound(hash.to_string()),
                _ => e.into(),
            })
    }

    fn decode_raw_transaction(&self, hex: &str) -> Result<DecodedTransaction> {
        let result: DecodeRawTransactionResult = self.call("decoderawtransaction", [hex])?;
        let inputs = result
            .vin
            .into_iter()
            .filter_map(|input| {
                Some(OutPoint {
                    txid: input.txid?,
                    vout: input.vout?,
                    tree: input.tree,
                })
            })
            .collect();
        Ok(DecodedTransaction {
            txid: result.txid,
            inputs,
            outputs: result.vout,
        })
    }

    fn sign_message(&self, address: &str, message: &str) -> Result<String> {
        self.call("signmessage", [address, message])
            .map_err(|e| Error::Signing(e.to_string()))
    }

    fn dump_private_key(&self, address: &str) -> Result<VotingKey> {
        let secret: String = self.call("dumpprivkey", [address])?;
        Ok(VotingKey::new(secret))
    }

    fn create_raw_transaction(&self, outputs: &BTreeMap<String, Amount>) -> Result<String> {
        let amounts: BTreeMap<&str, f64> = outputs
            .iter()
            .map(|(address, amount)| (address.as_str(), amount.to_coins()))
            .collect();
        let inputs: [OutPoint; 0] = [];
        Ok(self.call("createrawtransaction", json!([inputs, amounts]))?)
    }

    fn fund_raw_transaction(&self, hex: &str, policy: &FundingPolicy) -> Result<FundedTransaction> {
        let options = json!({ "conf_target": policy.conf_target });
        Ok(self.call("fundrawtransaction", json!([hex, policy.account, options]))?)
    }

    fn lock_unspent(&self, inputs: &[OutPoint]) -> Result<bool> {
        Ok(self.call("lockunspent", json!([false, inputs]))?)
    }

    fn unlock_unspent(&self, inputs: &[OutPoint]) -> Result<bool> {
        Ok(self.call("lockunspent", json!([true, inputs]))?)
    }

    fn sign_raw_transaction(&self, hex: &str) -> Result<SignedTransaction> {
        Ok(self.call("signrawtransaction", [hex])?)
    }

    fn send_raw_transaction(&self, hex: &str) -> Result<String> {
        Ok(self.call("sendrawtransaction", [hex])?)
    }
}
