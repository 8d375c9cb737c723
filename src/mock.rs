//! In-process stand-ins for the provider, the wallet and the clock.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

use data_encoding::BASE64;
use ed25519_dalek::{Signer, SigningKey};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::Network;
use crate::error::{Error, Result};
use crate::model::amount::Amount;
use crate::model::envelope::{
    self, FeeAddressRequest, FeeAddressResponse, FeeResponse, IdentityResponse, PayFeeRequest,
    SetVoteChoicesRequest, TicketStatus, TicketStatusRequest,
};
use crate::model::protocol::{HttpMethod, Protocol};
use crate::model::provider::ProviderKey;
use crate::model::ticket::VotingKey;
use crate::model::timestamp::Clock;
use crate::model::votes::{VoteChoices, VotePlan};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::wallet::{
    DecodedOutput, DecodedTransaction, FundedTransaction, FundingPolicy, OutPoint, ScriptPubKey,
    SignedTransaction, Wallet, WalletTransaction,
};
use crate::workflow::{Session, Settings};

pub const BASE_URL: &str = "https://vsp.test";
pub const TICKET_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const TICKET_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const FEE_TX_HASH: &str = "fefefefefefefefefefefefefefefefefefefefefefefefefefefefefefefefe";
pub const FEE_PERCENTAGE: f64 = 0.5;
pub const START_TIME: i64 = 1_600_000_000;

const FUNDING_TXID: &str = "f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0";
const TICKET_HEX_PREFIX: &str = "0100000002";
const FUNDED_SUFFIX: &str = ":funded";
const SIGNED_SUFFIX: &str = ":signed";

pub type MockSession = Session<MockWallet, MockVsp, FakeClock>;

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

pub fn commitment_address(ticket_hash: &str) -> String {
    format!("TcCommit{}", short(ticket_hash))
}

pub fn submission_address(ticket_hash: &str) -> String {
    format!("TsSubmit{}", short(ticket_hash))
}

pub fn fee_address(ticket_hash: &str) -> String {
    format!("TsFee{}", short(ticket_hash))
}

pub fn ticket_hex(ticket_hash: &str) -> String {
    format!("{TICKET_HEX_PREFIX}{ticket_hash}")
}

pub fn voting_key(ticket_hash: &str) -> VotingKey {
    VotingKey::new(format!("PmVote{}", short(ticket_hash)))
}

/// Flat fee advertised by the legacy fee endpoint.
pub fn legacy_fee() -> Amount {
    Amount::from_atoms(2_000_000)
}

/// Fee quoted by the fee-address endpoint.
pub fn quoted_fee() -> Amount {
    Amount::from_atoms(3_000_000)
}

/// The outputs every funded fee transaction spends.
pub fn funding_inputs() -> Vec<OutPoint> {
    (0..2)
        .map(|vout| OutPoint {
            txid: FUNDING_TXID.to_string(),
            vout,
            tree: 0,
        })
        .collect()
}

pub fn settings(protocol: Protocol) -> Settings {
    Settings {
        base_url: BASE_URL.to_string(),
        protocol,
        network: Network::Testnet,
        funding: FundingPolicy::default(),
        votes: VotePlan::example(),
        pacing: Duration::from_secs(2),
    }
}

pub fn session(protocol: Protocol) -> MockSession {
    session_with(settings(protocol))
}

pub fn session_with(settings: Settings) -> MockSession {
    let vsp = MockVsp::new(settings.protocol.clone());
    Session::connect(settings, MockWallet::example(), vsp, FakeClock::at(START_TIME))
        .expect("mock discovery")
}

pub fn session_for(vsp: MockVsp) -> MockSession {
    let settings = settings(vsp.protocol().clone());
    Session::connect(settings, MockWallet::example(), vsp, FakeClock::at(START_TIME))
        .expect("mock discovery")
}

/// A clock that only moves when told to, or when slept on.
#[derive(Debug)]
pub struct FakeClock {
    now: Cell<i64>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn at(now: i64) -> Self {
        Self {
            now: Cell::new(now),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration.as_secs() as i64);
    }
}

/// A wallet holding a fixed set of tickets. Raw transactions are readable
/// strings rather than real serialisations.
#[derive(Debug, Default)]
pub struct MockWallet {
    tickets: RefCell<BTreeMap<String, i64>>,
    calls: RefCell<Vec<&'static str>>,
    deny_locks: Cell<bool>,
    sign_incompletely: Cell<bool>,
    dropped: RefCell<Vec<&'static str>>,
    locked: RefCell<Vec<OutPoint>>,
    sent: RefCell<Vec<String>>,
}

impl MockWallet {
    /// One well-confirmed ticket, [`TICKET_A`].
    pub fn example() -> Self {
        let wallet = Self::default();
        wallet.add_ticket(TICKET_A, 6);
        wallet
    }

    pub fn add_ticket(&self, hash: &str, confirmations: i64) {
        self.tickets
            .borrow_mut()
            .insert(hash.to_string(), confirmations);
    }

    pub fn set_confirmations(&self, hash: &str, confirmations: i64) {
        self.add_ticket(hash, confirmations);
    }

    pub fn deny_locks(&self) {
        self.deny_locks.set(true);
    }

    pub fn sign_incompletely(&self) {
        self.sign_incompletely.set(true);
    }

    /// Lose the connection on the next call to the RPC `method`.
    pub fn drop_next(&self, method: &'static str) {
        self.dropped.borrow_mut().push(method);
    }

    /// Outpoints currently locked.
    pub fn locked(&self) -> Vec<OutPoint> {
        self.locked.borrow().clone()
    }

    /// Raw transactions broadcast so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    /// How many times the RPC `method` was invoked.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|m| **m == method).count()
    }

    /// The signature this wallet produces for `message` under `address`.
    pub fn signature_for(address: &str, message: &str) -> String {
        format!("{address}/{}", BASE64.encode(message.as_bytes()))
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(method);
        let mut dropped = self.dropped.borrow_mut();
        match dropped.iter().position(|m| *m == method) {
            Some(index) => {
                dropped.remove(index);
                Err(Error::Transport(format!("{method}: connection refused")))
            }
            None => Ok(()),
        }
    }

    fn owned_ticket(&self, matches: impl Fn(&str) -> bool) -> Option<String> {
        self.tickets.borrow().keys().find(|h| matches(h.as_str())).cloned()
    }
}

impl Wallet for MockWallet {
    fn list_tickets(&self, _include_immature: bool) -> Result<Vec<String>> {
        self.record("gettickets")?;
        Ok(self.tickets.borrow().keys().cloned().collect())
    }

    fn get_transaction(&self, hash: &str) -> Result<WalletTransaction> {
        self.record("gettransaction")?;
        let confirmations = self
            .tickets
            .borrow()
            .get(hash)
            .copied()
            .ok_or_else(|| Error::TicketNotFound(hash.to_string()))?;
        Ok(WalletTransaction {
            hex: ticket_hex(hash),
            confirmations,
        })
    }

    fn decode_raw_transaction(&self, hex: &str) -> Result<DecodedTransaction> {
        self.record("decoderawtransaction")?;
        let output = |script_type: &str, address: String| DecodedOutput {
            value: 0.0,
            script_pub_key: ScriptPubKey {
                script_type: script_type.to_string(),
                addresses: vec![address],
            },
        };
        if let Some(hash) = hex.strip_prefix(TICKET_HEX_PREFIX) {
            return Ok(DecodedTransaction {
                txid: hash.to_string(),
                inputs: vec![],
                outputs: vec![
                    output("stakesubmission", submission_address(hash)),
                    output("sstxcommitment", commitment_address(hash)),
                ],
            });
        }
        if hex.ends_with(FUNDED_SUFFIX) {
            return Ok(DecodedTransaction {
                txid: FEE_TX_HASH.to_string(),
                inputs: funding_inputs(),
                outputs: vec![],
            });
        }
        Err(Error::Wallet(format!("cannot decode {hex}")))
    }

    fn sign_message(&self, address: &str, message: &str) -> Result<String> {
        self.record("signmessage")?;
        self.owned_ticket(|h| commitment_address(h) == address)
            .map(|_| Self::signature_for(address, message))
            .ok_or_else(|| Error::Signing(format!("no key for {address}")))
    }

    fn dump_private_key(&self, address: &str) -> Result<VotingKey> {
        self.record("dumpprivkey")?;
        self.owned_ticket(|h| submission_address(h) == address)
            .map(|h| voting_key(&h))
            .ok_or_else(|| Error::Wallet(format!("no key for {address}")))
    }

    fn create_raw_transaction(&self, outputs: &BTreeMap<String, Amount>) -> Result<String> {
        self.record("createrawtransaction")?;
        let outputs: Vec<String> = outputs
            .iter()
            .map(|(address, amount)| format!("{address}={}", amount.atoms()))
            .collect();
        Ok(format!("pay:{}", outputs.join(",")))
    }

    fn fund_raw_transaction(&self, hex: &str, _policy: &FundingPolicy) -> Result<FundedTransaction> {
        self.record("fundrawtransaction")?;
        Ok(FundedTransaction {
            hex: format!("{hex}{FUNDED_SUFFIX}"),
            fee: 0.0001,
        })
    }

    fn lock_unspent(&self, inputs: &[OutPoint]) -> Result<bool> {
        self.record("lockunspent")?;
        if self.deny_locks.get() {
            return Ok(false);
        }
        self.locked.borrow_mut().extend_from_slice(inputs);
        Ok(true)
    }

    fn unlock_unspent(&self, inputs: &[OutPoint]) -> Result<bool> {
        self.record("unlockunspent")?;
        self.locked.borrow_mut().retain(|op| !inputs.contains(op));
        Ok(true)
    }

    fn sign_raw_transaction(&self, hex: &str) -> Result<SignedTransaction> {
        self.record("signrawtransaction")?;
        Ok(SignedTransaction {
            hex: format!("{hex}{SIGNED_SUFFIX}"),
            complete: !self.sign_incompletely.get(),
        })
    }

    fn send_raw_transaction(&self, hex: &str) -> Result<String> {
        self.record("sendrawtransaction")?;
        self.sent.borrow_mut().push(hex.to_string());
        Ok(FEE_TX_HASH.to_string())
    }
}

/// A request as the mock provider received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The body as JSON, or `Null` without one.
    pub fn json(&self) -> Value {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
            .unwrap_or(Value::Null)
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.json().get("timestamp").and_then(Value::as_i64)
    }
}

/// What the mock provider remembers about one ticket.
#[derive(Debug, Default)]
struct TicketState {
    last_timestamp: Option<i64>,
    fee_address: Option<String>,
    fee_tx: Option<String>,
    voting_key: Option<String>,
    vote_choices: VoteChoices,
}

/// Requests that concern one ticket.
trait TicketRequest: DeserializeOwned {
    fn ticket_hash(&self) -> &str;
    fn timestamp(&self) -> i64;
}

macro_rules! ticket_request {
    ($($ty:ty),+) => {
        $(impl TicketRequest for $ty {
            fn ticket_hash(&self) -> &str {
                &self.ticket_hash
            }

            fn timestamp(&self) -> i64 {
                self.timestamp
            }
        })+
    };
}

ticket_request!(
    FeeAddressRequest,
    PayFeeRequest,
    TicketStatusRequest,
    SetVoteChoicesRequest
);

#[derive(Serialize)]
struct Receipt {
    timestamp: i64,
    request: Value,
}

/// Rejection with a status and a free-text body.
type Reply = std::result::Result<Vec<u8>, (u16, String)>;

/// A provider speaking `protocol`, signing with a fixed ed25519 key.
pub struct MockVsp {
    protocol: Protocol,
    key: SigningKey,
    closed: Cell<bool>,
    corrupt_signatures: Cell<bool>,
    omit_fee_amount: Cell<bool>,
    failures: RefCell<Vec<(String, u16, String)>>,
    dropped: RefCell<Vec<String>>,
    requests: RefCell<Vec<RecordedRequest>>,
    responses: RefCell<Vec<(String, Vec<u8>)>>,
    tickets: RefCell<BTreeMap<String, TicketState>>,
}

impl MockVsp {
    pub fn new(protocol: Protocol) -> Self {
        Self::with_seed(protocol, [7; 32])
    }

    pub fn with_seed(protocol: Protocol, seed: [u8; 32]) -> Self {
        Self {
            protocol,
            key: SigningKey::from_bytes(&seed),
            closed: Cell::new(false),
            corrupt_signatures: Cell::new(false),
            omit_fee_amount: Cell::new(false),
            failures: RefCell::new(Vec::new()),
            dropped: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
            responses: RefCell::new(Vec::new()),
            tickets: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn public_key(&self) -> ProviderKey {
        ProviderKey::from(self.key.verifying_key())
    }

    pub fn set_closed(&self, closed: bool) {
        self.closed.set(closed);
    }

    /// Sign responses with one bit flipped: well-formed, but wrong.
    pub fn corrupt_signatures(&self, corrupt: bool) {
        self.corrupt_signatures.set(corrupt);
    }

    /// Leave the amount out of fee-address responses.
    pub fn omit_fee_amount(&self, omit: bool) {
        self.omit_fee_amount.set(omit);
    }

    /// Answer the next request to `path` with `status` and `body`.
    pub fn fail_next(&self, path: &str, status: u16, body: &str) {
        self.failures
            .borrow_mut()
            .push((path.to_string(), status, body.to_string()));
    }

    /// Drop the connection on the next request to `path`.
    pub fn drop_next(&self, path: &str) {
        self.dropped.borrow_mut().push(path.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Bodies of the responses sent for `path`, oldest first.
    pub fn responses_to(&self, path: &str) -> Vec<Vec<u8>> {
        self.responses
            .borrow()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }

    pub fn fee_tx(&self, ticket_hash: &str) -> Option<String> {
        self.tickets.borrow().get(ticket_hash)?.fee_tx.clone()
    }

    pub fn voting_key(&self, ticket_hash: &str) -> Option<String> {
        self.tickets.borrow().get(ticket_hash)?.voting_key.clone()
    }

    pub fn vote_choices(&self, ticket_hash: &str) -> Option<VoteChoices> {
        self.tickets
            .borrow()
            .get(ticket_hash)
            .map(|t| t.vote_choices.clone())
    }

    fn take_failure(&self, path: &str) -> Option<(u16, String)> {
        let mut failures = self.failures.borrow_mut();
        let index = failures.iter().position(|(p, _, _)| p == path)?;
        let (_, status, body) = failures.remove(index);
        Some((status, body))
    }

    fn take_drop(&self, path: &str) -> bool {
        let mut dropped = self.dropped.borrow_mut();
        match dropped.iter().position(|p| p == path) {
            Some(index) => {
                dropped.remove(index);
                true
            }
            None => false,
        }
    }

    fn encode<T: Serialize>(&self, body: &T) -> Reply {
        envelope::encode(body, self.protocol.field_naming).map_err(|e| (500, e.to_string()))
    }

    fn respond(&self, status: u16, body: Vec<u8>) -> HttpResponse {
        let mut signature = self.key.sign(&body).to_bytes();
        if self.corrupt_signatures.get() {
            signature[0] ^= 1;
        }
        HttpResponse {
            status,
            headers: vec![(
                self.protocol.server_signature_header.clone(),
                self.protocol.signature_encoding.encode(&signature),
            )],
            body,
        }
    }

    fn handle(&self, request: &RecordedRequest) -> Reply {
        let endpoints = &self.protocol.endpoints;
        let path = request.path.as_str();
        if path == endpoints.identity {
            self.identity()
        } else if path == endpoints.fee {
            self.encode(&FeeResponse {
                fee: Some(legacy_fee().to_coins()),
                fee_percentage: None,
            })
        } else if path == endpoints.fee_address {
            self.fee_address(request)
        } else if path == endpoints.pay_fee {
            self.pay_fee(request)
        } else if path == endpoints.ticket_status {
            self.ticket_status(request)
        } else if path == endpoints.set_vote_choices {
            self.set_vote_choices(request)
        } else {
            Err((404, "not found".to_string()))
        }
    }

    fn identity(&self) -> Reply {
        let endpoints = &self.protocol.endpoints;
        self.encode(&IdentityResponse {
            timestamp: Some(START_TIME),
            pub_key: self.key.verifying_key().to_bytes().to_vec(),
            network: Some(Network::Testnet.to_string()),
            vsp_closed: self.closed.get(),
            fee_percentage: (endpoints.identity == endpoints.fee).then_some(FEE_PERCENTAGE),
        })
    }

    /// Parse the body, check the client signature and the timestamp.
    fn authorize<T: TicketRequest>(
        &self,
        request: &RecordedRequest,
    ) -> std::result::Result<T, (u16, String)> {
        let body = request.body.as_deref().unwrap_or_default();
        let parsed: T =
            envelope::decode(body).map_err(|e| (400, format!("invalid request: {e}")))?;
        let hash = parsed.ticket_hash();

        if self.protocol.client_signs_request {
            let message = String::from_utf8_lossy(body);
            let expected = MockWallet::signature_for(&commitment_address(hash), &message);
            if request.header(&self.protocol.client_signature_header) != Some(expected.as_str()) {
                return Err((401, "invalid client signature".to_string()));
            }
        }

        let mut tickets = self.tickets.borrow_mut();
        let state = tickets.entry(hash.to_string()).or_default();
        let timestamp = parsed.timestamp();
        if state.last_timestamp.map_or(false, |last| timestamp <= last) {
            return Err((400, "timestamp is not newer than the last request".to_string()));
        }
        state.last_timestamp = Some(timestamp);
        Ok(parsed)
    }

    fn receipt(&self, timestamp: i64, request: &RecordedRequest) -> Reply {
        self.encode(&Receipt {
            timestamp,
            request: request.json(),
        })
    }

    fn fee_address(&self, request: &RecordedRequest) -> Reply {
        let parsed: FeeAddressRequest =
            self.authorize(request)?;
        if self.protocol.send_ticket_hex
            && parsed.ticket_hex.as_deref() != Some(ticket_hex(&parsed.ticket_hash).as_str())
        {
            return Err((400, "ticket hex does not match ticket hash".to_string()));
        }

        let address = fee_address(&parsed.ticket_hash);
        if let Some(state) = self.tickets.borrow_mut().get_mut(&parsed.ticket_hash) {
            state.fee_address = Some(address.clone());
        }
        self.encode(&FeeAddressResponse {
            fee_address: address,
            fee_amount: (!self.omit_fee_amount.get())
                .then(|| self.protocol.fee_units.to_value(quoted_fee())),
            expiration: Some(parsed.timestamp + 3600),
        })
    }

    fn pay_fee(&self, request: &RecordedRequest) -> Reply {
        let parsed: PayFeeRequest =
            self.authorize(request)?;
        {
            let mut tickets = self.tickets.borrow_mut();
            let state = tickets.entry(parsed.ticket_hash.clone()).or_default();
            if state.fee_address.is_none() {
                return Err((400, "no fee address issued for ticket".to_string()));
            }
            state.fee_tx = Some(parsed.fee_tx.clone());
            state.voting_key = Some(parsed.voting_key.expose().to_string());
            state.vote_choices = parsed.vote_choices.clone();
        }
        self.receipt(parsed.timestamp, request)
    }

    fn ticket_status(&self, request: &RecordedRequest) -> Reply {
        let parsed: TicketStatusRequest =
            self.authorize(request)?;
        let status = {
            let tickets = self.tickets.borrow();
            let state = tickets.get(&parsed.ticket_hash);
            let paid = state.map_or(false, |s| s.fee_tx.is_some());
            TicketStatus {
                ticket_confirmed: true,
                fee_tx_status: if paid { "broadcast" } else { "none" }.to_string(),
                fee_tx_hash: if paid { FEE_TX_HASH.to_string() } else { String::new() },
                vote_choices: state.map(|s| s.vote_choices.clone()).unwrap_or_default(),
            }
        };
        self.encode(&status)
    }

    fn set_vote_choices(&self, request: &RecordedRequest) -> Reply {
        let parsed: SetVoteChoicesRequest =
            self.authorize(request)?;
        {
            let mut tickets = self.tickets.borrow_mut();
            let state = tickets.entry(parsed.ticket_hash.clone()).or_default();
            if state.fee_address.is_none() {
                return Err((400, "unknown ticket".to_string()));
            }
            state.vote_choices = parsed.vote_choices.clone();
        }
        self.receipt(parsed.timestamp, request)
    }
}

impl Transport for MockVsp {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .ok_or_else(|| Error::Transport(format!("no route to {}", request.url)))?
            .to_string();
        let recorded = RecordedRequest {
            method: request.method,
            path: path.clone(),
            headers: request.headers,
            body: request.body,
        };
        self.requests.borrow_mut().push(recorded.clone());

        if self.take_drop(&path) {
            return Err(Error::Transport("connection reset by peer".to_string()));
        }
        let (status, body) = match self.take_failure(&path) {
            Some((status, body)) => (status, body.into_bytes()),
            None => match self.handle(&recorded) {
                Ok(body) => (200, body),
                Err((status, reason)) => (status, reason.into_bytes()),
            },
        };
        let response = self.respond(status, body);
        self.responses
            .borrow_mut()
            .push((path, response.body.clone()));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_wallet_signs_only_for_its_tickets() {
        let wallet = MockWallet::example();
        let address = commitment_address(TICKET_A);
        assert_eq!(
            wallet.sign_message(&address, "{}").unwrap(),
            MockWallet::signature_for(&address, "{}")
        );
        assert!(wallet.sign_message(&commitment_address(TICKET_B), "{}").is_err());
        assert_eq!(wallet.calls("signmessage"), 2);
    }

    #[test]
    fn mock_vsp_rejects_stale_timestamps() {
        let vsp = MockVsp::new(Protocol::legacy());
        let body = |timestamp: i64| {
            envelope::encode(
                &TicketStatusRequest {
                    timestamp,
                    ticket_hash: TICKET_A.to_string(),
                },
                vsp.protocol().field_naming,
            )
            .unwrap()
        };
        let send = |timestamp| {
            vsp.send(HttpRequest {
                method: HttpMethod::Get,
                url: format!("{BASE_URL}/api/ticketstatus"),
                headers: vec![],
                body: Some(body(timestamp)),
            })
            .unwrap()
            .status
        };
        assert_eq!(send(10), 200);
        assert_eq!(send(10), 400);
        assert_eq!(send(11), 200);
    }
}
