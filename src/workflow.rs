//! The per-ticket fee-payment state machine and the batch loop around it.
//!
//! A [`Session`] is built once per run: it owns the wallet, transport and
//! clock, and holds the provider identity found by discovery. Each ticket
//! then walks
//! `Resolve -> FeeAddress -> FeeTx -> PayFee -> Status -> VoteChoices -> StatusRecheck`,
//! stopping at the first failed stage. A failure ends that ticket only.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::config::{Config, Network};
use crate::discovery;
use crate::error::{Error, Result};
use crate::model::amount::Amount;
use crate::model::envelope::{
    self, FeeAddressRequest, FeeAddressResponse, PayFeeRequest, SetVoteChoicesRequest,
    TicketStatus, TicketStatusRequest,
};
use crate::model::protocol::{FeeBroadcast, HttpMethod, Protocol};
use crate::model::provider::{FeeRate, ProviderIdentity};
use crate::model::timestamp::{Clock, TimestampSequence};
use crate::model::votes::{VoteChoices, VotePlan};
use crate::resolver::{self, Resolution, ResolvedTicket};
use crate::transport::{ProviderApi, Transport};
use crate::wallet::{FundingPolicy, OutPoint, Wallet};

/// Everything a session needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub protocol: Protocol,
    pub network: Network,
    pub funding: FundingPolicy,
    pub votes: VotePlan,
    /// Delay between consecutive tickets.
    pub pacing: Duration,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.provider().url().to_string(),
            protocol: config.protocol(),
            network: config.network(),
            funding: config.wallet().funding_policy(),
            votes: config.votes().clone(),
            pacing: config.pacing(),
        }
    }
}

/// The step a ticket was at when it failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    FeeAddress,
    FeeTx,
    PayFee,
    Status,
    VoteChoices,
    StatusRecheck,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::FeeAddress => "fee address",
            Self::FeeTx => "fee transaction",
            Self::PayFee => "pay fee",
            Self::Status => "status",
            Self::VoteChoices => "vote choices",
            Self::StatusRecheck => "status recheck",
        };
        f.write_str(name)
    }
}

/// What a completed ticket looked like along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSummary {
    pub fee_address: String,
    pub fee_amount: Amount,
    /// Hash of the fee transaction, if we broadcast it or the provider told us.
    pub fee_tx_hash: Option<String>,
    pub status: TicketStatus,
    /// `None` when there was no vote-choice update to make.
    pub status_after_update: Option<TicketStatus>,
}

#[derive(Debug)]
pub enum TicketOutcome {
    Done(TicketSummary),
    /// Not confirmed enough yet. Not an error.
    Skipped { confirmations: i64 },
    Failed { stage: Stage, error: Error },
}

impl TicketOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct TicketReport {
    pub ticket_hash: String,
    pub outcome: TicketOutcome,
}

/// The result of one pass over the wallet's tickets.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub tickets: Vec<TicketReport>,
}

impl BatchReport {
    pub fn any_failed(&self) -> bool {
        self.tickets.iter().any(|t| t.outcome.is_failure())
    }

    pub fn outcome(&self, ticket_hash: &str) -> Option<&TicketOutcome> {
        self.tickets
            .iter()
            .find(|t| t.ticket_hash == ticket_hash)
            .map(|t| &t.outcome)
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (mut done, mut skipped, mut failed) = (0, 0, 0);
        for ticket in &self.tickets {
            match ticket.outcome {
                TicketOutcome::Done(_) => done += 1,
                TicketOutcome::Skipped { .. } => skipped += 1,
                TicketOutcome::Failed { .. } => failed += 1,
            }
        }
        write!(f, "{done} done, {skipped} skipped, {failed} failed")
    }
}

/// The provider's quote for one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    pub address: String,
    pub amount: Amount,
}

/// A signed fee transaction, and the inputs we locked to build it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTx {
    pub hex: String,
    pub locked: Vec<OutPoint>,
}

type StageResult<T> = std::result::Result<T, (Stage, Error)>;

/// Tag an error with the stage it happened at.
trait AtStage<T> {
    fn at(self, stage: Stage) -> StageResult<T>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> StageResult<T> {
        self.map_err(|e| (stage, e))
    }
}

pub struct Session<W: Wallet, T: Transport, C: Clock> {
    settings: Settings,
    wallet: W,
    transport: T,
    clock: C,
    provider: ProviderIdentity,
}

impl<W: Wallet, T: Transport, C: Clock> Session<W, T, C> {
    /// Discover the provider and build a session around it.
    pub fn connect(settings: Settings, wallet: W, transport: T, clock: C) -> Result<Self> {
        let provider = {
            let api = ProviderApi::new(&settings.base_url, &settings.protocol, &transport, &wallet);
            discovery::discover(&api, settings.network)?
        };
        Ok(Self {
            settings,
            wallet,
            transport,
            clock,
            provider,
        })
    }

    pub fn provider(&self) -> &ProviderIdentity {
        &self.provider
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn protocol(&self) -> &Protocol {
        &self.settings.protocol
    }

    fn api(&self) -> ProviderApi<'_, T, W> {
        ProviderApi::new(
            &self.settings.base_url,
            &self.settings.protocol,
            &self.transport,
            &self.wallet,
        )
    }

    /// Every ticket the wallet holds, immature ones included.
    pub fn tickets(&self) -> Result<Vec<String>> {
        self.wallet.list_tickets(true)
    }

    /// Process every ticket in wallet order, one at a time. Only failures
    /// that make every ticket unsafe to process are returned as `Err`.
    pub fn run(&self) -> Result<BatchReport> {
        if self.provider.closed {
            error!("Provider is closed to new tickets");
            return Err(Error::ProviderClosed);
        }
        let hashes = self.tickets()?;
        info!("Processing {} ticket(s)", hashes.len());

        let mut report = BatchReport::default();
        for (i, hash) in hashes.into_iter().enumerate() {
            if i > 0 {
                self.clock.sleep(self.settings.pacing);
            }
            let outcome = self.process_ticket(&hash);
            log_outcome(&hash, &outcome);
            report.tickets.push(TicketReport {
                ticket_hash: hash,
                outcome,
            });
        }
        info!("Batch finished: {report}");
        Ok(report)
    }

    /// Walk one ticket through every stage.
    pub fn process_ticket(&self, ticket_hash: &str) -> TicketOutcome {
        let resolution = resolver::resolve(
            &self.wallet,
            ticket_hash,
            self.protocol().min_confirmations,
        );
        let resolved = match resolution {
            Ok(Resolution::Ready(resolved)) => resolved,
            Ok(Resolution::Deferred { confirmations }) => {
                return TicketOutcome::Skipped { confirmations }
            }
            Err(error) => {
                return TicketOutcome::Failed {
                    stage: Stage::Resolve,
                    error,
                }
            }
        };

        match self.pay_and_vote(&resolved) {
            Ok(summary) => TicketOutcome::Done(summary),
            Err((stage, error)) => TicketOutcome::Failed { stage, error },
        }
    }

    fn pay_and_vote(&self, resolved: &ResolvedTicket) -> StageResult<TicketSummary> {
        let mut stamps = TimestampSequence::new();
        let votes = &self.settings.votes;

        let quote = self
            .get_fee_address(resolved, &mut stamps)
            .at(Stage::FeeAddress)?;
        let fee_tx = self.build_fee_tx(&quote).at(Stage::FeeTx)?;
        let broadcast_hash = self
            .pay_fee(resolved, &fee_tx, &votes.initial, &mut stamps)
            .at(Stage::PayFee)?;

        let status = self.check_status(resolved, &mut stamps).at(Stage::Status)?;

        let status_after_update = if votes.update.is_empty() {
            debug!("No vote choice update configured for {}", resolved.ticket.hash);
            None
        } else {
            self.update_vote_choices(resolved, &votes.update, &mut stamps)
                .at(Stage::VoteChoices)?;
            Some(
                self.check_status(resolved, &mut stamps)
                    .at(Stage::StatusRecheck)?,
            )
        };

        let latest = status_after_update.as_ref().unwrap_or(&status);
        let fee_tx_hash = broadcast_hash.or_else(|| {
            (!latest.fee_tx_hash.is_empty()).then(|| latest.fee_tx_hash.clone())
        });

        Ok(TicketSummary {
            fee_address: quote.address,
            fee_amount: quote.amount,
            fee_tx_hash,
            status,
            status_after_update,
        })
    }

    /// Ask the provider for a fee address and amount for this ticket.
    pub fn get_fee_address(
        &self,
        resolved: &ResolvedTicket,
        stamps: &mut TimestampSequence,
    ) -> Result<FeeQuote> {
        let protocol = self.protocol();
        let request = FeeAddressRequest {
            timestamp: stamps.next(&self.clock),
            ticket_hash: resolved.ticket.hash.clone(),
            ticket_hex: protocol
                .send_ticket_hex
                .then(|| resolved.ticket.hex.clone()),
        };
        let body = self.api().call(
            HttpMethod::Post,
            &protocol.endpoints.fee_address,
            resolved.identity.commitment_address(),
            &self.provider.public_key,
            &request,
        )?;
        let response: FeeAddressResponse = envelope::decode(&body)?;

        if response.fee_address.is_empty() {
            return Err(Error::MalformedResponse("empty fee address".into()));
        }
        let amount = match &response.fee_amount {
            Some(value) => protocol.fee_units.parse(value).ok_or_else(|| {
                Error::MalformedResponse(format!("unusable fee amount {value}"))
            })?,
            None => match self.provider.fee_rate {
                FeeRate::Absolute(amount) => amount,
                FeeRate::Percentage(_) => {
                    return Err(Error::MalformedResponse(
                        "no fee amount quoted for a percentage fee".into(),
                    ))
                }
            },
        };
        info!(
            "Ticket {}: pay {amount} to {}",
            resolved.ticket.hash, response.fee_address
        );

        Ok(FeeQuote {
            address: response.fee_address,
            amount,
        })
    }

    /// Create, fund and sign a transaction paying `quote`. When the protocol
    /// locks inputs they stay locked on success; on failure they are released.
    pub fn build_fee_tx(&self, quote: &FeeQuote) -> Result<FeeTx> {
        let outputs = BTreeMap::from([(quote.address.clone(), quote.amount)]);
        let raw = self.wallet.create_raw_transaction(&outputs)?;
        let funded = self
            .wallet
            .fund_raw_transaction(&raw, &self.settings.funding)?;
        debug!("Funded fee transaction, network fee {}", funded.fee);

        let mut locked = Vec::new();
        if self.protocol().lock_inputs {
            let inputs = self.wallet.decode_raw_transaction(&funded.hex)?.inputs;
            if !self.wallet.lock_unspent(&inputs)? {
                return Err(Error::LockFailure);
            }
            locked = inputs;
        }

        let signed = match self.wallet.sign_raw_transaction(&funded.hex) {
            Ok(signed) if signed.complete => signed,
            Ok(_) => {
                self.release(&locked);
                return Err(Error::IncompleteSignature);
            }
            Err(e) => {
                self.release(&locked);
                return Err(e);
            }
        };

        Ok(FeeTx {
            hex: signed.hex,
            locked,
        })
    }

    /// Hand the fee, voting key and initial choices to the provider. Returns
    /// the fee transaction hash when we broadcast it ourselves.
    pub fn pay_fee(
        &self,
        resolved: &ResolvedTicket,
        fee_tx: &FeeTx,
        choices: &VoteChoices,
        stamps: &mut TimestampSequence,
    ) -> Result<Option<String>> {
        let protocol = self.protocol();
        let request = PayFeeRequest {
            timestamp: stamps.next(&self.clock),
            ticket_hash: resolved.ticket.hash.clone(),
            fee_tx: fee_tx.hex.clone(),
            voting_key: resolved.identity.voting_key.clone(),
            vote_choices: choices.clone(),
        };
        debug!(
            "Paying fee for {} with voting key {} and choices {choices}",
            resolved.ticket.hash, resolved.identity.voting_key
        );
        let result = self.api().call(
            HttpMethod::Post,
            &protocol.endpoints.pay_fee,
            resolved.identity.commitment_address(),
            &self.provider.public_key,
            &request,
        );

        match protocol.fee_broadcast {
            FeeBroadcast::Provider => match result {
                Ok(_) => Ok(None),
                Err(e @ Error::Provider { .. }) => {
                    // Rejected outright, so the transaction will never be spent.
                    self.release(&fee_tx.locked);
                    Err(e)
                }
                Err(e) => {
                    if !fee_tx.locked.is_empty() {
                        warn!(
                            "Fee outcome for {} unknown, leaving {} input(s) locked",
                            resolved.ticket.hash,
                            fee_tx.locked.len()
                        );
                    }
                    Err(e)
                }
            },
            FeeBroadcast::Client => {
                match result {
                    Ok(_) => {}
                    Err(e @ Error::InvalidServerSignature) => return Err(e),
                    Err(e) => warn!("Provider did not accept fee notification: {e}"),
                }
                let hash = self.wallet.send_raw_transaction(&fee_tx.hex)?;
                info!("Broadcast fee transaction {hash}");
                Ok(Some(hash))
            }
        }
    }

    pub fn check_status(
        &self,
        resolved: &ResolvedTicket,
        stamps: &mut TimestampSequence,
    ) -> Result<TicketStatus> {
        let protocol = self.protocol();
        let request = TicketStatusRequest {
            timestamp: stamps.next(&self.clock),
            ticket_hash: resolved.ticket.hash.clone(),
        };
        let body = self.api().call(
            protocol.status_method,
            &protocol.endpoints.ticket_status,
            resolved.identity.commitment_address(),
            &self.provider.public_key,
            &request,
        )?;
        let status: TicketStatus = envelope::decode(&body)?;
        info!(
            "Ticket {}: confirmed={} fee={} choices: {}",
            resolved.ticket.hash, status.ticket_confirmed, status.fee_tx_status, status.vote_choices
        );
        Ok(status)
    }

    pub fn update_vote_choices(
        &self,
        resolved: &ResolvedTicket,
        choices: &VoteChoices,
        stamps: &mut TimestampSequence,
    ) -> Result<()> {
        let request = SetVoteChoicesRequest {
            timestamp: stamps.next(&self.clock),
            ticket_hash: resolved.ticket.hash.clone(),
            vote_choices: choices.clone(),
        };
        self.api().call(
            HttpMethod::Post,
            &self.protocol().endpoints.set_vote_choices,
            resolved.identity.commitment_address(),
            &self.provider.public_key,
            &request,
        )?;
        info!("Ticket {}: vote choices now {choices}", resolved.ticket.hash);
        Ok(())
    }

    fn release(&self, inputs: &[OutPoint]) {
        if inputs.is_empty() {
            return;
        }
        match self.wallet.unlock_unspent(inputs) {
            Ok(true) => debug!("Unlocked {} input(s)", inputs.len()),
            Ok(false) => warn!("Wallet refused to unlock {} input(s)", inputs.len()),
            Err(e) => warn!("Could not unlock {} input(s): {e}", inputs.len()),
        }
    }
}

fn log_outcome(ticket_hash: &str, outcome: &TicketOutcome) {
    match outcome {
        TicketOutcome::Done(summary) => info!(
            "Ticket {ticket_hash}: done, paid {} to {}",
            summary.fee_amount, summary.fee_address
        ),
        TicketOutcome::Skipped { confirmations } => {
            info!("Ticket {ticket_hash}: skipped with {confirmations} confirmation(s)")
        }
        TicketOutcome::Failed { stage, error } if error.is_security_failure() => {
            error!("Ticket {ticket_hash}: SECURITY FAILURE at {stage}: {error}")
        }
        TicketOutcome::Failed { stage, error } => {
            warn!("Ticket {ticket_hash}: failed at {stage}: {error}")
        }
    }
}
