//! Turn a ticket hash into the material needed to pay for it: the ticket
//! itself, its commitment address, and the voting key.

use crate::error::{Error, Result};
use crate::model::ticket::{CommitmentIdentity, Ticket, TicketAddresses};
use crate::wallet::{DecodedTransaction, Wallet};

/// Script type of a ticket's commitment output.
const COMMITMENT_SCRIPT_TYPE: &str = "sstxcommitment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTicket {
    pub ticket: Ticket,
    pub identity: CommitmentIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(ResolvedTicket),
    /// Not confirmed enough yet. Try again on a later run.
    Deferred { confirmations: i64 },
}

/// Look up `ticket_hash` in the wallet and derive its signing material.
/// With `min_confirmations` set, an under-confirmed ticket is deferred
/// before anything else is asked of the wallet.
pub fn resolve<W: Wallet + ?Sized>(
    wallet: &W,
    ticket_hash: &str,
    min_confirmations: Option<u32>,
) -> Result<Resolution> {
    let tx = wallet.get_transaction(ticket_hash)?;
    if let Some(min) = min_confirmations {
        if tx.confirmations < i64::from(min) {
            return Ok(Resolution::Deferred {
                confirmations: tx.confirmations,
            });
        }
    }

    let decoded = wallet.decode_raw_transaction(&tx.hex).map_err(|e| match e {
        Error::Transport(_) => e,
        other => Error::MalformedTicket(format!("{ticket_hash}: {other}")),
    })?;
    let addresses = extract_ticket_addresses(&decoded)
        .map_err(|e| Error::MalformedTicket(format!("{ticket_hash}: {e}")))?;
    let voting_key = wallet.dump_private_key(&addresses.submission)?;
    debug!(
        "Ticket {ticket_hash}: commitment {}, submission {}",
        addresses.commitment, addresses.submission
    );

    Ok(Resolution::Ready(ResolvedTicket {
        ticket: Ticket {
            hash: ticket_hash.to_string(),
            hex: tx.hex,
            confirmations: tx.confirmations,
        },
        identity: CommitmentIdentity {
            addresses,
            voting_key,
        },
    }))
}

/// Pull the submission address (output 0) and commitment address (output 1)
/// out of a decoded ticket. Each must yield exactly one address.
pub fn extract_ticket_addresses(decoded: &DecodedTransaction) -> Result<TicketAddresses> {
    let [submission, commitment, ..] = decoded.outputs.as_slice() else {
        return Err(Error::MalformedTicket(format!(
            "expected at least 2 outputs, found {}",
            decoded.outputs.len()
        )));
    };
    if commitment.script_pub_key.script_type != COMMITMENT_SCRIPT_TYPE {
        return Err(Error::MalformedTicket(format!(
            "output 1 is {:?}, not a commitment",
            commitment.script_pub_key.script_type
        )));
    }
    Ok(TicketAddresses {
        submission: single_address(&submission.script_pub_key.addresses, "submission")?,
        commitment: single_address(&commitment.script_pub_key.addresses, "commitment")?,
    })
}

fn single_address(addresses: &[String], what: &str) -> Result<String> {
    match addresses {
        [address] => Ok(address.clone()),
        other => Err(Error::MalformedTicket(format!(
            "{what} output has {} addresses, expected 1",
            other.len()
        ))),
    }
}
