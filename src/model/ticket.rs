use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

/// A ticket as the wallet reports it. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub hash: String,
    pub hex: String,
    pub confirmations: i64,
}

/// A wallet-exported private key. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VotingKey(String);

impl VotingKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The full secret, for handing to the provider.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Display for VotingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "{prefix}…")
    }
}

impl Debug for VotingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "VotingKey({self})")
    }
}

/// The two addresses encoded in a ticket's first outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketAddresses {
    /// Holds the voting rights (output 0).
    pub submission: String,
    /// Proves ownership when talking to the provider (output 1).
    pub commitment: String,
}

/// Signing material for one ticket. Dropped when that ticket is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentIdentity {
    pub addresses: TicketAddresses,
    pub voting_key: VotingKey,
}

impl CommitmentIdentity {
    pub fn commitment_address(&self) -> &str {
        &self.addresses.commitment
    }
}
