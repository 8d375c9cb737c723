use std::fmt::{Display, Formatter};

use data_encoding::HEXLOWER;
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};

use crate::error::{Error, Result};
use crate::model::amount::Amount;

/// The provider's ed25519 verification key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProviderKey(VerifyingKey);

impl ProviderKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            Error::MalformedResponse(format!(
                "provider public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| Error::MalformedResponse("provider public key is not a valid point".into()))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.0.as_bytes()
    }

    /// Check a raw signature over `message`. Malformed signatures simply fail.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self.0.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

impl From<VerifyingKey> for ProviderKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key)
    }
}

impl Display for ProviderKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", HEXLOWER.encode(self.as_bytes()))
    }
}

/// The provider's advertised fee.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FeeRate {
    /// A flat amount per ticket.
    Absolute(Amount),
    /// A percentage of the ticket's vote reward.
    Percentage(f64),
}

impl Display for FeeRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute(amount) => write!(f, "{amount}"),
            Self::Percentage(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Everything we learned and verified about the provider during discovery.
/// Lives for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
    pub public_key: ProviderKey,
    pub fee_rate: FeeRate,
    /// Network the provider serves, when it says.
    pub network: Option<String>,
    pub closed: bool,
}
