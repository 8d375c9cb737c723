//! Client signatures (delegated to the wallet) and verification of the
//! provider's detached response signatures.

use crate::error::{Error, Result};
use crate::model::protocol::SignatureEncoding;
use crate::model::provider::ProviderKey;
use crate::wallet::Wallet;

/// Sign `message` with the key behind `address`. The wallet holds the key;
/// nothing is derived locally.
pub fn sign<W: Wallet + ?Sized>(wallet: &W, address: &str, message: &[u8]) -> Result<String> {
    let message = std::str::from_utf8(message)
        .map_err(|_| Error::Signing("message is not valid UTF-8".into()))?;
    wallet.sign_message(address, message).map_err(|e| match e {
        Error::Signing(_) => e,
        other => Error::Signing(other.to_string()),
    })
}

/// Check a text-encoded detached signature over `message`.
/// Undecodable and non-matching signatures are indistinguishable here.
pub fn verify(
    key: &ProviderKey,
    message: &[u8],
    signature: &str,
    encoding: SignatureEncoding,
) -> bool {
    match encoding.decode(signature) {
        Some(raw) => key.verify(message, &raw),
        None => false,
    }
}

/// As [`verify`], but a missing header or bad signature becomes
/// [`Error::InvalidServerSignature`].
pub fn check_server_signature(
    key: &ProviderKey,
    message: &[u8],
    signature: Option<&str>,
    encoding: SignatureEncoding,
) -> Result<()> {
    match signature {
        Some(signature) if verify(key, message, signature, encoding) => Ok(()),
        Some(_) => {
            error!("Provider response signature does not verify against {key}");
            Err(Error::InvalidServerSignature)
        }
        None => {
            error!("Provider response carries no signature");
            Err(Error::InvalidServerSignature)
        }
    }
}
