//! One-shot provider discovery: the public key, then the fee. Any failure
//! here is fatal to the run.

use crate::config::Network;
use crate::error::{Error, Result};
use crate::model::amount::Amount;
use crate::model::envelope::{self, FeeResponse, IdentityResponse};
use crate::model::provider::{FeeRate, ProviderIdentity, ProviderKey};
use crate::transport::{ProviderApi, Transport};
use crate::wallet::Wallet;

/// The identity endpoint's claims, checked only for self-consistency.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisedIdentity {
    pub public_key: ProviderKey,
    pub network: Option<String>,
    pub closed: bool,
}

/// Fetch the provider's key. The body carries the key that signed it, so
/// this proves the key and body belong together, not that the key is the
/// right one (trust on first use).
pub fn fetch_identity<T, W>(api: &ProviderApi<'_, T, W>) -> Result<AdvertisedIdentity>
where
    T: Transport + ?Sized,
    W: Wallet + ?Sized,
{
    (|| {
        let response = api.get(&api.protocol().endpoints.identity)?;
        // Only the key is read before verification, and only to verify with.
        let claimed: IdentityResponse = envelope::decode(&response.body)?;
        let public_key = ProviderKey::from_bytes(&claimed.pub_key)?;
        api.verify(&response, &public_key)?;
        Ok(AdvertisedIdentity {
            public_key,
            network: claimed.network,
            closed: claimed.vsp_closed,
        })
    })()
    .map_err(Error::discovery)
}

/// Fetch the fee rate, verified against the key from [`fetch_identity`].
pub fn fetch_fee<T, W>(api: &ProviderApi<'_, T, W>, key: &ProviderKey) -> Result<FeeRate>
where
    T: Transport + ?Sized,
    W: Wallet + ?Sized,
{
    (|| {
        let response = api.get(&api.protocol().endpoints.fee)?;
        api.verify(&response, key)?;
        let fee: FeeResponse = envelope::decode(&response.body)?;
        match (fee.fee_percentage, fee.fee) {
            (Some(pct), _) if pct.is_finite() && pct >= 0.0 => Ok(FeeRate::Percentage(pct)),
            (None, Some(coins)) => Amount::from_coins(coins)
                .map(FeeRate::Absolute)
                .ok_or_else(|| Error::MalformedResponse(format!("invalid fee {coins}"))),
            _ => Err(Error::MalformedResponse("no usable fee in response".into())),
        }
    })()
    .map_err(Error::discovery)
}

/// Run discovery and check the provider serves our network.
pub fn discover<T, W>(api: &ProviderApi<'_, T, W>, network: Network) -> Result<ProviderIdentity>
where
    T: Transport + ?Sized,
    W: Wallet + ?Sized,
{
    let identity = fetch_identity(api)?;
    info!("Provider public key: {}", identity.public_key);
    let fee_rate = fetch_fee(api, &identity.public_key)?;
    info!("Provider fee: {fee_rate}");

    if let Some(served) = &identity.network {
        if served != network.as_str() {
            return Err(Error::discovery(Error::NetworkMismatch {
                provider: served.clone(),
                configured: network.to_string(),
            }));
        }
    }

    Ok(ProviderIdentity {
        public_key: identity.public_key,
        fee_rate,
        network: identity.network,
        closed: identity.closed,
    })
}
