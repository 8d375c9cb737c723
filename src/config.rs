use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::protocol::{Protocol, ProtocolConfig};
use crate::model::votes::VotePlan;
use crate::wallet::FundingPolicy;

/// Prefix of environment variables that override the config file,
/// e.g. `VSPCLIENT_PROVIDER__URL`.
pub const ENV_PREFIX: &str = "VSPCLIENT_";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Simnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Simnet => "simnet",
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration, from the config file layered under
/// `VSPCLIENT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    provider: ProviderConfig,
    wallet: WalletConfig,
    #[serde(default)]
    network: Network,
    #[serde(default)]
    protocol: ProtocolConfig,
    #[serde(default)]
    votes: VotePlan,
    #[serde(default = "default_pacing_secs")]
    pacing_secs: u64,
}

fn default_pacing_secs() -> u64 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_account() -> String {
    FundingPolicy::default().account
}

impl Config {
    /// The layered sources, before extraction. Callers may merge further
    /// overrides (e.g. from the command line) on top.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn wallet(&self) -> &WalletConfig {
        &self.wallet
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The selected protocol preset with any overrides applied.
    pub fn protocol(&self) -> Protocol {
        self.protocol.resolve()
    }

    pub fn votes(&self) -> &VotePlan {
        &self.votes
    }

    /// Delay between consecutive tickets.
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl ProviderConfig {
    /// Base URL, without a trailing slash.
    pub fn url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Deserialize)]
pub struct WalletConfig {
    // non-secrets
    url: String,
    user: String,
    #[serde(default)]
    accept_invalid_certs: bool,
    #[serde(default = "default_account")]
    account: String,
    #[serde(default)]
    conf_target: i32,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    // secrets
    password: String,
}

impl WalletConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// RPC password. Never log this.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Wallets usually serve a self-signed certificate.
    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn funding_policy(&self) -> FundingPolicy {
        FundingPolicy {
            account: self.account.clone(),
            conf_target: self.conf_target,
        }
    }
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("account", &self.account)
            .field("conf_target", &self.conf_target)
            .finish_non_exhaustive()
    }
}
