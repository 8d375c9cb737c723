//! A single description of the provider API, covering every protocol
//! generation we speak. Call logic never branches on a version number; it
//! reads the relevant knob from [`Protocol`] instead.

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::amount::Amount;

/// How top-level envelope keys are spelled on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    /// `ticketHash`, `feeTx`, ...
    CamelCase,
    /// `tickethash`, `feetx`, ...
    Lowercase,
}

impl FieldNaming {
    /// Spell a snake_case field name in this naming.
    pub fn apply(&self, field: &str) -> String {
        match self {
            Self::CamelCase => {
                let mut out = String::with_capacity(field.len());
                let mut upper = false;
                for c in field.chars() {
                    if c == '_' {
                        upper = true;
                    } else if upper {
                        out.extend(c.to_uppercase());
                        upper = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
            Self::Lowercase => field.chars().filter(|c| *c != '_').collect(),
        }
    }
}

/// Reduce a key to a spelling shared by every naming, for matching.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Text encoding of the detached signature carried in a header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureEncoding {
    Hex,
    Base64,
}

impl SignatureEncoding {
    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        let text = text.trim().as_bytes();
        match self {
            Self::Hex => HEXLOWER_PERMISSIVE.decode(text).ok(),
            Self::Base64 => BASE64.decode(text).ok(),
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => HEXLOWER_PERMISSIVE.encode(bytes),
            Self::Base64 => BASE64.encode(bytes),
        }
    }
}

/// How fee amounts are written in provider responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeUnits {
    /// Fractional coins, as a JSON float.
    Coin,
    /// Integer atoms.
    Atoms,
}

impl FeeUnits {
    pub fn parse(&self, value: &Value) -> Option<Amount> {
        match self {
            Self::Coin => value.as_f64().and_then(Amount::from_coins),
            Self::Atoms => value
                .as_i64()
                .filter(|atoms| *atoms >= 0)
                .map(Amount::from_atoms),
        }
    }

    pub fn to_value(&self, amount: Amount) -> Value {
        match self {
            Self::Coin => Value::from(amount.to_coins()),
            Self::Atoms => Value::from(amount.atoms()),
        }
    }
}

/// Who puts the signed fee transaction on the network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBroadcast {
    /// The provider broadcasts; we never call `sendrawtransaction`.
    Provider,
    /// We broadcast ourselves; the pay-fee call is advisory.
    Client,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// Paths of every provider endpoint, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub identity: String,
    pub fee: String,
    pub fee_address: String,
    pub pay_fee: String,
    pub ticket_status: String,
    pub set_vote_choices: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub field_naming: FieldNaming,
    pub signature_encoding: SignatureEncoding,
    pub server_signature_header: String,
    pub client_signature_header: String,
    pub client_signs_request: bool,
    pub fee_units: FeeUnits,
    pub fee_broadcast: FeeBroadcast,
    pub lock_inputs: bool,
    /// Tickets with fewer confirmations are deferred. `None` disables the check.
    pub min_confirmations: Option<u32>,
    pub send_ticket_hex: bool,
    pub status_method: HttpMethod,
    pub endpoints: Endpoints,
}

impl Protocol {
    /// The current API: lowercase keys, base64 signatures, signed requests,
    /// provider-side broadcast and locked fee inputs.
    pub fn current() -> Self {
        Self {
            field_naming: FieldNaming::Lowercase,
            signature_encoding: SignatureEncoding::Base64,
            server_signature_header: "VSP-Server-Signature".to_string(),
            client_signature_header: "VSP-Client-Signature".to_string(),
            client_signs_request: true,
            fee_units: FeeUnits::Atoms,
            fee_broadcast: FeeBroadcast::Provider,
            lock_inputs: true,
            min_confirmations: Some(2),
            send_ticket_hex: true,
            status_method: HttpMethod::Post,
            endpoints: Endpoints {
                identity: "/api/v3/vspinfo".to_string(),
                fee: "/api/v3/vspinfo".to_string(),
                fee_address: "/api/v3/feeaddress".to_string(),
                pay_fee: "/api/v3/payfee".to_string(),
                ticket_status: "/api/v3/ticketstatus".to_string(),
                set_vote_choices: "/api/v3/setvotechoices".to_string(),
            },
        }
    }

    /// The early API: camelCase keys, hex signatures, unsigned requests and
    /// a client that broadcasts its own fee transaction.
    pub fn legacy() -> Self {
        Self {
            field_naming: FieldNaming::CamelCase,
            signature_encoding: SignatureEncoding::Hex,
            server_signature_header: "VSP-Signature".to_string(),
            client_signature_header: "VSP-Client-Signature".to_string(),
            client_signs_request: false,
            fee_units: FeeUnits::Coin,
            fee_broadcast: FeeBroadcast::Client,
            lock_inputs: false,
            min_confirmations: None,
            send_ticket_hex: false,
            status_method: HttpMethod::Get,
            endpoints: Endpoints {
                identity: "/api/pubkey".to_string(),
                fee: "/api/fee".to_string(),
                fee_address: "/api/feeaddress".to_string(),
                pay_fee: "/api/payfee".to_string(),
                ticket_status: "/api/ticketstatus".to_string(),
                set_vote_choices: "/api/setvotechoices".to_string(),
            },
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Current,
    Legacy,
}

impl Preset {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Current => Protocol::current(),
            Self::Legacy => Protocol::legacy(),
        }
    }
}

/// The `[protocol]` config section: a preset plus optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub preset: Preset,
    pub field_naming: Option<FieldNaming>,
    pub signature_encoding: Option<SignatureEncoding>,
    pub server_signature_header: Option<String>,
    pub client_signature_header: Option<String>,
    pub client_signs_request: Option<bool>,
    pub fee_units: Option<FeeUnits>,
    pub fee_broadcast: Option<FeeBroadcast>,
    pub lock_inputs: Option<bool>,
    pub min_confirmations: Option<u32>,
    pub skip_confirmation_check: bool,
    pub send_ticket_hex: Option<bool>,
    pub status_method: Option<HttpMethod>,
    pub endpoints: Option<Endpoints>,
}

impl ProtocolConfig {
    pub fn resolve(&self) -> Protocol {
        let mut protocol = self.preset.protocol();
        macro_rules! apply {
            ($($field:ident),+) => {
                $(if let Some(value) = &self.$field {
                    protocol.$field = value.clone();
                })+
            };
        }
        apply!(
            field_naming,
            signature_encoding,
            server_signature_header,
            client_signature_header,
            client_signs_request,
            fee_units,
            fee_broadcast,
            lock_inputs,
            send_ticket_hex,
            status_method,
            endpoints
        );
        if self.skip_confirmation_check {
            protocol.min_confirmations = None;
        } else if let Some(min) = self.min_confirmations {
            protocol.min_confirmations = Some(min);
        }
        protocol
    }
}
