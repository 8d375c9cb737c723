use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// DNS, connect, timeout or body-read failure.
    #[error("Transport failure: {0}")]
    Transport(String),
    /// Non-success status; the body is the provider's free-text reason.
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Invalid server signature")]
    InvalidServerSignature,
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Ticket not found: {0}")]
    TicketNotFound(String),
    #[error("Malformed ticket: {0}")]
    MalformedTicket(String),
    #[error("Fee transaction is not fully signed")]
    IncompleteSignature,
    #[error("Wallet refused to lock the fee transaction inputs")]
    LockFailure,
    #[error("Provider discovery failed: {0}")]
    Discovery(Box<Error>),
    #[error("Provider is closed to new tickets")]
    ProviderClosed,
    #[error("Provider serves {provider}, but we are configured for {configured}")]
    NetworkMismatch {
        provider: String,
        configured: String,
    },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Could not encode request: {0}")]
    Encoding(String),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any error raised while discovering the provider.
    pub fn discovery(err: Error) -> Self {
        match err {
            Self::Discovery(_) => err,
            other => Self::Discovery(Box::new(other)),
        }
    }

    /// Errors that make it unsafe to process any ticket at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Discovery(_) | Self::ProviderClosed | Self::NetworkMismatch { .. } | Self::Config(_)
        )
    }

    /// Security failures are reported louder than ordinary ones.
    pub fn is_security_failure(&self) -> bool {
        match self {
            Self::InvalidServerSignature => true,
            Self::Discovery(inner) => inner.is_security_failure(),
            _ => false,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
