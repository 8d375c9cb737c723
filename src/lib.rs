#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate session_test;

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod model;
pub mod resolver;
pub mod signature;
pub mod transport;
pub mod wallet;
pub mod workflow;

#[cfg(test)]
mod mock;

pub use config::Config;
pub use error::{Error, Result};
pub use workflow::{BatchReport, Session, Settings, Stage, TicketOutcome, TicketSummary};
