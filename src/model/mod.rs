pub mod amount;
pub mod envelope;
pub mod protocol;
pub mod provider;
pub mod ticket;
pub mod timestamp;
pub mod votes;
