//! Token metrics provider implementations

pub mod moralis;
pub mod rugcheck;

pub use moralis::MoralisProvider;
pub use rugcheck::RugCheckProvider;
