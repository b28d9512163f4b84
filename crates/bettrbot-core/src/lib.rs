pub mod config;
pub mod error;

pub use config::BettrConfig;
pub use error::{BettrError, Result};
