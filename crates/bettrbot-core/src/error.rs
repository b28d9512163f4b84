use thiserror::Error;

#[derive(Debug, Error)]
pub enum BettrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

impl BettrError {
    /// Short error code string, logged next to startup failures.
    pub fn code(&self) -> &'static str {
        match self {
            BettrError::Config(_) => "CONFIG_ERROR",
            BettrError::MissingCredential(_) => "MISSING_CREDENTIAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, BettrError>;
