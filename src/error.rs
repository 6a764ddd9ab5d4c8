use thiserror::Error;

use crate::chains::models::Chain;

/// Top-level error type for the refund service
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid startup configuration. Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chain endpoint unreachable or timed out. Recoverable per chain per cycle.
    #[error("Connection error on {chain}: {message}")]
    Connection { chain: Chain, message: String },

    /// A single refund failed to broadcast or was rejected. Recoverable per swap.
    #[error("Refund submission failed on {chain} for swap {swap_id}: {message}")]
    Submission {
        chain: Chain,
        swap_id: String,
        message: String,
    },

    #[error("Invalid response from {chain}: {message}")]
    InvalidResponse { chain: Chain, message: String },

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn connection(chain: Chain, message: impl Into<String>) -> Self {
        AppError::Connection {
            chain,
            message: message.into(),
        }
    }

    pub fn submission(chain: Chain, swap_id: impl ToString, message: impl Into<String>) -> Self {
        AppError::Submission {
            chain,
            swap_id: swap_id.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_response(chain: Chain, message: impl Into<String>) -> Self {
        AppError::InvalidResponse {
            chain,
            message: message.into(),
        }
    }

    /// Only configuration errors are allowed to stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
