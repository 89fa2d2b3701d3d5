use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum Error {
    /// No tool provider could be reached; fatal for a session.
    #[error("tool provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The model endpoint failed; only the current turn is lost.
    #[error("model call failed: {0}")]
    ModelCall(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, Error>;
