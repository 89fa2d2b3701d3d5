//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported server target {0}: expected a .py or .js script")]
    InvalidTarget(String),

    #[error("failed to spawn server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("server connection closed")]
    Disconnected,

    #[error("service error: {0}")]
    Service(String),
}

impl From<rmcp::service::ServiceError> for Error {
    fn from(err: rmcp::service::ServiceError) -> Self {
        match err {
            rmcp::service::ServiceError::TransportClosed => Self::Disconnected,
            other => Self::Service(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_transport_is_disconnected() {
        let err = Error::from(rmcp::service::ServiceError::TransportClosed);
        assert!(matches!(err, Error::Disconnected));
    }
}
