use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single upstream call, as classified by the client handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The credential's usage limit is currently exceeded.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Authorization, malformed request, transport or decoding failure.
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Conversation {0} is already being processed")]
    Busy(i64),

    #[error("Credential #{index} quota exceeded: {message}")]
    QuotaExceeded { index: usize, message: String },

    #[error("All {attempts} API credentials are rate limited")]
    PoolExhausted { attempts: usize },

    #[error("Upstream failure on credential #{index}: {message}")]
    Upstream { index: usize, message: String },

    #[error("Transport disconnected: {0}")]
    TransportDisconnect(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Gave up after {attempts} consecutive connection failures: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Only user and assistant messages may be appended")]
    InvalidRole,
}

impl Error {
    /// Whether this error should stop the whole process rather than a single exchange.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigMissing(_) | Self::RetriesExhausted { .. })
    }
}
