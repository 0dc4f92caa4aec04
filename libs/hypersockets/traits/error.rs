use thiserror::Error;

/// Errors returned by the manager's API
///
/// Transport failures of a running connection are not returned; they arrive
/// as `ClientEvent::Error` and flip `status.error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HyperSocketError {
    /// A frame could not be decoded into the structured message type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Bad URL or incomplete builder
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for hypersockets operations
pub type Result<T> = std::result::Result<T, HyperSocketError>;
