//! Error types for the mail relay.

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while normalizing an inbound message.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No email address in {0:?}")]
    InvalidAddress(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unreadable MIME message")]
    InvalidMime,

    #[error("Invalid multipart body: {0}")]
    Multipart(String),
}

/// Mail delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport {transport} failed: {reason}")]
    Transport { transport: String, reason: String },

    #[error("Provider {provider} rejected the message ({status}): {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
