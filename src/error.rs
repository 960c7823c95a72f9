//! Error types for the negotiation environment

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum NegotiatorError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Negotiation errors
    #[error("Malformed action from {party}: {reason}")]
    MalformedAction { party: String, reason: String },

    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),

    #[error("Invalid negotiation state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Party not found: {0}")]
    PartyNotFound(String),

    #[error("Negotiation session not found: {0}")]
    SessionNotFound(String),

    // Experiment tracking errors
    #[error("Experiment run already closed: {0}")]
    RunClosed(String),

    // Network errors
    #[error("Network connection error: {0}")]
    NetworkConnection(String),

    #[error("Message routing error: {0}")]
    MessageRouting(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for negotiation operations
pub type Result<T> = std::result::Result<T, NegotiatorError>;
