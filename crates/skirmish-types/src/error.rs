//! Error types for inbound data validation.

/// An inbound message could not be turned into a well-formed event.
///
/// Validation errors are never retried: the offending message is logged,
/// acknowledged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The payload is not valid JSON or does not match the envelope shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field required by the event kind is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The player id is not `1` or `2`.
    #[error("invalid player id: {0}")]
    InvalidPlayer(i64),

    /// The action type is not one the engine knows how to resolve.
    #[error("unknown action type: {0}")]
    UnknownAction(String),
}
