use thiserror::Error;

/// Errors raised while handing an element to a destination.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The state store refused an element
    #[error("state store rejected <{tag}>: {reason}")]
    StateRejected { tag: String, reason: String },
}
