//! Errors returned by graph mutations.

/// An error returned by a graph mutation.
///
/// A failed mutation never leaves a partial write behind: the replica state
/// is exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },
}

pub type Result<T> = std::result::Result<T, GraphError>;
