//! Error type for the animation data subsystem.
//!
//! Every malformed-input and invariant-violation case maps to a single fatal
//! `InvalidData` kind with a descriptive message. Callers discard the whole
//! container on failure; nothing is recovered locally.

/// Error type for container decoding, validation and retargeting.
#[derive(Debug, thiserror::Error)]
pub enum RigAnimError {
    /// Malformed or inconsistent animation data: oversized counts,
    /// out-of-range accessor indices, mismatched track/channel lengths,
    /// unknown compression tags, decompression failures, hierarchy
    /// violations, non-convergent retarget synthesis.
    #[error("invalid animation data: {0}")]
    InvalidData(String),

    /// I/O failure while writing a container.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RigAnimError>;

/// Shorthand for the `InvalidData` case.
pub(crate) fn invalid_data(msg: impl Into<String>) -> RigAnimError {
    RigAnimError::InvalidData(msg.into())
}
