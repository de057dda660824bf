//! Error types for framekit

use thiserror::Error;

/// Main error type for framekit operations
///
/// Degenerate geometry never shows up here: intersection helpers return
/// `Option` and the interaction code skips the affected input tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transform is not a member of this synchronization group")]
    NotAMember,
}

/// Result type alias for framekit operations
pub type Result<T> = std::result::Result<T, Error>;
