//! Error types for the IRC protocol crate.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error")]
    Io(#[from] std::io::Error),

    /// A received line exceeded the configured limit.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Length of the offending line in bytes.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A line could not be parsed into a [`crate::Message`].
    #[error("invalid message {string:?}")]
    InvalidMessage {
        /// The raw line.
        string: String,
        /// Why parsing failed.
        #[source]
        cause: MessageParseError,
    },
}

/// Reasons a single IRC line fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// A prefix or tag section was present but no command followed it.
    #[error("missing command")]
    MissingCommand,

    /// The command token contained characters that are not letters or digits.
    #[error("invalid command {0:?}")]
    InvalidCommand(String),
}
