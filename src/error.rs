//! Client error types.

use std::io;

use andesite_mc::ProtocolError;
use thiserror::Error;

use crate::client::SessionState;

/// Errors produced by the client engine.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Host or port failed validation; reported before any I/O is attempted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The TCP dial failed. The caller may retry with a fresh connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// The address that was dialed.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An operation was attempted in a session state where it is not legal.
    #[error("{op} is not valid in the {state:?} state")]
    InvalidState {
        /// The operation that was attempted.
        op: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// A protocol-level failure on an established connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Whether this error ends the session, as opposed to spoiling a single
    /// packet that can be discarded.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Protocol(ProtocolError::Io(_))
        )
    }
}

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
