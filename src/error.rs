//! Domain error kinds surfaced to the user.
//!
//! Plumbing (terminal setup, config I/O, HTTP transport, JSON decoding) keeps using
//! `color_eyre::eyre::Result`; anything that reaches the UI is folded into an
//! [`ErrorKind`] so the control loop can decide how to present it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Fetch failure or timeout. Recorded on the affected view only.
    #[error("{0}")]
    Network(String),
    #[error("context '{0}' already exists")]
    DuplicateName(String),
    #[error("context '{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// The root view can never be popped. Hitting this is a bug in the caller.
    #[error("cannot pop the root view")]
    EmptyStack,
}

impl ErrorKind {
    /// Command and context errors are shown as a transient status message.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_)
                | Self::NotFound(_)
                | Self::InvalidOperation(_)
                | Self::UnknownCommand(_)
        )
    }
}
