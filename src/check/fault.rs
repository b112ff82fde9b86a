//! Transient fault classification
//!
//! Faults that may clear on their own (peer resets, timeouts, truncated
//! bodies, other transport failures) are retried by the item worker.
//! Everything else is permanent for the attempt that produced it.

use crate::error::CheckError;
use std::io;

/// Errors that can be classified as retryable or not
pub trait IsTransient {
    /// Returns true if the fault is transient and the attempt should be repeated
    fn is_transient(&self) -> bool;
}

impl IsTransient for io::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::Interrupted
        )
    }
}

impl IsTransient for reqwest::Error {
    fn is_transient(&self) -> bool {
        // Everything except builder and status errors is a transport fault:
        // timeouts, connect failures, resets and truncated bodies.
        !(self.is_builder() || self.is_status())
    }
}

impl IsTransient for CheckError {
    fn is_transient(&self) -> bool {
        match self {
            CheckError::Transport(e) => e.is_transient(),
            CheckError::Io(e) => e.is_transient(),
            CheckError::InvalidProxy(_)
            | CheckError::InvalidHeader(_)
            | CheckError::InvalidConfig(_)
            | CheckError::EmptyInput { .. } => false,
        }
    }
}
