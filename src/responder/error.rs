//! Responder error types

use thiserror::Error;

/// Responder error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResponderError {
    pub kind: ResponderErrorKind,
    pub message: String,
}

impl ResponderError {
    pub fn new(kind: ResponderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Network, message)
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Status, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::InvalidResponse, message)
    }

    /// Text shown in the assistant slot in place of a reply
    pub fn notice(&self) -> String {
        match self.kind {
            ResponderErrorKind::Timeout => {
                "The assistant took too long to respond. Please try again.".to_string()
            }
            ResponderErrorKind::Network
            | ResponderErrorKind::Status
            | ResponderErrorKind::InvalidResponse => {
                "The assistant is unavailable right now. Please try again.".to_string()
            }
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderErrorKind {
    /// No reply within the response timeout
    Timeout,
    /// Connection or transport failure
    Network,
    /// Service answered with a non-success status
    Status,
    /// Body could not be read as a reply
    InvalidResponse,
}

impl ResponderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Status => "status",
            Self::InvalidResponse => "invalid_response",
        }
    }
}
