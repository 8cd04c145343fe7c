//! Error types for the remote action domain.
//!
//! [`RemotingError`] is the only computation-level fault channel: it is
//! raised for caller-contract violations (malformed requests) and never for
//! the result of a remote call. Remote results, including transport failures,
//! are data carried by [`crate::CallOutcome`].
//!
//! [`TransportFault`] is what a [`crate::RemotingManager`] returns when it
//! fails synchronously, before a response handler could ever be invoked. The
//! invocation effect folds it into [`crate::CallOutcome::TransportError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Caller-contract violations
// ---------------------------------------------------------------------------

/// Errors raised while constructing a [`crate::CallRequest`].
///
/// None of these can be produced by a remote call; a request that was built
/// successfully always resolves to exactly one [`crate::CallOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RemotingError {
    /// No method name was supplied.
    #[error("Remote action method name is missing")]
    MissingMethodName,

    /// The method name is not fully qualified (`Controller.method`).
    #[error("Remote action method name is not fully qualified: '{name}'")]
    InvalidMethodName {
        /// The rejected name, verbatim.
        name: String,
    },

    /// A call configuration value is outside the range the host accepts.
    #[error("Invalid call configuration: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Synchronous transport failures
// ---------------------------------------------------------------------------

/// A failure reported synchronously by the transport's `invoke_action`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TransportFault {
    /// Human-readable description reported by the transport.
    pub message: String,
}

impl TransportFault {
    /// Creates a [`TransportFault`] with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
