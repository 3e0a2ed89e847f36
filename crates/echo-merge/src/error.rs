// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for merge setup and execution.
//!
//! - [`MergeError::Configuration`]: arity or wiring mismatch found at setup.
//!   The merge never starts and no upstream is polled.
//! - [`MergeError::Upstream`]: a port failed and the active completion policy
//!   decided to terminate the merge with that cause.
//! - [`MergeError::Protocol`]: a strategy broke the driver contract (for
//!   example emitted twice in one transition or named an unknown port).
//!
//! Downstream cancellation is not an error; it surfaces as
//! [`MergeOutcome::Cancelled`](crate::MergeOutcome::Cancelled).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Failure cause reported by an upstream collaborator.
///
/// Cheap to clone so the same cause can be handed to a completion policy and
/// then surfaced downstream.
#[derive(Clone)]
pub struct UpstreamError(Arc<dyn StdError + Send + Sync + 'static>);

impl UpstreamError {
    /// Wraps any error type as an upstream failure cause.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// Builds a cause from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(MessageError(message.into())))
    }

}

impl fmt::Debug for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UpstreamError").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for UpstreamError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<std::io::Error> for UpstreamError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

/// Errors produced while setting up or running a merge.
#[derive(Debug, Clone, Error)]
pub enum MergeError {
    /// Arity or wiring mismatch detected at setup; the merge never started.
    /// The message names the strategy itself.
    #[error("{message}")]
    Configuration {
        /// Name of the merge strategy that rejected the wiring.
        merge: String,
        /// Human readable reason.
        message: String,
    },
    /// An upstream failure terminated the merge.
    #[error("upstream failed: {0}")]
    Upstream(#[source] UpstreamError),
    /// A strategy violated the driver contract.
    #[error("merge protocol violation: {0}")]
    Protocol(String),
}

impl MergeError {
    /// Builds a [`MergeError::Configuration`] for the named strategy.
    pub fn configuration(merge: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            merge: merge.into(),
            message: message.into(),
        }
    }

    /// Returns true when the error was raised during setup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
