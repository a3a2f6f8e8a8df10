//! Typed ports to the external collaborators the core depends on.
//!
//! The chat platform, theme generator, reward transport, and metadata
//! provider all live behind object-safe traits so the core never touches a
//! concrete framework. Failures are represented uniformly by [`CollabError`];
//! the reward and metadata ports instead degrade to a value (`false` /
//! `None`) because their failures must never block a core decision.

use thiserror::Error;

/// Chat platform port and inbound event types.
pub mod chat;
/// Built-in logging collaborators for standalone runs and tests.
pub mod dev;
/// Track metadata enrichment port.
pub mod metadata;
/// Reputation reward port.
pub mod reward;
/// Theme generator port.
pub mod theme;

/// Failure of an external collaborator call.
#[derive(Debug, Error)]
#[error("{collaborator} collaborator unavailable: {message}")]
pub struct CollabError {
    /// Which collaborator failed (chat, theme generator, ...).
    pub collaborator: &'static str,
    /// Human-readable failure description.
    pub message: String,
}

impl CollabError {
    /// Build a failure for the named collaborator.
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// Result alias for collaborator calls.
pub type CollabResult<T> = Result<T, CollabError>;
