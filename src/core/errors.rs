// src/core/errors.rs

//! Defines the primary error type for the router and its collaborators.

use thiserror::Error;

/// The main error enum, representing every failure a routing call can surface.
///
/// Collaborators (membership, transport, factory) construct these values themselves,
/// and the router hands them back to the caller untouched. For that reason the type
/// is `Clone + PartialEq`: callers and tests can compare what they got against what
/// the collaborator produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The membership layer could not resolve a routing key to an owning node.
    #[error("LOOKUP failed for key '{key}': {reason}")]
    Lookup { key: String, reason: String },

    /// The membership layer could not tell us our own address.
    #[error("WHOAMI failed: {0}")]
    SelfIdentity(String),

    /// Building a local or remote client handle failed.
    #[error("Could not construct client for {addr}: {reason}")]
    Construction { addr: String, reason: String },
}

impl RouterError {
    /// Shorthand for a lookup failure, used by membership implementations.
    pub fn lookup(key: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::Lookup {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a construction failure, used by factories and transports.
    pub fn construction(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::Construction {
            addr: addr.into(),
            reason: reason.into(),
        }
    }
}

