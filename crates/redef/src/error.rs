//! Redef error types.

use thiserror::Error;

/// Errors produced while installing bindings or dispatching member calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedefError {
    /// The target has no member with the requested name.
    #[error("object: {namespace} does not have any attribute: {member}")]
    MissingMember { namespace: String, member: String },

    /// The member exists but holds data or a stream, not a function.
    #[error("attribute {member} of {namespace} is not callable")]
    NotCallable { namespace: String, member: String },

    #[error("unknown output channel: {0}")]
    UnknownChannel(String),

    #[error("output channel {0} is not bound to a writable stream")]
    NotAStream(String),
}

impl RedefError {
    pub(crate) fn missing(namespace: &str, member: &str) -> Self {
        Self::MissingMember { namespace: namespace.to_string(), member: member.to_string() }
    }

    pub(crate) fn not_callable(namespace: &str, member: &str) -> Self {
        Self::NotCallable { namespace: namespace.to_string(), member: member.to_string() }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, RedefError>;
