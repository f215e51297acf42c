//! Error types for nicksync-core.

use thiserror::Error;

/// Errors surfaced by an [`IdentityResolver`](crate::IdentityResolver).
///
/// An unregistered member is not an error; resolvers return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identity store could not be reached.
    #[error("identity store unreachable: {0}")]
    Connection(String),

    /// The lookup query itself failed.
    #[error("identity lookup failed: {0}")]
    Query(String),
}

/// Errors surfaced by a [`Platform`](crate::Platform).
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform refused the request (missing permission, unknown member, ...).
    #[error("request rejected by platform: {0}")]
    Rejected(String),

    /// Transport-level failure talking to the platform.
    #[error("platform connection error: {0}")]
    Connection(String),

    /// The platform connection has been closed.
    #[error("platform connection closed")]
    Closed,
}
