//! Identity lookup seam.

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::model::{IdentityRecord, MemberId};

/// Looks up the registered identity for a platform member.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve `member` to its identity record.
    ///
    /// Returns `Ok(None)` for unregistered members. If the store holds several
    /// matching rows, only the first is returned.
    async fn resolve(&self, member: MemberId) -> Result<Option<IdentityRecord>, ResolveError>;
}
