//! Desired-vs-actual display name comparison.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::command::Command;
use crate::model::{desired_name, Member, MemberId};
use crate::resolver::IdentityResolver;

/// Decides whether a member needs renaming.
///
/// Reconciling never touches the queue; callers enqueue what it returns.
pub struct NameReconciler {
    resolver: Arc<dyn IdentityResolver>,
    bot_id: MemberId,
}

impl NameReconciler {
    /// Create a reconciler that never renames the account `bot_id`.
    pub fn new(resolver: Arc<dyn IdentityResolver>, bot_id: MemberId) -> Self {
        Self { resolver, bot_id }
    }

    /// Compare `member`'s display name with its desired name.
    ///
    /// Returns a rename command on mismatch. Resolution failures are logged
    /// and produce no command.
    pub async fn reconcile(&self, member: &Member) -> Option<Command> {
        if member.id == self.bot_id {
            return None;
        }

        let record = match self.resolver.resolve(member.id).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(member = %member.id, handle = %member.handle, "No identity record, using placeholder tag");
                None
            }
            Err(e) => {
                warn!(member = %member.id, handle = %member.handle, error = %e, "Identity resolution failed, skipping member");
                return None;
            }
        };

        let nickname = desired_name(record.as_ref(), &member.handle);
        if member.is_displayed_as(&nickname) {
            return None;
        }

        info!(member = %member.id, handle = %member.handle, new_name = %nickname, "Queuing nickname change");
        Some(Command::rename(member.clone(), nickname))
    }
}
