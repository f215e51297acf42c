//! Chat platform seam.
//!
//! Connection setup and event delivery belong to the concrete adapter; the
//! core only needs readiness, a membership snapshot and the rename call.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::PlatformError;
use crate::model::{Member, MemberId};

/// Operations the core needs from the chat platform client.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Suspend until the connection handshake completes.
    ///
    /// Returns the identity of the bot's own account, or
    /// [`PlatformError::Closed`] if the connection closes first.
    async fn wait_until_ready(&self) -> Result<MemberId, PlatformError>;

    /// Snapshot of every member the bot can currently see.
    async fn members(&self) -> Result<Vec<Member>, PlatformError>;

    /// Set `member`'s display name to `new_name`.
    async fn change_display_name(&self, member: &Member, new_name: &str)
        -> Result<(), PlatformError>;

    /// Whether the connection has been closed.
    fn is_closed(&self) -> bool;
}

/// A member profile change reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Snapshot before the change, when the platform had one cached
    pub before: Option<Member>,
    /// Snapshot after the change
    pub after: Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready(MemberId),
    Closed,
}

/// Connection readiness shared between an adapter's event side and its
/// [`Platform::wait_until_ready`] implementation.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<Readiness>>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Readiness::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Record that the handshake completed as account `bot_id`.
    pub fn set_ready(&self, bot_id: MemberId) {
        self.tx.send_replace(Readiness::Ready(bot_id));
    }

    /// Record that the connection closed. Waiters are released with an error.
    pub fn set_closed(&self) {
        self.tx.send_replace(Readiness::Closed);
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow() == Readiness::Closed
    }

    /// Suspend until the connection is ready or closed.
    pub async fn wait(&self) -> Result<MemberId, PlatformError> {
        let mut rx = self.tx.subscribe();
        let state = *rx
            .wait_for(|state| *state != Readiness::Pending)
            .await
            .map_err(|_| PlatformError::Closed)?;

        match state {
            Readiness::Ready(bot_id) => Ok(bot_id),
            _ => Err(PlatformError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_released_on_ready() {
        let signal = ReadySignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::task::yield_now().await;
        signal.set_ready(MemberId(9));

        assert_eq!(waiter.await.unwrap().unwrap(), MemberId(9));
        // Late waiters see the recorded state immediately.
        assert_eq!(signal.wait().await.unwrap(), MemberId(9));
    }

    #[tokio::test]
    async fn waiters_released_on_close() {
        let signal = ReadySignal::new();
        signal.set_closed();

        assert!(signal.is_closed());
        assert!(matches!(signal.wait().await, Err(PlatformError::Closed)));
    }
}
