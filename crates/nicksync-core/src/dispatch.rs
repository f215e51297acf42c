//! Rate-limited command dispatch.
//!
//! The dispatcher is the only caller of platform mutations. It executes one
//! command at a time and then waits a fixed delay, so the platform never sees
//! more than one mutation per delay window. Failed commands are logged and
//! dropped; the next sweep re-detects whatever they left unfixed.
//!
//! ```text
//! WaitingForReady ──ready──▶ Draining ──┐
//!        │                     ▲        │ dequeue → execute → delay
//!        │                     └────────┘
//!        └──────────── cancel / closed ──────────▶ Stopped
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::command::Command;
use crate::platform::Platform;
use crate::queue::CommandReceiver;

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Waiting for the platform connection to become ready
    WaitingForReady,
    /// Executing queued commands
    Draining,
    /// Shut down; no further commands are executed
    Stopped,
}

/// Summary of a dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Commands the platform accepted
    pub succeeded: u64,
    /// Commands the platform rejected or failed
    pub failed: u64,
}

/// Sole consumer of the command queue.
pub struct Dispatcher {
    platform: Arc<dyn Platform>,
    delay: Duration,
    state: DispatchState,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create a dispatcher that waits `delay` after every command.
    pub fn new(platform: Arc<dyn Platform>, delay: Duration) -> Self {
        Self {
            platform,
            delay,
            state: DispatchState::WaitingForReady,
            stats: DispatchStats::default(),
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Drain `commands` until cancelled, the platform closes, or every
    /// producer is gone.
    ///
    /// Cancellation never interrupts a mutation already in flight.
    pub async fn run(
        mut self,
        mut commands: CommandReceiver,
        cancel: CancellationToken,
    ) -> DispatchStats {
        let ready = tokio::select! {
            _ = cancel.cancelled() => None,
            ready = self.platform.wait_until_ready() => Some(ready),
        };

        match ready {
            Some(Ok(_)) => {
                debug!(delay = ?self.delay, "Command dispatcher draining");
                self.state = DispatchState::Draining;
            }
            Some(Err(e)) => {
                info!(error = %e, "Platform never became ready, dispatcher stopping");
            }
            None => {}
        }

        while self.state == DispatchState::Draining {
            if self.platform.is_closed() {
                break;
            }

            let command = tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.dequeue() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            self.execute(command).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        self.state = DispatchState::Stopped;
        if !commands.is_empty() {
            info!(discarded = commands.len(), "Dispatcher stopped with commands still queued");
        }
        self.stats
    }

    async fn execute(&mut self, command: Command) {
        match &command {
            Command::Rename { target, new_name } => {
                match self.platform.change_display_name(target, new_name).await {
                    Ok(()) => {
                        self.stats.succeeded += 1;
                        debug!(member = %target.id, new_name = %new_name, "Nickname changed");
                    }
                    Err(e) => {
                        self.stats.failed += 1;
                        error!(member = %target.id, handle = %target.handle, new_name = %new_name, error = %e, "Failed to change nickname");
                    }
                }
            }
        }
    }
}
