//! Unbounded multi-producer, single-consumer command queue.
//!
//! Producers hold cloneable [`CommandQueue`] handles; the single
//! [`CommandReceiver`] belongs to the dispatcher. Order is preserved per
//! producer. Commands still queued when the receiver is dropped are discarded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::command::Command;

/// Producer handle for the command queue.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<Command>,
    pending: Arc<AtomicUsize>,
}

/// Consumer side of the command queue.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
    pending: Arc<AtomicUsize>,
}

impl CommandQueue {
    /// Create a queue and its single receiver.
    pub fn new() -> (CommandQueue, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            CommandQueue {
                tx,
                pending: Arc::clone(&pending),
            },
            CommandReceiver { rx, pending },
        )
    }

    /// Append `command` to the tail. Never blocks.
    ///
    /// After the receiver is gone the command is dropped.
    pub fn enqueue(&self, command: Command) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(mpsc::error::SendError(command)) = self.tx.send(command) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            debug!(%command, "Command queue closed, discarding command");
        }
    }

    /// Number of commands waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandReceiver {
    /// Remove and return the head of the queue, suspending while it is empty.
    ///
    /// Returns `None` once every producer handle has been dropped and the
    /// queue is drained.
    pub async fn dequeue(&mut self) -> Option<Command> {
        let command = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(command)
    }

    /// Number of commands waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
