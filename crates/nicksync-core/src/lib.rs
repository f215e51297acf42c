//! Nicksync Core - display-name reconciliation engine
//!
//! Keeps community members' display names in line with their registered
//! identity records, while funnelling every rename through a single
//! rate-limited dispatcher.
//!
//! # Architecture
//!
//! - **Resolver**: [`IdentityResolver`] looks up `(tag, real name)` for a member
//! - **Reconciler**: [`NameReconciler`] turns a member snapshot into a rename
//!   [`Command`] when its display name is wrong
//! - **Queue**: [`CommandQueue`] is the unbounded MPSC queue of pending commands
//! - **Dispatcher**: [`Dispatcher`] executes one command, waits a fixed delay,
//!   repeats
//! - **Scheduler**: [`Scheduler`] runs the periodic sweep and the
//!   profile-update trigger
//!
//! The chat platform and identity store are reached only through the
//! [`Platform`] and [`IdentityResolver`] traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use nicksync_core::inmemory::{InMemoryPlatform, InMemoryResolver};
//! use nicksync_core::{CommandQueue, Dispatcher, Scheduler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() {
//! let platform = Arc::new(InMemoryPlatform::new());
//! let resolver = Arc::new(InMemoryResolver::new());
//! let (queue, commands) = CommandQueue::new();
//! let (_updates_tx, updates_rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let scheduler = Scheduler::new(platform.clone(), resolver, queue).start(updates_rx);
//! let _stats = Dispatcher::new(platform, Duration::from_secs(1))
//!     .run(commands, CancellationToken::new())
//!     .await;
//! scheduler.shutdown();
//! # }
//! ```

pub mod command;
pub mod dispatch;
pub mod error;
pub mod inmemory;
pub mod model;
pub mod platform;
pub mod queue;
pub mod reconciler;
pub mod resolver;
pub mod scheduler;

pub use command::Command;
pub use dispatch::{DispatchState, DispatchStats, Dispatcher};
pub use error::{PlatformError, ResolveError};
pub use model::{desired_name, CommunityId, IdentityRecord, Member, MemberId, PLACEHOLDER_TAG};
pub use platform::{Platform, ProfileUpdate, ReadySignal};
pub use queue::{CommandQueue, CommandReceiver};
pub use reconciler::NameReconciler;
pub use resolver::IdentityResolver;
pub use scheduler::{Scheduler, SchedulerHandle, SweepStats, DEFAULT_SWEEP_INTERVAL};
