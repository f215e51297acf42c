//! Reconciliation triggers.
//!
//! Two independent long-running tasks feed the command queue:
//! - a periodic sweep over the full membership, one member at a time;
//! - a profile-update listener that reconciles each changed member at once.
//!
//! Both wait for the platform to become ready first and share nothing but the
//! queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::platform::{Platform, ProfileUpdate};
use crate::queue::CommandQueue;
use crate::reconciler::NameReconciler;
use crate::resolver::IdentityResolver;

/// Default time between full membership sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Outcome of one membership sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Members reconciled
    pub checked: usize,
    /// Rename commands enqueued
    pub enqueued: usize,
}

/// Reconcile every member the platform reports, in order, enqueueing renames.
///
/// Each member is fully reconciled before the next one starts.
pub async fn sweep(
    platform: &dyn Platform,
    reconciler: &NameReconciler,
    queue: &CommandQueue,
) -> SweepStats {
    info!("Checking nicknames for all users");

    let members = match platform.members().await {
        Ok(members) => members,
        Err(e) => {
            warn!(error = %e, "Failed to list members, skipping sweep");
            return SweepStats::default();
        }
    };

    let mut stats = SweepStats::default();
    for member in &members {
        stats.checked += 1;
        if let Some(command) = reconciler.reconcile(member).await {
            queue.enqueue(command);
            stats.enqueued += 1;
        }
    }

    debug!(checked = stats.checked, enqueued = stats.enqueued, "Sweep finished");
    stats
}

/// Reconcile the post-change snapshot of a profile update.
///
/// Returns whether a rename was enqueued.
pub async fn handle_update(
    update: &ProfileUpdate,
    reconciler: &NameReconciler,
    queue: &CommandQueue,
) -> bool {
    info!(member = %update.after.id, "Checking nickname for user '{}'", update.after.handle);

    match reconciler.reconcile(&update.after).await {
        Some(command) => {
            queue.enqueue(command);
            true
        }
        None => false,
    }
}

/// Owns the two reconciliation triggers.
pub struct Scheduler {
    platform: Arc<dyn Platform>,
    resolver: Arc<dyn IdentityResolver>,
    queue: CommandQueue,
    sweep_interval: Duration,
}

impl Scheduler {
    pub fn new(
        platform: Arc<dyn Platform>,
        resolver: Arc<dyn IdentityResolver>,
        queue: CommandQueue,
    ) -> Self {
        Self {
            platform,
            resolver,
            queue,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override the time between sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Spawn the sweep and profile-update tasks.
    pub fn start(self, updates: mpsc::UnboundedReceiver<ProfileUpdate>) -> SchedulerHandle {
        self.start_with_token(updates, CancellationToken::new())
    }

    /// Spawn both tasks under an externally owned cancellation token.
    pub fn start_with_token(
        self,
        updates: mpsc::UnboundedReceiver<ProfileUpdate>,
        cancel: CancellationToken,
    ) -> SchedulerHandle {
        let sweep_task = tokio::spawn(run_sweeps(
            Arc::clone(&self.platform),
            Arc::clone(&self.resolver),
            self.queue.clone(),
            self.sweep_interval,
            cancel.clone(),
        ));

        let update_task = tokio::spawn(run_updates(
            Arc::clone(&self.platform),
            Arc::clone(&self.resolver),
            self.queue,
            updates,
            cancel.clone(),
        ));

        SchedulerHandle {
            cancel,
            tasks: vec![sweep_task, update_task],
        }
    }
}

/// Waits for readiness, then builds a reconciler that skips the bot account.
async fn ready_reconciler(
    platform: &dyn Platform,
    resolver: Arc<dyn IdentityResolver>,
    cancel: &CancellationToken,
) -> Option<NameReconciler> {
    let ready = tokio::select! {
        _ = cancel.cancelled() => return None,
        ready = platform.wait_until_ready() => ready,
    };

    match ready {
        Ok(bot_id) => Some(NameReconciler::new(resolver, bot_id)),
        Err(e) => {
            info!(error = %e, "Platform never became ready");
            None
        }
    }
}

async fn run_sweeps(
    platform: Arc<dyn Platform>,
    resolver: Arc<dyn IdentityResolver>,
    queue: CommandQueue,
    interval: Duration,
    cancel: CancellationToken,
) {
    let Some(reconciler) = ready_reconciler(platform.as_ref(), resolver, &cancel).await else {
        return;
    };

    // First tick completes immediately: sweep once on startup.
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if platform.is_closed() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sweep(platform.as_ref(), &reconciler, &queue) => {}
        }
    }

    debug!("Sweep task stopped");
}

async fn run_updates(
    platform: Arc<dyn Platform>,
    resolver: Arc<dyn IdentityResolver>,
    queue: CommandQueue,
    mut updates: mpsc::UnboundedReceiver<ProfileUpdate>,
    cancel: CancellationToken,
) {
    let Some(reconciler) = ready_reconciler(platform.as_ref(), resolver, &cancel).await else {
        return;
    };

    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = handle_update(&update, &reconciler, &queue) => {}
        }
    }

    debug!("Profile update task stopped");
}

/// Running scheduler: shut down and wait for its tasks.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for task in tasks {
            if let Err(e) = task.await {
                error!("Scheduler task failed: {}", e);
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::inmemory::{InMemoryPlatform, InMemoryResolver};
    use crate::model::{CommunityId, IdentityRecord, Member, MemberId};

    const BOT: MemberId = MemberId(1);

    fn member(id: u64, handle: &str, display_name: Option<&str>) -> Member {
        Member::new(
            MemberId(id),
            CommunityId(100),
            handle,
            display_name.map(str::to_string),
        )
    }

    fn fixture() -> (InMemoryPlatform, InMemoryResolver) {
        let platform = InMemoryPlatform::new();
        platform.add_member(member(1, "nicksync", None));
        platform.add_member(member(2, "Alice", None));
        platform.add_member(member(3, "broken", None));
        platform.add_member(member(4, "Bob", Some("[XYZ] Bob Smith")));

        let resolver = InMemoryResolver::new();
        resolver.fail_for(MemberId(3));
        resolver.insert(MemberId(4), IdentityRecord::new("XYZ", "Bob Smith"));
        (platform, resolver)
    }

    async fn drain(rx: &mut crate::queue::CommandReceiver) -> Vec<Command> {
        let mut out = Vec::new();
        while !rx.is_empty() {
            out.push(rx.dequeue().await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn sweep_isolates_failures_and_skips_bot() {
        let (platform, resolver) = fixture();
        let reconciler = NameReconciler::new(Arc::new(resolver), BOT);
        let (queue, mut rx) = CommandQueue::new();

        let stats = sweep(&platform, &reconciler, &queue).await;
        assert_eq!(stats, SweepStats { checked: 4, enqueued: 1 });

        let commands = drain(&mut rx).await;
        assert_eq!(
            commands,
            vec![Command::rename(member(2, "Alice", None), "[-----] Alice")]
        );
    }

    #[tokio::test]
    async fn sweep_on_closed_platform_does_nothing() {
        let (platform, resolver) = fixture();
        platform.close();
        let reconciler = NameReconciler::new(Arc::new(resolver), BOT);
        let (queue, _rx) = CommandQueue::new();

        assert_eq!(sweep(&platform, &reconciler, &queue).await, SweepStats::default());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn update_reconciles_after_snapshot() {
        let (_, resolver) = fixture();
        let reconciler = NameReconciler::new(Arc::new(resolver), BOT);
        let (queue, mut rx) = CommandQueue::new();

        let update = ProfileUpdate {
            before: Some(member(4, "Bob", Some("[XYZ] Bob Smith"))),
            after: member(4, "Bob", Some("Bobby")),
        };
        assert!(handle_update(&update, &reconciler, &queue).await);

        let commands = drain(&mut rx).await;
        assert_eq!(
            commands,
            vec![Command::rename(member(4, "Bob", Some("Bobby")), "[XYZ] Bob Smith")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_waits_for_ready_then_sweeps_periodically() {
        let (platform, resolver) = fixture();
        let (queue, mut rx) = CommandQueue::new();
        let (_updates_tx, updates_rx) = mpsc::unbounded_channel();

        let handle = Scheduler::new(Arc::new(platform.clone()), Arc::new(resolver.clone()), queue.clone())
            .with_sweep_interval(Duration::from_secs(60))
            .start(updates_rx);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(resolver.lookups(), 0);

        platform.mark_ready(BOT);
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queue.len(), 1);

        // Nothing drains the queue, so the next sweep enqueues Alice again.
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(queue.len(), 2);

        handle.shutdown();
        handle.join().await;

        let commands = drain(&mut rx).await;
        assert!(commands.iter().all(|c| c.target().id == MemberId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_forwards_profile_updates() {
        let (platform, resolver) = fixture();
        let (queue, mut rx) = CommandQueue::new();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let handle = Scheduler::new(Arc::new(platform.clone()), Arc::new(resolver), queue)
            .with_sweep_interval(Duration::from_secs(3600))
            .start(updates_rx);

        // Queued before ready; handled once the platform is ready.
        updates_tx
            .send(ProfileUpdate {
                before: None,
                after: member(4, "Bob", None),
            })
            .unwrap();
        platform.mark_ready(BOT);

        time::sleep(Duration::from_secs(1)).await;
        handle.shutdown();
        handle.join().await;

        let renamed: Vec<_> = drain(&mut rx)
            .await
            .into_iter()
            .map(|c| c.target().id)
            .collect();
        assert!(renamed.contains(&MemberId(2)));
        assert!(renamed.contains(&MemberId(4)));
        assert_eq!(renamed.len(), 2);
    }

    #[tokio::test]
    async fn join_waits_for_every_task_when_one_panics() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let handle = SchedulerHandle {
            cancel: CancellationToken::new(),
            tasks: vec![
                tokio::spawn(async { panic!("sweep task crashed") }),
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                }),
            ],
        };

        handle.join().await;
        assert!(finished.load(std::sync::atomic::Ordering::SeqCst));
    }
}
