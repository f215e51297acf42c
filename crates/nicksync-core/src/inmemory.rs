//! In-memory collaborators.
//!
//! Lightweight [`IdentityResolver`] and [`Platform`] implementations backed by
//! process memory, for tests, demos and local development.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{PlatformError, ResolveError};
use crate::model::{IdentityRecord, Member, MemberId};
use crate::platform::{Platform, ReadySignal};
use crate::resolver::IdentityResolver;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct ResolverState {
    records: HashMap<MemberId, IdentityRecord>,
    failing: HashSet<MemberId>,
    lookups: usize,
}

/// Identity store held in a map.
#[derive(Clone, Default)]
pub struct InMemoryResolver {
    state: Arc<Mutex<ResolverState>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record` for `member`.
    pub fn insert(&self, member: MemberId, record: IdentityRecord) {
        lock(&self.state).records.insert(member, record);
    }

    /// Make every lookup for `member` fail with a query error.
    pub fn fail_for(&self, member: MemberId) {
        lock(&self.state).failing.insert(member);
    }

    /// Number of lookups served so far.
    pub fn lookups(&self) -> usize {
        lock(&self.state).lookups
    }
}

#[async_trait]
impl IdentityResolver for InMemoryResolver {
    async fn resolve(&self, member: MemberId) -> Result<Option<IdentityRecord>, ResolveError> {
        let mut state = lock(&self.state);
        state.lookups += 1;
        if state.failing.contains(&member) {
            return Err(ResolveError::Query(format!("lookup for {} failed", member)));
        }
        Ok(state.records.get(&member).cloned())
    }
}

/// A rename call observed by [`InMemoryPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCall {
    pub member: MemberId,
    pub new_name: String,
    pub started: Instant,
    pub finished: Instant,
    pub succeeded: bool,
}

#[derive(Default)]
struct PlatformState {
    members: Vec<Member>,
    failing: HashSet<MemberId>,
    calls: Vec<RenameCall>,
}

/// Platform that keeps its membership in memory and records every rename.
///
/// Successful renames update the stored member, so later snapshots reflect them.
#[derive(Clone, Default)]
pub struct InMemoryPlatform {
    ready: ReadySignal,
    latency: Duration,
    state: Arc<Mutex<PlatformState>>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each rename call take `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Add or replace a member.
    pub fn add_member(&self, member: Member) {
        let mut state = lock(&self.state);
        state.members.retain(|m| m.id != member.id);
        state.members.push(member);
    }

    /// Current snapshot of `id`, if known.
    pub fn member(&self, id: MemberId) -> Option<Member> {
        lock(&self.state).members.iter().find(|m| m.id == id).cloned()
    }

    /// Make renames of `member` fail.
    pub fn fail_renames_for(&self, member: MemberId) {
        lock(&self.state).failing.insert(member);
    }

    /// Complete the handshake as account `bot_id`.
    pub fn mark_ready(&self, bot_id: MemberId) {
        self.ready.set_ready(bot_id);
    }

    /// Close the connection.
    pub fn close(&self) {
        self.ready.set_closed();
    }

    /// Rename calls issued so far, in call order.
    pub fn calls(&self) -> Vec<RenameCall> {
        lock(&self.state).calls.clone()
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn wait_until_ready(&self) -> Result<MemberId, PlatformError> {
        self.ready.wait().await
    }

    async fn members(&self) -> Result<Vec<Member>, PlatformError> {
        if self.ready.is_closed() {
            return Err(PlatformError::Closed);
        }
        Ok(lock(&self.state).members.clone())
    }

    async fn change_display_name(
        &self,
        member: &Member,
        new_name: &str,
    ) -> Result<(), PlatformError> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = lock(&self.state);
        let succeeded = !state.failing.contains(&member.id);
        state.calls.push(RenameCall {
            member: member.id,
            new_name: new_name.to_string(),
            started,
            finished: Instant::now(),
            succeeded,
        });

        if !succeeded {
            return Err(PlatformError::Rejected(format!(
                "missing permission to rename {}",
                member.id
            )));
        }

        if let Some(stored) = state.members.iter_mut().find(|m| m.id == member.id) {
            stored.display_name = Some(new_name.to_string());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.ready.is_closed()
    }
}
