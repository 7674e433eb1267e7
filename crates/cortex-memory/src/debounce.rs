// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session debounce scheduling for ingestion runs.
//!
//! A burst of triggers for the same `(session, channel)` key collapses into a
//! single run, scheduled from the last trigger. Only a task still waiting out
//! its delay can be cancelled; once claimed it runs to completion, and a
//! later run for the same key waits for it to finish.
//!
//! The scheduler owns its tasks through a [`TaskTracker`] so the server can
//! cancel everything pending and await in-flight runs on shutdown.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::metrics;

/// Registry key: one live debounced task per session and channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub session_id: String,
    pub channel: Option<String>,
}

impl DebounceKey {
    pub fn new(session_id: impl Into<String>, channel: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            channel,
        }
    }
}

impl fmt::Display for DebounceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.session_id, self.channel.as_deref().unwrap_or(""))
    }
}

/// Lifecycle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting out its delay; the only cancellable state.
    Pending,
    /// Claimed for execution. Not interruptible.
    Running,
    Cancelled,
    Completed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::Completed)
    }
}

/// Observer for a scheduled task's state.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    state: watch::Receiver<TaskState>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Waits until the task is cancelled or completed.
    ///
    /// If the task is dropped without reaching a terminal state (runtime
    /// shutdown, panic in the work), the last observed state is returned.
    pub async fn wait(&mut self) -> TaskState {
        let terminal = self.state.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        terminal.unwrap_or_else(|_| *self.state.borrow())
    }
}

struct Pending {
    id: u64,
    cancel: CancellationToken,
    state: Arc<watch::Sender<TaskState>>,
}

impl Pending {
    fn cancel(self) {
        self.cancel.cancel();
        self.state.send_replace(TaskState::Cancelled);
        metrics::record_debounce_cancelled();
    }
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    /// Claimed runs, including those still waiting on the gate.
    running: usize,
    /// Serializes runs for one key.
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.pending.is_none() && self.running == 0
    }
}

type Registry = HashMap<DebounceKey, Slot>;

struct Inner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_handle(&self, initial: TaskState) -> (u64, Arc<watch::Sender<TaskState>>, TaskHandle) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(initial);
        (id, Arc::new(tx), TaskHandle { id, state: rx })
    }

    /// Moves task `id` from pending to running if it is still the key's pending task.
    fn claim(self: &Arc<Self>, key: &DebounceKey, id: u64) -> Option<RunGuard> {
        let mut registry = self.lock();
        let slot = registry.get_mut(key)?;
        if slot.pending.as_ref().map(|p| p.id) != Some(id) {
            return None;
        }
        let pending = slot.pending.take()?;
        slot.running += 1;
        pending.state.send_replace(TaskState::Running);
        Some(RunGuard {
            inner: Arc::clone(self),
            key: key.clone(),
        })
    }

    /// Called by a task woken through its cancellation token.
    fn abandon(&self, key: &DebounceKey, id: u64) {
        let mut registry = self.lock();
        let Some(slot) = registry.get_mut(key) else {
            return;
        };
        if slot.pending.as_ref().map(|p| p.id) == Some(id) {
            if let Some(pending) = slot.pending.take() {
                pending.cancel();
            }
        }
        if slot.is_idle() {
            registry.remove(key);
        }
    }
}

/// Releases a claimed run's registration when the run ends, even on panic.
struct RunGuard {
    inner: Arc<Inner>,
    key: DebounceKey,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut registry = self.inner.lock();
        if let Some(slot) = registry.get_mut(&self.key) {
            slot.running = slot.running.saturating_sub(1);
            if slot.is_idle() {
                registry.remove(&self.key);
            }
        }
    }
}

/// Owned debounce scheduler. Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct DebounceScheduler {
    inner: Arc<Inner>,
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Schedules `work` to run after `delay`, replacing any pending task for `key`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger<F>(&self, key: DebounceKey, delay: Duration, work: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (id, state, handle) = self.inner.next_handle(TaskState::Pending);
        let cancel = self.inner.shutdown.child_token();

        let gate = {
            let mut registry = self.inner.lock();
            let slot = registry.entry(key.clone()).or_default();
            if let Some(previous) = slot.pending.take() {
                debug!(key = %key, task = previous.id, "superseding pending task");
                previous.cancel();
            }
            slot.pending = Some(Pending {
                id,
                cancel: cancel.clone(),
                state: Arc::clone(&state),
            });
            Arc::clone(&slot.gate)
        };

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    inner.abandon(&key, id);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(guard) = inner.claim(&key, id) else {
                return;
            };
            let permit = gate.lock().await;
            debug!(key = %key, task = id, "running debounced task");
            work.await;
            drop(permit);
            drop(guard);
            state.send_replace(TaskState::Completed);
        });

        handle
    }

    /// Runs `work` immediately in the background, bypassing the key registry.
    pub fn spawn_now<F>(&self, work: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (_, state, handle) = self.inner.next_handle(TaskState::Running);
        self.inner.tracker.spawn(async move {
            work.await;
            state.send_replace(TaskState::Completed);
        });
        handle
    }

    /// Cancels the pending task for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &DebounceKey) -> bool {
        let mut registry = self.inner.lock();
        let Some(slot) = registry.get_mut(key) else {
            return false;
        };
        let cancelled = match slot.pending.take() {
            Some(pending) => {
                pending.cancel();
                true
            }
            None => false,
        };
        if slot.is_idle() {
            registry.remove(key);
        }
        cancelled
    }

    /// Whether `key` has a task waiting out its delay.
    pub fn is_pending(&self, key: &DebounceKey) -> bool {
        self.inner
            .lock()
            .get(key)
            .is_some_and(|slot| slot.pending.is_some())
    }

    /// Whether `key` has any pending or running task.
    pub fn is_registered(&self, key: &DebounceKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn registered_keys(&self) -> Vec<DebounceKey> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Cancels every pending task and waits for running ones to finish.
    pub async fn shutdown(&self) {
        let pending = self
            .inner
            .lock()
            .values()
            .filter(|slot| slot.pending.is_some())
            .count();
        info!(pending, "shutting down debounce scheduler");
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}
