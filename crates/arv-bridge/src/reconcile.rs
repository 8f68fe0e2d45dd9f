// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background reconciliation of the cached snapshot.
//!
//! ```text
//!   Idle --interval--> Polling --publish/skip/fail--> Idle
//!     \                                                 |
//!      `------------------ stop() ------------------> Stopped
//! ```
//!
//! Each cycle queries every source document once, extracts every declared
//! slot, and publishes a complete successor snapshot. A cycle that fails
//! anywhere publishes nothing: the previous snapshot stays in place and the
//! next interval is the only retry.

use crate::backend::BackendBindings;
use crate::error::{BackendError, BridgeError};
use crate::path::{self, Key};
use crate::snapshot::SnapshotCell;
use crate::store::Source;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Namespace every source document is pulled from.
const SOURCE_NAMESPACE: &str = "fp";

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Polling,
    Stopped,
}

impl LoopState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Polling,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Polling => 1,
            Self::Stopped => 2,
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A new snapshot was published.
    Applied,
    /// No source backend registered; nothing to do.
    Skipped,
    /// The cycle failed; the previous snapshot is untouched.
    Failed(String),
}

/// One source document and the slots extracted from it.
#[derive(Debug, Clone)]
struct DocumentPlan {
    request: String,
    slots: Vec<(String, Vec<Key>)>,
}

/// Query plan derived from the schema: one query per distinct document.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    documents: Vec<DocumentPlan>,
}

impl Plan {
    /// Group `sources` by the document they resolve to.
    pub fn from_sources(sources: &[Source]) -> Self {
        let mut documents: Vec<DocumentPlan> = Vec::new();
        for source in sources {
            let request = source.resolved.backend_request();
            let slot = (source.slot.clone(), source.resolved.keys.clone());
            match documents.iter_mut().find(|doc| doc.request == request) {
                Some(doc) => doc.slots.push(slot),
                None => documents.push(DocumentPlan {
                    request: request.to_string(),
                    slots: vec![slot],
                }),
            }
        }
        Self { documents }
    }

    /// Backend-relative requests issued per cycle, in order.
    pub fn requests(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.request.as_str()).collect()
    }

    /// Number of slots refreshed per cycle.
    pub fn slot_count(&self) -> usize {
        self.documents.iter().map(|d| d.slots.len()).sum()
    }
}

/// Run one reconciliation cycle.
pub fn run_cycle(plan: &Plan, bindings: &BackendBindings, cell: &SnapshotCell) -> CycleOutcome {
    let Some(backend) = bindings.get(SOURCE_NAMESPACE) else {
        return CycleOutcome::Skipped;
    };

    let collect = || -> Result<HashMap<String, Value>, BridgeError> {
        let mut updates = HashMap::with_capacity(plan.slot_count());
        for document in &plan.documents {
            let body = backend.query(&document.request)?;
            for (slot, keys) in &document.slots {
                let value = path::extract(&body, keys).map_err(|e| {
                    BridgeError::Backend(BackendError::Malformed(format!(
                        "{} in '{}': {}",
                        slot, document.request, e
                    )))
                })?;
                updates.insert(slot.clone(), value.clone());
            }
        }
        Ok(updates)
    };

    match collect() {
        Ok(updates) => {
            let next = cell.load().successor(updates);
            cell.publish(next);
            CycleOutcome::Applied
        }
        Err(e) => CycleOutcome::Failed(e.to_string()),
    }
}

/// Cycle counters.
#[derive(Debug, Default)]
pub struct ReconcileStats {
    pub cycles_applied: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub cycles_skipped: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl ReconcileStats {
    fn record(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Applied => {
                self.cycles_applied.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::Skipped => {
                self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::Failed(message) => {
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock() = Some(message.clone());
            }
        }
    }
}

/// Point-in-time view of the loop, reported under `sys/reconciler`.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileStatsSnapshot {
    pub state: LoopState,
    pub cycles_applied: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Progress {
    started: u64,
    completed: u64,
}

struct Shared {
    running: AtomicBool,
    state: AtomicU8,
    progress: Mutex<Progress>,
    /// Signalled on stop to cut the interval sleep short.
    wake: Condvar,
    /// Signalled after every cycle and on stop.
    cycle_done: Condvar,
    stats: ReconcileStats,
}

impl Shared {
    fn set_state(&self, state: LoopState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Handle to the running reconciliation thread. Stops it on drop.
pub struct Reconciler {
    shared: Arc<Shared>,
    interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Reconciler {
    /// Start the loop. The first cycle runs one interval after start.
    pub fn spawn(
        plan: Plan,
        bindings: Arc<BackendBindings>,
        cell: Arc<SnapshotCell>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            state: AtomicU8::new(LoopState::Idle.as_u8()),
            progress: Mutex::new(Progress::default()),
            wake: Condvar::new(),
            cycle_done: Condvar::new(),
            stats: ReconcileStats::default(),
        });

        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("arv-reconcile".to_string())
            .spawn(move || {
                tracing::info!(
                    "Reconciliation started: {} documents, {} slots, every {:?}",
                    plan.requests().len(),
                    plan.slot_count(),
                    interval
                );
                run_loop(&worker, &plan, &bindings, &cell, interval);
                tracing::info!("Reconciliation stopped");
            })?;

        Ok(Self {
            shared,
            interval,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// True until `stop()` has been called.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Block until a cycle that starts after this call has completed, or
    /// until `timeout`. Returns false on timeout or if the loop stopped.
    pub fn wait_for_cycle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut progress = self.shared.progress.lock();
        let target = progress.started + 1;
        while progress.completed < target {
            if !self.is_running() {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .cycle_done
                        .wait_until(&mut progress, deadline)
                        .timed_out()
                    {
                        return progress.completed >= target;
                    }
                }
                // Too far out to represent: wait without a deadline.
                None => self.shared.cycle_done.wait(&mut progress),
            }
        }
        true
    }

    /// Counters and state.
    pub fn stats(&self) -> ReconcileStatsSnapshot {
        let stats = &self.shared.stats;
        ReconcileStatsSnapshot {
            state: self.state(),
            cycles_applied: stats.cycles_applied.load(Ordering::Relaxed),
            cycles_failed: stats.cycles_failed.load(Ordering::Relaxed),
            cycles_skipped: stats.cycles_skipped.load(Ordering::Relaxed),
            last_error: stats.last_error.lock().clone(),
        }
    }

    /// Stop the loop and join the thread. No cycle starts after this
    /// returns. Idempotent.
    pub fn stop(&self) {
        {
            let _progress = self.shared.progress.lock();
            self.shared.running.store(false, Ordering::Release);
            self.shared.wake.notify_all();
            self.shared.cycle_done.notify_all();
        }
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Reconciliation thread panicked");
            }
        }
        self.shared.set_state(LoopState::Stopped);
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    shared: &Shared,
    plan: &Plan,
    bindings: &BackendBindings,
    cell: &SnapshotCell,
    interval: Duration,
) {
    loop {
        {
            let mut progress = shared.progress.lock();
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            let _ = shared.wake.wait_for(&mut progress, interval);
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            progress.started += 1;
        }

        shared.set_state(LoopState::Polling);
        let outcome = run_cycle(plan, bindings, cell);
        match &outcome {
            CycleOutcome::Applied => {
                tracing::trace!("Snapshot generation {}", cell.load().generation())
            }
            CycleOutcome::Skipped => {}
            CycleOutcome::Failed(message) => {
                tracing::error!("Reconciliation cycle failed: {}", message)
            }
        }
        shared.stats.record(&outcome);
        shared.set_state(LoopState::Idle);

        let mut progress = shared.progress.lock();
        progress.completed += 1;
        shared.cycle_done.notify_all();
    }
    shared.set_state(LoopState::Stopped);
}
