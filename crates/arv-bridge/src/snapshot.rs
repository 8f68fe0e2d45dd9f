// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cached snapshot of reconciled parameter values.
//!
//! The snapshot is replaced as a whole, never mutated in place: the
//! reconciliation loop builds a complete successor and publishes it with a
//! single atomic pointer swap. Readers take one `load()` per request and see
//! either the previous cycle or the next one, never a mixture.
//!
//! Discipline: exactly one writer (the reconciliation loop), any number of
//! readers.

use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Values produced by one completed reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: HashMap<String, Value>,
    generation: u64,
}

impl Snapshot {
    /// Snapshot holding the pre-reconciliation values.
    pub fn initial(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            generation: 0,
        }
    }

    /// Value of a slot, if the schema declares it.
    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.values.get(slot)
    }

    /// Number of completed cycles that produced this snapshot (0 = initial).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Successor snapshot with `updates` applied on top of this one.
    pub fn successor(&self, updates: HashMap<String, Value>) -> Self {
        let mut values = self.values.clone();
        values.extend(updates);
        Self {
            values,
            generation: self.generation + 1,
        }
    }
}

/// Shared cell publishing the current snapshot.
#[derive(Debug)]
pub struct SnapshotCell {
    current: ArcSwap<Snapshot>,
}

impl SnapshotCell {
    /// Create a cell holding `initial`.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Current snapshot. Cheap, never blocks.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot. Reserved for the reconciliation loop.
    pub(crate) fn publish(&self, next: Snapshot) {
        self.current.store(Arc::new(next));
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}
