//! Immutable snapshots and the per-kind store that holds the current one.
//!
//! A [`Snapshot`] is captured from one successful fetch and never mutated
//! afterwards; cloning it is a reference-count bump. A [`SnapshotStore`] holds
//! exactly one current snapshot and replaces it wholesale on [`SnapshotStore::swap`].
//! Readers always observe either the pre-swap or the post-swap value.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Record, Timestamp};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The complete set of records of one kind as observed at one poll.
#[derive(Debug)]
pub struct Snapshot<T> {
    records: Arc<[T]>,
    captured_at: Option<Timestamp>,
}

// Manual impl: cloning shares the record slice and must not require `T: Clone`.
impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            captured_at: self.captured_at,
        }
    }
}

impl<T: Record> Snapshot<T> {
    /// The snapshot held before any successful fetch: no records, no capture time.
    pub fn empty() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            captured_at: None,
        }
    }

    /// Captures fetched records as a new snapshot stamped with the current time.
    ///
    /// Duplicate keys are collapsed last-seen-wins; the surviving record keeps
    /// the position of the key's first occurrence.
    pub fn capture(records: Vec<T>) -> Self {
        Self::capture_at(records, Timestamp::now())
    }

    /// Same as [`Snapshot::capture`] with an explicit capture time.
    pub fn capture_at(records: Vec<T>, captured_at: Timestamp) -> Self {
        let mut position: HashMap<T::Key, usize> = HashMap::with_capacity(records.len());
        let mut unique: Vec<T> = Vec::with_capacity(records.len());
        for record in records {
            match position.get(record.key()) {
                Some(&index) => unique[index] = record,
                None => {
                    position.insert(record.key().clone(), unique.len());
                    unique.push(record);
                }
            }
        }
        Self {
            records: Arc::from(unique),
            captured_at: Some(captured_at),
        }
    }

    /// Returns the records in fetch order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Iterates over the records in fetch order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns when the snapshot was captured, or `None` for the initial empty
    /// snapshot that no fetch has replaced yet.
    pub fn captured_at(&self) -> Option<Timestamp> {
        self.captured_at
    }

    /// Returns `true` if this snapshot came from a successful fetch.
    pub fn is_primed(&self) -> bool {
        self.captured_at.is_some()
    }

    /// Returns up to `n` of the most recently fetched records, oldest first.
    pub fn latest(&self, n: usize) -> &[T] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Returns `true` if both snapshots share the same backing allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

/// Holds the current [`Snapshot`] of one resource kind.
///
/// There is one writer per store (the kind's cycle runner) and any number of
/// readers. The lock is only held for a reference-count bump, so `read` never
/// waits on a fetch.
#[derive(Debug)]
pub struct SnapshotStore<T> {
    current: RwLock<Snapshot<T>>,
}

impl<T: Record> SnapshotStore<T> {
    /// Creates a store holding [`Snapshot::empty`].
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Snapshot::empty()),
        }
    }

    /// Returns the most recently swapped-in snapshot.
    pub fn read(&self) -> Snapshot<T> {
        // A panic while holding the lock cannot leave a torn snapshot behind:
        // the guarded value is only ever replaced whole.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current snapshot and returns the one it replaced.
    ///
    /// The returned value is the "old" side of the diff for this swap.
    pub fn swap(&self, next: Snapshot<T>) -> Snapshot<T> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl<T: Record> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
