//! Frame change tracking -- added/updated accumulators and the deferred
//! removal queue.
//!
//! The registry records object lifecycle events here between flushes. The
//! tracker keeps added and updated ids in insertion order with O(1)
//! membership, queues removals FIFO, and releases removal batches only when
//! the queue reaches the configured quota or the flush interval has elapsed
//! with work pending. Batching delays reporting, never drops it: everything
//! queued is eventually handed back.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use kiln_payload::snapshot::PayloadSnapshot;

use crate::object::{ObjectId, SceneObject};

// ---------------------------------------------------------------------------
// Renderer-facing output
// ---------------------------------------------------------------------------

/// One object as handed to the renderer: a clone of the current state plus
/// the frozen custom payload, aliasing nothing mutable.
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub object: SceneObject,
    /// Frozen custom payload, `None` when the object carries none.
    pub custom: Option<PayloadSnapshot>,
}

/// The per-frame diff produced by `flush_changes`.
///
/// The three sets are mutually exclusive. Renderers apply `added`, then
/// `updated`, then `removed`; `removed` may name ids never seen as added
/// (objects that lived less than one reporting window), which consumers
/// treat as no-ops.
#[derive(Debug, Clone, Default)]
pub struct FrameChanges {
    pub added: Vec<RenderObject>,
    pub updated: Vec<RenderObject>,
    pub removed: Vec<ObjectId>,
}

impl FrameChanges {
    /// True when the frame carries no work for the renderer.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Counters for the most recent flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushDiagnostics {
    /// Objects reported added.
    pub added: usize,
    /// Objects reported updated.
    pub updated: usize,
    /// Ids reported removed.
    pub removed: usize,
    /// Removals still queued after the flush.
    pub pending_removals: usize,
    /// Size of the structural removal batch this flush processed.
    pub removal_batch: usize,
    /// Wall-clock time spent inside `flush_changes`.
    pub flush_time: Duration,
}

// ---------------------------------------------------------------------------
// Id sets
// ---------------------------------------------------------------------------

/// Insertion-ordered id set with O(1) membership.
#[derive(Debug, Default)]
struct OrderedIdSet {
    order: Vec<ObjectId>,
    members: HashSet<ObjectId>,
}

impl OrderedIdSet {
    fn insert(&mut self, id: ObjectId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    fn contains(&self, id: &ObjectId) -> bool {
        self.members.contains(id)
    }

    /// Drains the set, yielding ids in insertion order.
    fn take(&mut self) -> Vec<ObjectId> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

/// FIFO removal queue with O(1) membership.
#[derive(Debug, Default)]
struct PendingRemovals {
    queue: VecDeque<ObjectId>,
    members: HashSet<ObjectId>,
}

impl PendingRemovals {
    fn push(&mut self, id: ObjectId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.queue.push_back(id);
        true
    }

    fn pop(&mut self) -> Option<ObjectId> {
        let id = self.queue.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    fn contains(&self, id: &ObjectId) -> bool {
        self.members.contains(id)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.members.clear();
    }
}

// ---------------------------------------------------------------------------
// Change tracker
// ---------------------------------------------------------------------------

/// Accumulates lifecycle events between flushes and paces structural
/// removals.
///
/// Time is always passed in by the caller, so the removal gate is testable
/// without sleeping.
#[derive(Debug)]
pub(crate) struct ChangeTracker {
    added: OrderedIdSet,
    updated: OrderedIdSet,
    /// Ids structurally deleted outside the batch path (`clear`), awaiting
    /// their removed report.
    finalized: Vec<ObjectId>,
    pending: PendingRemovals,
    last_removal_flush: Instant,
    removal_quota: usize,
    removal_flush_interval: Duration,
}

impl ChangeTracker {
    pub(crate) fn new(removal_quota: usize, removal_flush_interval: Duration, now: Instant) -> Self {
        ChangeTracker {
            added: OrderedIdSet::default(),
            updated: OrderedIdSet::default(),
            finalized: Vec::new(),
            pending: PendingRemovals::default(),
            last_removal_flush: now,
            removal_quota,
            removal_flush_interval,
        }
    }

    pub(crate) fn record_added(&mut self, id: ObjectId) {
        self.added.insert(id);
    }

    /// Records an update. Objects added this frame stay classified as
    /// added, so the two sets never overlap.
    pub(crate) fn record_updated(&mut self, id: ObjectId) {
        if self.added.contains(&id) {
            return;
        }
        self.updated.insert(id);
    }

    pub(crate) fn is_pending_removal(&self, id: &ObjectId) -> bool {
        self.pending.contains(id)
    }

    /// Queues an id for deferred structural removal. Returns false when the
    /// id is already queued.
    pub(crate) fn queue_removal(&mut self, id: ObjectId) -> bool {
        self.pending.push(id)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Releases the next structural removal batch, or an empty vec when the
    /// gate does not trigger.
    ///
    /// The gate: pending count reached the quota, or the flush interval has
    /// elapsed since the last processed batch and at least one removal is
    /// pending. At most `removal_quota` ids are dequeued FIFO; the
    /// remainder stays queued. Idle time counts toward the interval, so a
    /// removal queued after a long quiet period is released at the next
    /// flush.
    pub(crate) fn take_removal_batch(&mut self, now: Instant) -> Vec<ObjectId> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let quota_reached = self.pending.len() >= self.removal_quota;
        let interval_elapsed =
            now.duration_since(self.last_removal_flush) >= self.removal_flush_interval;
        if !quota_reached && !interval_elapsed {
            return Vec::new();
        }

        let take = self.pending.len().min(self.removal_quota);
        let mut batch = Vec::with_capacity(take);
        for _ in 0..take {
            match self.pending.pop() {
                Some(id) => batch.push(id),
                None => break,
            }
        }
        self.last_removal_flush = now;
        tracing::debug!(
            count = batch.len(),
            remaining = self.pending.len(),
            "processed removal batch"
        );
        batch
    }

    /// Drains the added set in insertion order.
    pub(crate) fn take_added(&mut self) -> Vec<ObjectId> {
        self.added.take()
    }

    /// Drains the updated set in insertion order.
    pub(crate) fn take_updated(&mut self) -> Vec<ObjectId> {
        self.updated.take()
    }

    /// Drains ids finalized outside the batch path.
    pub(crate) fn take_finalized(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.finalized)
    }

    /// Wipes the frame accumulators and the pending queue, recording `ids`
    /// as finalized removals to report at the next flush. Used by `clear`,
    /// which deletes structurally on the spot instead of batching.
    pub(crate) fn reset_for_clear(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.added.clear();
        self.updated.clear();
        self.pending.clear();
        self.finalized.extend(ids);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
