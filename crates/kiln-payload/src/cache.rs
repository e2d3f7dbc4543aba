//! Keyed diff-and-clone cache for custom payloads.
//!
//! Each entry pairs a mutable *working clone* (exclusively owned by the
//! cache, allocations reused across merges) with a lazily rebuilt *frozen
//! snapshot* (immutable, safe to hand out). A content version ties the two
//! together: [`PayloadCache::apply`] bumps it whenever a merge actually
//! changed something, and [`PayloadCache::snapshot`] rebuilds the frozen
//! tree only when its recorded version no longer matches. The stale
//! snapshot is kept as the seed for structural sharing, so a rebuild
//! allocates new nodes only along changed paths.
//!
//! Snapshot reads go through a [`RefCell`], so the cache is `Send` but not
//! `Sync`; that matches the engine's single-writer, tick-driven model.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;

use crate::merge::{clone_capped, merge_value};
use crate::snapshot::{freeze_value, PayloadSnapshot};
use crate::value::PayloadValue;

// ---------------------------------------------------------------------------
// PayloadCache
// ---------------------------------------------------------------------------

/// Structural diff-and-clone cache, generic over the entry key.
#[derive(Debug)]
pub struct PayloadCache<K> {
    entries: HashMap<K, CacheEntry>,
}

impl<K> Default for PayloadCache<K> {
    fn default() -> Self {
        PayloadCache {
            entries: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    /// Mutable working clone; never escapes the cache.
    working: PayloadValue,
    /// Bumped on every detected content change. Starts at 1.
    version: u64,
    /// Lazily rebuilt frozen view of `working`.
    frozen: RefCell<FrozenSlot>,
}

#[derive(Debug, Default)]
struct FrozenSlot {
    /// Last frozen snapshot; stale generations seed structural sharing.
    snapshot: Option<PayloadSnapshot>,
    /// Content version `snapshot` reflects. 0 means never frozen.
    version: u64,
}

impl<K: Eq + Hash + Clone> PayloadCache<K> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        PayloadCache {
            entries: HashMap::new(),
        }
    }

    /// Merges `source` into the entry for `key`, creating it if absent.
    ///
    /// Returns whether content actually changed. The source is copied
    /// structurally; the caller keeps ownership and no reference to it is
    /// retained. Creating an entry always counts as a change.
    pub fn apply(&mut self, key: &K, source: &PayloadValue) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                let changed = merge_value(&mut entry.working, source, 0);
                if changed {
                    entry.version = entry.version.wrapping_add(1);
                }
                changed
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        working: clone_capped(source, 0),
                        version: 1,
                        frozen: RefCell::new(FrozenSlot::default()),
                    },
                );
                true
            }
        }
    }

    /// Returns the frozen snapshot for `key`, rebuilding it only if content
    /// changed since the last read.
    ///
    /// Repeated reads without intervening change return the identical
    /// handle; after a change, unchanged subtrees of the new snapshot are
    /// still the previous allocations.
    pub fn snapshot(&self, key: &K) -> Option<PayloadSnapshot> {
        let entry = self.entries.get(key)?;
        let mut frozen = entry.frozen.borrow_mut();
        if frozen.version != entry.version || frozen.snapshot.is_none() {
            let (snapshot, _) = freeze_value(&entry.working, frozen.snapshot.as_ref());
            frozen.snapshot = Some(snapshot);
            frozen.version = entry.version;
        }
        frozen.snapshot.clone()
    }

    /// Content version for `key`, if an entry exists. Monotonically
    /// increasing per entry; equal versions imply equal content.
    pub fn version(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.version)
    }

    /// Drops the entry for `key`. Returns whether one existed.
    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when an entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
