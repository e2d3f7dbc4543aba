//! Frozen payload snapshots -- immutable trees with structural sharing.
//!
//! A [`PayloadSnapshot`] is a cheap-to-clone handle to an immutable payload
//! tree. Immutability is a property of the type: there is no mutable access,
//! so a snapshot handed to a renderer can be retained across frames without
//! aliasing anything the simulation might write to.
//!
//! Snapshots are produced by freezing a working [`PayloadValue`] against the
//! previously frozen snapshot. Every subtree whose content did not change
//! comes back as the previous allocation, so consumers detect change at any
//! depth with a pointer comparison ([`PayloadSnapshot::ptr_eq`]): across two
//! reads, an untouched sibling of a mutated leaf is literally the same node.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::PayloadValue;

// ---------------------------------------------------------------------------
// PayloadSnapshot
// ---------------------------------------------------------------------------

/// Shared handle to an immutable payload tree node.
///
/// Cloning is an `Arc` clone. Equality compares content, with a pointer
/// fast path for shared nodes.
#[derive(Debug, Clone)]
pub struct PayloadSnapshot(Arc<SnapshotValue>);

/// A node of a frozen payload tree.
///
/// Mirrors [`PayloadValue`], except container children are themselves
/// [`PayloadSnapshot`] handles so unchanged subtrees can be shared between
/// generations of a snapshot.
#[derive(Debug, PartialEq)]
pub enum SnapshotValue {
    /// Absent / explicitly empty value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(f64),
    /// UTF-8 text scalar.
    Text(String),
    /// Contiguous `f32` buffer.
    FloatBuffer(Vec<f32>),
    /// Contiguous `u32` buffer.
    UintBuffer(Vec<u32>),
    /// Ordered sequence of frozen values.
    Seq(Vec<PayloadSnapshot>),
    /// String-keyed mapping of frozen values.
    Map(BTreeMap<String, PayloadSnapshot>),
}

impl PayloadSnapshot {
    pub(crate) fn new(value: SnapshotValue) -> Self {
        PayloadSnapshot(Arc::new(value))
    }

    /// The underlying node, for pattern matching.
    pub fn value(&self) -> &SnapshotValue {
        &self.0
    }

    /// Returns `true` when both handles point at the same allocation.
    ///
    /// Across two snapshot reads of the same payload, this holds for every
    /// subtree whose content did not change in between.
    pub fn ptr_eq(&self, other: &PayloadSnapshot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` for a null node.
    pub fn is_null(&self) -> bool {
        matches!(self.value(), SnapshotValue::Null)
    }

    /// Boolean scalar content, if this node is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self.value() {
            SnapshotValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric scalar content, if this node is one.
    pub fn as_number(&self) -> Option<f64> {
        match self.value() {
            SnapshotValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text content, if this node is text.
    pub fn as_str(&self) -> Option<&str> {
        match self.value() {
            SnapshotValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The `f32` buffer contents, if this node is a float buffer.
    pub fn as_float_buffer(&self) -> Option<&[f32]> {
        match self.value() {
            SnapshotValue::FloatBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// The `u32` buffer contents, if this node is a uint buffer.
    pub fn as_uint_buffer(&self) -> Option<&[u32]> {
        match self.value() {
            SnapshotValue::UintBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// The elements of a sequence node.
    pub fn as_seq(&self) -> Option<&[PayloadSnapshot]> {
        match self.value() {
            SnapshotValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// The entries of a mapping node.
    pub fn as_map(&self) -> Option<&BTreeMap<String, PayloadSnapshot>> {
        match self.value() {
            SnapshotValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a mapping field by key.
    pub fn get(&self, key: &str) -> Option<&PayloadSnapshot> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Looks up a sequence element by index.
    pub fn index(&self, index: usize) -> Option<&PayloadSnapshot> {
        self.as_seq().and_then(|items| items.get(index))
    }
}

impl PartialEq for PayloadSnapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

// ---------------------------------------------------------------------------
// Freezing
// ---------------------------------------------------------------------------

/// Freezes a working value into an immutable snapshot, structurally sharing
/// every subtree of `prev` whose content is unchanged.
///
/// Returns the snapshot and whether it is `prev` itself (fully unchanged).
/// Single pass, children first: a container is shared when its shape matches
/// `prev` and every child came back shared; otherwise a new node is built
/// whose unchanged children are still the previous allocations.
pub(crate) fn freeze_value(
    working: &PayloadValue,
    prev: Option<&PayloadSnapshot>,
) -> (PayloadSnapshot, bool) {
    match working {
        PayloadValue::Null => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::Null) => (p.clone(), true),
            _ => (PayloadSnapshot::new(SnapshotValue::Null), false),
        },
        PayloadValue::Bool(b) => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::Bool(pb) if pb == b) => {
                (p.clone(), true)
            }
            _ => (PayloadSnapshot::new(SnapshotValue::Bool(*b)), false),
        },
        PayloadValue::Number(n) => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::Number(pn) if pn == n) => {
                (p.clone(), true)
            }
            _ => (PayloadSnapshot::new(SnapshotValue::Number(*n)), false),
        },
        PayloadValue::Text(s) => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::Text(ps) if ps == s) => {
                (p.clone(), true)
            }
            _ => (PayloadSnapshot::new(SnapshotValue::Text(s.clone())), false),
        },
        PayloadValue::FloatBuffer(buf) => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::FloatBuffer(pb) if pb == buf) => {
                (p.clone(), true)
            }
            _ => (
                PayloadSnapshot::new(SnapshotValue::FloatBuffer(buf.clone())),
                false,
            ),
        },
        PayloadValue::UintBuffer(buf) => match prev {
            Some(p) if matches!(p.value(), SnapshotValue::UintBuffer(pb) if pb == buf) => {
                (p.clone(), true)
            }
            _ => (
                PayloadSnapshot::new(SnapshotValue::UintBuffer(buf.clone())),
                false,
            ),
        },
        PayloadValue::Seq(items) => {
            let prev_seq = prev.and_then(|p| match p.value() {
                SnapshotValue::Seq(elems) => Some((p, elems)),
                _ => None,
            });
            let mut all_shared =
                matches!(&prev_seq, Some((_, elems)) if elems.len() == items.len());
            let mut children = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let prev_child = prev_seq.as_ref().and_then(|(_, elems)| elems.get(index));
                let (child, shared) = freeze_value(item, prev_child);
                all_shared &= shared;
                children.push(child);
            }
            match (all_shared, prev_seq) {
                (true, Some((p, _))) => (p.clone(), true),
                _ => (PayloadSnapshot::new(SnapshotValue::Seq(children)), false),
            }
        }
        PayloadValue::Map(fields) => {
            let prev_map = prev.and_then(|p| match p.value() {
                SnapshotValue::Map(entries) => Some((p, entries)),
                _ => None,
            });
            // Equal length plus every working key found in prev means the
            // key sets are identical; a missing key surfaces as an unshared
            // child below.
            let mut all_shared =
                matches!(&prev_map, Some((_, entries)) if entries.len() == fields.len());
            let mut children = BTreeMap::new();
            for (key, field) in fields {
                let prev_child = prev_map.as_ref().and_then(|(_, entries)| entries.get(key));
                let (child, shared) = freeze_value(field, prev_child);
                all_shared &= shared;
                children.insert(key.clone(), child);
            }
            match (all_shared, prev_map) {
                (true, Some((p, _))) => (p.clone(), true),
                _ => (PayloadSnapshot::new(SnapshotValue::Map(children)), false),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
