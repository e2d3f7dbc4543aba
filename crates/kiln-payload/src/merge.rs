//! In-place structural merge of payload values with allocation reuse.
//!
//! [`merge_value`] copies a source tree into an existing working tree,
//! reusing the working tree's allocations wherever structure lines up:
//! buffers of equal length are overwritten in place, sequences are truncated
//! or extended, map entries are pruned and merged per key, and text reuses
//! its backing storage. The return value reports whether any content
//! actually changed, and a changed leaf propagates through every ancestor.
//!
//! Where structure does not line up (variant mismatch, appended elements,
//! inserted keys), fresh nodes are built by [`clone_capped`], which enforces
//! the same depth cap as the JSON entry points. Working trees are therefore
//! capped by construction no matter how they were produced.

use crate::value::{PayloadValue, MAX_PAYLOAD_DEPTH};

/// Merges `source` into `dest` in place, returning whether content changed.
///
/// `depth` is the tree depth of `dest` itself (the root is 0); recursion
/// adds one per container level.
pub(crate) fn merge_value(dest: &mut PayloadValue, source: &PayloadValue, depth: usize) -> bool {
    match (dest, source) {
        (PayloadValue::Null, PayloadValue::Null) => false,
        (PayloadValue::Bool(dst), PayloadValue::Bool(src)) => {
            if dst != src {
                *dst = *src;
                true
            } else {
                false
            }
        }
        // Plain float comparison: NaN never equals itself, so a NaN source
        // always registers as a change, same as the identity rule upstream
        // consumers expect.
        (PayloadValue::Number(dst), PayloadValue::Number(src)) => {
            if dst != src {
                *dst = *src;
                true
            } else {
                false
            }
        }
        (PayloadValue::Text(dst), PayloadValue::Text(src)) => {
            if dst != src {
                dst.clear();
                dst.push_str(src);
                true
            } else {
                false
            }
        }
        (PayloadValue::FloatBuffer(dst), PayloadValue::FloatBuffer(src)) => {
            merge_buffer(dst, src)
        }
        (PayloadValue::UintBuffer(dst), PayloadValue::UintBuffer(src)) => merge_buffer(dst, src),
        (PayloadValue::Seq(dst), PayloadValue::Seq(src)) => {
            let mut changed = dst.len() != src.len();
            dst.truncate(src.len());
            for (index, src_item) in src.iter().enumerate() {
                if index < dst.len() {
                    changed |= merge_value(&mut dst[index], src_item, depth + 1);
                } else {
                    dst.push(clone_capped(src_item, depth + 1));
                }
            }
            changed
        }
        (PayloadValue::Map(dst), PayloadValue::Map(src)) => {
            let len_before = dst.len();
            dst.retain(|key, _| src.contains_key(key));
            let mut changed = dst.len() != len_before;
            for (key, src_field) in src {
                match dst.get_mut(key) {
                    Some(dst_field) => {
                        changed |= merge_value(dst_field, src_field, depth + 1);
                    }
                    None => {
                        dst.insert(key.clone(), clone_capped(src_field, depth + 1));
                        changed = true;
                    }
                }
            }
            changed
        }
        // Variant mismatch: replace the subtree wholesale. The equality
        // check is discriminant-cheap and keeps a depth-capped replacement
        // (null over null) from registering as a change on every merge.
        (dest_slot, source) => {
            let replacement = clone_capped(source, depth);
            if *dest_slot == replacement {
                false
            } else {
                *dest_slot = replacement;
                true
            }
        }
    }
}

// Equal length reuses the allocation outright; a length change rebuilds the
// contents but still keeps the capacity when it suffices.
fn merge_buffer<T: Copy + PartialEq>(dst: &mut Vec<T>, src: &[T]) -> bool {
    if dst.len() == src.len() {
        if dst.as_slice() != src {
            dst.copy_from_slice(src);
            true
        } else {
            false
        }
    } else {
        dst.clear();
        dst.extend_from_slice(src);
        true
    }
}

/// Builds a fresh, depth-capped structural clone of `source`.
///
/// Containers that would land at or beyond [`MAX_PAYLOAD_DEPTH`] become
/// [`PayloadValue::Null`] with a warning, mirroring the lenient JSON path.
pub(crate) fn clone_capped(source: &PayloadValue, depth: usize) -> PayloadValue {
    match source {
        PayloadValue::Seq(items) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                tracing::warn!(
                    depth,
                    limit = MAX_PAYLOAD_DEPTH,
                    "payload source exceeds depth limit, truncating subtree to null"
                );
                return PayloadValue::Null;
            }
            PayloadValue::Seq(
                items
                    .iter()
                    .map(|item| clone_capped(item, depth + 1))
                    .collect(),
            )
        }
        PayloadValue::Map(fields) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                tracing::warn!(
                    depth,
                    limit = MAX_PAYLOAD_DEPTH,
                    "payload source exceeds depth limit, truncating subtree to null"
                );
                return PayloadValue::Null;
            }
            PayloadValue::Map(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), clone_capped(field, depth + 1)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
