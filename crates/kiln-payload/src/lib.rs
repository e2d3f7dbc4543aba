//! Kiln Payload -- structural diff-and-clone cache for nested payload data.
//!
//! Simulation code attaches free-form nested data (mappings, sequences,
//! scalars, typed numeric buffers) to scene objects. Renderers need to know
//! exactly what changed each frame without the simulation hand-managing
//! immutability. This crate provides both halves:
//!
//! - [`value::PayloadValue`]: the mutable payload model, with depth-capped
//!   JSON interchange.
//! - [`cache::PayloadCache`]: per-key working clones merged in place with
//!   allocation reuse, a content version bumped only on detected change,
//!   and lazily rebuilt immutable [`snapshot::PayloadSnapshot`] trees that
//!   structurally share every unchanged subtree, so consumers diff at any
//!   depth with a pointer comparison.
//!
//! # Quick Start
//!
//! ```
//! use kiln_payload::prelude::*;
//!
//! let mut cache: PayloadCache<&'static str> = PayloadCache::new();
//!
//! let changed = cache.apply(&"proj-1", &PayloadValue::map([
//!     ("trail", PayloadValue::FloatBuffer(vec![0.0, 1.0])),
//!     ("age", PayloadValue::Number(0.0)),
//! ]));
//! assert!(changed);
//!
//! // Equal content from a fresh allocation is not a change, and the frozen
//! // snapshot handle stays stable across reads.
//! let first = cache.snapshot(&"proj-1").unwrap();
//! assert!(!cache.apply(&"proj-1", &PayloadValue::map([
//!     ("trail", PayloadValue::FloatBuffer(vec![0.0, 1.0])),
//!     ("age", PayloadValue::Number(0.0)),
//! ])));
//! let second = cache.snapshot(&"proj-1").unwrap();
//! assert!(first.ptr_eq(&second));
//! ```

#![deny(unsafe_code)]

pub mod cache;
mod merge;
pub mod snapshot;
pub mod value;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by payload operations.
///
/// The runtime paths are tolerant by design (they sanitize and truncate
/// rather than fail); only the strict conversion surface reports errors.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Payload input nests deeper than the supported limit.
    #[error("payload exceeds maximum nesting depth of {limit}")]
    DepthLimitExceeded {
        limit: usize,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::cache::PayloadCache;
    pub use crate::snapshot::{PayloadSnapshot, SnapshotValue};
    pub use crate::value::{PayloadValue, MAX_PAYLOAD_DEPTH};
    pub use crate::PayloadError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use serde_json::json;

    // -- JSON in, snapshots out ---------------------------------------------

    #[test]
    fn json_payload_flows_through_cache_to_snapshot() {
        let mut cache: PayloadCache<String> = PayloadCache::new();

        let source = PayloadValue::from_json(json!({
            "hp": 10,
            "flags": { "burning": false },
        }));
        assert!(cache.apply(&"brick-1".to_owned(), &source));

        let snap = cache.snapshot(&"brick-1".to_owned()).unwrap();
        assert_eq!(snap.get("hp").and_then(PayloadSnapshot::as_number), Some(10.0));
        assert_eq!(
            snap.get("flags")
                .and_then(|flags| flags.get("burning"))
                .and_then(PayloadSnapshot::as_bool),
            Some(false)
        );
    }

    #[test]
    fn repeated_json_sources_do_not_invalidate() {
        let mut cache: PayloadCache<String> = PayloadCache::new();
        let key = "unit-7".to_owned();

        cache.apply(&key, &PayloadValue::from_json(json!({ "hp": 10 })));
        let v1 = cache.version(&key);
        let s1 = cache.snapshot(&key).unwrap();

        // Same logical content parsed again from text.
        cache.apply(&key, &PayloadValue::from_json(json!({ "hp": 10 })));
        assert_eq!(cache.version(&key), v1);
        assert!(s1.ptr_eq(&cache.snapshot(&key).unwrap()));
    }

    #[test]
    fn buffer_heavy_payload_shares_unchanged_buffers() {
        let mut cache: PayloadCache<u32> = PayloadCache::new();
        let positions: Vec<f32> = (0..256).map(|i| i as f32).collect();

        cache.apply(
            &1,
            &PayloadValue::map([
                ("positions", PayloadValue::FloatBuffer(positions.clone())),
                ("generation", PayloadValue::Number(0.0)),
            ]),
        );
        let before = cache.snapshot(&1).unwrap();

        // Only the scalar advances; the 256-element buffer must not be
        // recloned into the next snapshot.
        cache.apply(
            &1,
            &PayloadValue::map([
                ("positions", PayloadValue::FloatBuffer(positions)),
                ("generation", PayloadValue::Number(1.0)),
            ]),
        );
        let after = cache.snapshot(&1).unwrap();

        assert!(!before.ptr_eq(&after));
        assert!(before
            .get("positions")
            .unwrap()
            .ptr_eq(after.get("positions").unwrap()));
    }

    #[test]
    fn strict_conversion_error_displays_the_limit() {
        let mut value = json!(0);
        for _ in 0..(MAX_PAYLOAD_DEPTH + 1) {
            value = json!([value]);
        }
        let err = PayloadValue::try_from(value).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("payload exceeds maximum nesting depth of {MAX_PAYLOAD_DEPTH}")
        );
    }
}
