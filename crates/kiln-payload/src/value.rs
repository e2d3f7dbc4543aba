//! Payload value model -- the tagged union for nested custom payload data.
//!
//! Simulation code attaches arbitrary structured data to scene objects:
//! scalar settings, string tags, nested mappings, and typed numeric buffers
//! destined for GPU upload (particle positions, sprite indices). The
//! [`PayloadValue`] enum makes every supported shape an explicit variant, so
//! the merge and freeze walks dispatch on structure instead of inspecting
//! runtime types.
//!
//! Depth is capped at [`MAX_PAYLOAD_DEPTH`] at every entry point. Stored
//! values are therefore capped by construction, which keeps the recursive
//! clone/merge/freeze walks stack-safe. Because values are owned trees,
//! aliasing and cycles are unrepresentable and the walks always terminate.

use std::collections::BTreeMap;

use crate::PayloadError;

/// Maximum nesting depth accepted for payload data.
///
/// The root of a payload sits at depth 0 and no node of a stored value ever
/// sits deeper than this. Containers that would land at or beyond the cap
/// are truncated to [`PayloadValue::Null`] on lenient paths and rejected on
/// the strict conversion path.
pub const MAX_PAYLOAD_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// PayloadValue
// ---------------------------------------------------------------------------

/// A node in a custom payload tree.
///
/// `FloatBuffer` and `UintBuffer` are the GPU-facing cases: contiguous
/// numeric data the renderer uploads wholesale. They are distinct variants
/// (not sequences of [`PayloadValue::Number`]) so the diff cache can reuse
/// their allocations and compare them as slices.
///
/// `Map` uses [`BTreeMap`] so iteration order, and with it diff and output
/// order, is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// Absent / explicitly empty value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar. Integers from JSON are widened to `f64`.
    Number(f64),
    /// UTF-8 text scalar.
    Text(String),
    /// Contiguous `f32` buffer (vertex-style data).
    FloatBuffer(Vec<f32>),
    /// Contiguous `u32` buffer (index/id-style data).
    UintBuffer(Vec<u32>),
    /// Ordered sequence of payload values.
    Seq(Vec<PayloadValue>),
    /// String-keyed mapping with deterministic (sorted) iteration order.
    Map(BTreeMap<String, PayloadValue>),
}

impl PayloadValue {
    /// Returns `true` for [`PayloadValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, PayloadValue::Null)
    }

    /// Builds a `Text` value.
    pub fn text(value: impl Into<String>) -> Self {
        PayloadValue::Text(value.into())
    }

    /// Builds a `Map` from `(key, value)` pairs.
    ///
    /// Later duplicates of a key overwrite earlier ones.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PayloadValue)>,
    {
        PayloadValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Builds a `Seq` from an iterator of values.
    pub fn seq<I: IntoIterator<Item = PayloadValue>>(items: I) -> Self {
        PayloadValue::Seq(items.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // JSON interchange
    // -----------------------------------------------------------------------

    /// Converts a JSON value, truncating subtrees beyond [`MAX_PAYLOAD_DEPTH`].
    ///
    /// This is the lenient path: it is total, and every truncation of
    /// non-null content is reported at `tracing::warn!`. Use the
    /// [`TryFrom<serde_json::Value>`] impl to reject over-deep input instead.
    ///
    /// JSON arrays always become [`PayloadValue::Seq`]; the buffer variants
    /// are only produced by explicit construction.
    pub fn from_json(value: serde_json::Value) -> Self {
        from_json_at(value, 0)
    }

    /// Converts back to JSON for debugging and export.
    ///
    /// Buffers become plain JSON arrays. Non-finite numbers map to JSON
    /// null, matching what a JSON serializer would emit for them.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PayloadValue::Null => serde_json::Value::Null,
            PayloadValue::Bool(b) => serde_json::Value::Bool(*b),
            PayloadValue::Number(n) => json_number(*n),
            PayloadValue::Text(s) => serde_json::Value::String(s.clone()),
            PayloadValue::FloatBuffer(buf) => serde_json::Value::Array(
                buf.iter().map(|x| json_number(f64::from(*x))).collect(),
            ),
            PayloadValue::UintBuffer(buf) => serde_json::Value::Array(
                buf.iter()
                    .map(|x| serde_json::Value::Number((*x).into()))
                    .collect(),
            ),
            PayloadValue::Seq(items) => {
                serde_json::Value::Array(items.iter().map(PayloadValue::to_json).collect())
            }
            PayloadValue::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

fn json_number(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

// Containers are only built below the cap, so no node in a stored value ever
// sits deeper than MAX_PAYLOAD_DEPTH. Scalars inherit the bound from their
// parent container.
fn from_json_at(value: serde_json::Value, depth: usize) -> PayloadValue {
    match value {
        serde_json::Value::Null => PayloadValue::Null,
        serde_json::Value::Bool(b) => PayloadValue::Bool(b),
        serde_json::Value::Number(n) => PayloadValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => PayloadValue::Text(s),
        serde_json::Value::Array(items) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                tracing::warn!(
                    depth,
                    limit = MAX_PAYLOAD_DEPTH,
                    "payload JSON exceeds depth limit, truncating subtree to null"
                );
                return PayloadValue::Null;
            }
            PayloadValue::Seq(
                items
                    .into_iter()
                    .map(|item| from_json_at(item, depth + 1))
                    .collect(),
            )
        }
        serde_json::Value::Object(fields) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                tracing::warn!(
                    depth,
                    limit = MAX_PAYLOAD_DEPTH,
                    "payload JSON exceeds depth limit, truncating subtree to null"
                );
                return PayloadValue::Null;
            }
            PayloadValue::Map(
                fields
                    .into_iter()
                    .map(|(key, field)| (key, from_json_at(field, depth + 1)))
                    .collect(),
            )
        }
    }
}

fn try_from_json_at(value: serde_json::Value, depth: usize) -> Result<PayloadValue, PayloadError> {
    Ok(match value {
        serde_json::Value::Null => PayloadValue::Null,
        serde_json::Value::Bool(b) => PayloadValue::Bool(b),
        serde_json::Value::Number(n) => PayloadValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => PayloadValue::Text(s),
        serde_json::Value::Array(items) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                return Err(PayloadError::DepthLimitExceeded {
                    limit: MAX_PAYLOAD_DEPTH,
                });
            }
            PayloadValue::Seq(
                items
                    .into_iter()
                    .map(|item| try_from_json_at(item, depth + 1))
                    .collect::<Result<_, _>>()?,
            )
        }
        serde_json::Value::Object(fields) => {
            if depth >= MAX_PAYLOAD_DEPTH {
                return Err(PayloadError::DepthLimitExceeded {
                    limit: MAX_PAYLOAD_DEPTH,
                });
            }
            PayloadValue::Map(
                fields
                    .into_iter()
                    .map(|(key, field)| Ok((key, try_from_json_at(field, depth + 1)?)))
                    .collect::<Result<_, PayloadError>>()?,
            )
        }
    })
}

/// Strict JSON conversion: rejects input deeper than [`MAX_PAYLOAD_DEPTH`].
impl TryFrom<serde_json::Value> for PayloadValue {
    type Error = PayloadError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        try_from_json_at(value, 0)
    }
}

// ---------------------------------------------------------------------------
// Scalar conversions
// ---------------------------------------------------------------------------

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        PayloadValue::Number(value)
    }
}

impl From<f32> for PayloadValue {
    fn from(value: f32) -> Self {
        PayloadValue::Number(f64::from(value))
    }
}

impl From<i32> for PayloadValue {
    fn from(value: i32) -> Self {
        PayloadValue::Number(f64::from(value))
    }
}

impl From<u32> for PayloadValue {
    fn from(value: u32) -> Self {
        PayloadValue::Number(f64::from(value))
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_owned())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<Vec<f32>> for PayloadValue {
    fn from(value: Vec<f32>) -> Self {
        PayloadValue::FloatBuffer(value)
    }
}

impl From<Vec<u32>> for PayloadValue {
    fn from(value: Vec<u32>) -> Self {
        PayloadValue::UintBuffer(value)
    }
}

impl From<Vec<PayloadValue>> for PayloadValue {
    fn from(value: Vec<PayloadValue>) -> Self {
        PayloadValue::Seq(value)
    }
}

impl From<BTreeMap<String, PayloadValue>> for PayloadValue {
    fn from(value: BTreeMap<String, PayloadValue>) -> Self {
        PayloadValue::Map(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
