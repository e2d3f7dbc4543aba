//! Scene object model -- identifiers, geometry, and mutation records.
//!
//! A [`SceneObject`] is the registry's stored record for one renderable
//! thing: a brick, a unit, a projectile, an explosion. Callers never build
//! one directly; they describe creations and updates with [`ObjectData`], a
//! sparse patch whose absent fields mean "leave as is", and the registry
//! normalizes everything on the way in.

use std::fmt;
use std::sync::Arc;

use kiln_payload::value::PayloadValue;

use crate::fill::{Color, Fill, Stroke};

/// Size applied at creation when the caller does not provide one.
pub const DEFAULT_SIZE: Size = Size {
    width: 10.0,
    height: 10.0,
};

// ---------------------------------------------------------------------------
// Geometry scalars
// ---------------------------------------------------------------------------

/// 2D point or offset in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
}

/// Width/height pair in map or screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Opaque object identifier, unique for the lifetime of its registry.
///
/// Ids are generated by the registry (`"{kind}-{serial}"`, serial never
/// reused, including across a registry clear) and flow back to callers and
/// renderers. Cloning is cheap; equality and hashing are by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId(Arc<str>);

impl ObjectId {
    pub(crate) fn new(id: String) -> Self {
        ObjectId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ObjectId(String::deserialize(deserializer)?.into()))
    }
}

// ---------------------------------------------------------------------------
// SceneObject
// ---------------------------------------------------------------------------

/// The registry's stored record for one scene object.
///
/// Every field is normalized: rotation, when present, lies in `[0, 2pi)`,
/// the fill is always canonical (never absent), `color` always mirrors the
/// fill's primary color unless the caller set it explicitly, and `stroke`
/// is `None` unless its width is a finite positive number. Custom payload
/// data is not stored here; it lives in the payload cache keyed by `id`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneObject {
    /// Registry-generated identifier.
    pub id: ObjectId,
    /// Caller-supplied type tag (`"brick"`, `"projectile"`, ...).
    pub kind: String,
    /// Position in map coordinates.
    pub position: Vec2,
    /// Extent in map units.
    pub size: Size,
    /// Rotation in radians, normalized to `[0, 2pi)`. `None` if never set.
    pub rotation: Option<f64>,
    /// Canonical primary color.
    pub color: Color,
    /// Canonical fill.
    pub fill: Fill,
    /// Outline, if any.
    pub stroke: Option<Stroke>,
}

// ---------------------------------------------------------------------------
// ObjectData
// ---------------------------------------------------------------------------

/// How an [`ObjectData`] patch treats the custom payload.
#[derive(Debug, Clone, Default)]
pub enum PayloadPatch {
    /// Leave the payload as it is.
    #[default]
    Keep,
    /// Drop the payload entirely.
    Clear,
    /// Merge this value through the diff cache. Setting
    /// [`PayloadValue::Null`] is equivalent to [`PayloadPatch::Clear`].
    Set(PayloadValue),
}

/// Sparse description of an object creation or update.
///
/// Absent fields keep their previous value (or their creation default).
/// A provided `fill` takes precedence over a provided `color`. To clear a
/// stroke, provide one with a non-positive width.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    pub position: Option<Vec2>,
    pub size: Option<Size>,
    /// Rotation in radians; any finite value is accepted and normalized.
    pub rotation: Option<f64>,
    pub color: Option<Color>,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    /// Custom payload patch, routed through the diff cache.
    pub custom: PayloadPatch,
}

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

/// Maps any angle into `[0, 2pi)`. Non-finite input normalizes to 0.
pub fn normalize_rotation(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(std::f64::consts::TAU);
    // rem_euclid can round up to 2pi itself for tiny negative inputs.
    if wrapped >= std::f64::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

pub(crate) fn sanitize_point(point: Vec2) -> Vec2 {
    Vec2 {
        x: finite_or_zero(point.x),
        y: finite_or_zero(point.y),
    }
}

pub(crate) fn sanitize_size(size: Size) -> Size {
    Size {
        width: sanitize_dimension(size.width, DEFAULT_SIZE.width),
        height: sanitize_dimension(size.height, DEFAULT_SIZE.height),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn sanitize_dimension(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
