//! Kiln Scene -- retained scene registry with per-frame diff output.
//!
//! This crate builds on [`kiln_payload`] to provide the renderer-facing
//! scene store: simulation code mutates a registry of 2D objects every
//! tick, and once per render frame
//! [`flush_changes`](registry::SceneRegistry::flush_changes) hands the
//! renderer a minimal added/updated/removed diff. Appearance data is
//! sanitized on the way in, custom payloads are structurally diffed so
//! renderers see exactly what changed, and structural removals are batched
//! to keep GPU-side buffer churn low.
//!
//! # Quick Start
//!
//! ```
//! use kiln_scene::prelude::*;
//!
//! let mut scene = SceneRegistry::new(SceneConfig::default());
//! let brick = scene.add_object(
//!     "brick",
//!     ObjectData {
//!         position: Some(Vec2::new(10.0, 10.0)),
//!         size: Some(Size::new(20.0, 20.0)),
//!         color: Some(Color::rgb(1.0, 0.0, 0.0)),
//!         ..ObjectData::default()
//!     },
//! );
//!
//! let changes = scene.flush_changes();
//! assert_eq!(changes.added.len(), 1);
//! assert_eq!(changes.added[0].object.id, brick);
//! assert_eq!(changes.added[0].object.fill, Fill::solid(Color::rgb(1.0, 0.0, 0.0)));
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod changes;
pub mod fill;
pub mod object;
pub mod registry;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the payload crate for convenience.
pub use kiln_payload;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common scene usage.
pub mod prelude {
    // Re-export everything from the payload prelude.
    pub use kiln_payload::prelude::*;

    // Scene-specific exports.
    pub use crate::camera::{Camera, MIN_SCALE_FLOOR};
    pub use crate::changes::{FlushDiagnostics, FrameChanges, RenderObject};
    pub use crate::object::{
        normalize_rotation, ObjectData, ObjectId, PayloadPatch, SceneObject, Size, Vec2,
        DEFAULT_SIZE,
    };
    pub use crate::registry::{
        SceneConfig, SceneRegistry, DEFAULT_REMOVAL_FLUSH_INTERVAL, DEFAULT_REMOVAL_QUOTA,
    };

    // Appearance types.
    pub use crate::fill::{
        sanitize_color, sanitize_fill, sanitize_stroke, Color, CrackMask, Filament, Fill,
        GradientStop, Noise, Paint, Stroke,
    };
}
