//! Camera -- clamped viewport over the map.
//!
//! The camera is the top-left corner of the visible region (map units) plus
//! a zoom scale. Every mutator funnels through one clamp routine, so after
//! any call sequence the scale sits inside the derived legal range and the
//! viewport (screen size / scale) lies fully inside the map. Non-finite
//! position and scale arguments are ignored; map and screen dimensions are
//! sanitized to at least one unit.

use crate::object::{Size, Vec2};

/// Hard lower bound for the zoom scale, below the map-fit derivation.
///
/// Keeps tiny screens over huge maps from producing scales near zero, where
/// viewport arithmetic loses precision and renderers degenerate.
pub const MIN_SCALE_FLOOR: f64 = 0.1;

/// Viewport camera clamped against a map.
///
/// `min_scale` is derived, not configured: the largest of the two screen/map
/// fit ratios capped at 1, floored at [`MIN_SCALE_FLOOR`]. When the
/// configured `max_scale` falls below the derived minimum, the minimum wins
/// and the scale range collapses to a single value.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec2,
    scale: f64,
    map_size: Size,
    screen_size: Size,
    max_scale: f64,
    min_scale: f64,
}

impl Camera {
    /// Creates a camera at position (0, 0), scale 1 (clamped into range).
    ///
    /// # Panics
    ///
    /// Panics if `max_scale` is not a positive finite number; that is a
    /// configuration mistake, not runtime data.
    pub fn new(map_size: Size, screen_size: Size, max_scale: f64) -> Self {
        assert!(
            max_scale.is_finite() && max_scale > 0.0,
            "max_scale must be positive and finite, got {max_scale}"
        );
        let mut camera = Camera {
            position: Vec2::ZERO,
            scale: 1.0,
            map_size: sanitize_view_size(map_size),
            screen_size: sanitize_view_size(screen_size),
            max_scale,
            min_scale: MIN_SCALE_FLOOR,
        };
        camera.apply_limits();
        camera
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Top-left corner of the viewport, in map units.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Current zoom scale (screen pixels per map unit).
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The legal `(min, max)` scale range under the current map and screen
    /// sizes. `min == max` when the configured maximum falls below the
    /// derived minimum.
    pub fn scale_range(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale.max(self.min_scale))
    }

    /// Visible region extent in map units (screen size / scale).
    pub fn viewport_size(&self) -> Size {
        Size::new(
            self.screen_size.width / self.scale,
            self.screen_size.height / self.scale,
        )
    }

    pub fn map_size(&self) -> Size {
        self.map_size
    }

    pub fn screen_size(&self) -> Size {
        self.screen_size
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Moves the viewport's top-left corner, clamped into the map.
    /// Non-finite coordinates are ignored.
    pub fn set_position(&mut self, position: Vec2) {
        if !position.x.is_finite() || !position.y.is_finite() {
            tracing::debug!(?position, "ignoring non-finite camera position");
            return;
        }
        self.position = position;
        self.apply_limits();
    }

    /// Offsets the position by `delta`, clamped. Non-finite deltas are
    /// ignored.
    pub fn pan(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            tracing::debug!(?delta, "ignoring non-finite camera pan");
            return;
        }
        self.position = Vec2::new(self.position.x + delta.x, self.position.y + delta.y);
        self.apply_limits();
    }

    /// Sets the zoom scale, clamped into the legal range. Zooming out grows
    /// the viewport, which may pull the position back toward the origin.
    /// Non-finite scales are ignored.
    pub fn set_scale(&mut self, scale: f64) {
        if !scale.is_finite() {
            tracing::debug!(scale, "ignoring non-finite camera scale");
            return;
        }
        self.scale = scale;
        self.apply_limits();
    }

    /// Resizes the map and re-clamps. Growing the map lowers the minimum
    /// scale; shrinking it may force the scale up to keep the viewport
    /// inside.
    pub fn set_map_size(&mut self, size: Size) {
        self.map_size = sanitize_view_size(size);
        self.apply_limits();
    }

    /// Resizes the screen (device pixels) and re-clamps.
    pub fn set_screen_size(&mut self, size: Size) {
        self.screen_size = sanitize_view_size(size);
        self.apply_limits();
    }

    /// Restores position (0, 0) and scale 1, clamped into range.
    pub fn reset(&mut self) {
        self.position = Vec2::ZERO;
        self.scale = 1.0;
        self.apply_limits();
    }

    // -----------------------------------------------------------------------
    // Clamping
    // -----------------------------------------------------------------------

    /// The single clamp routine every mutation funnels through.
    ///
    /// Order matters: the minimum scale depends on map and screen sizes, the
    /// clamped scale determines the viewport, and the viewport determines
    /// the position bounds.
    fn apply_limits(&mut self) {
        let fit_x = self.screen_size.width / self.map_size.width;
        let fit_y = self.screen_size.height / self.map_size.height;
        self.min_scale = fit_x.min(fit_y).min(1.0).max(MIN_SCALE_FLOOR);
        self.scale = self
            .scale
            .clamp(self.min_scale, self.max_scale.max(self.min_scale));
        self.position = Vec2::new(
            clamp_axis(
                self.position.x,
                self.map_size.width,
                self.screen_size.width / self.scale,
            ),
            clamp_axis(
                self.position.y,
                self.map_size.height,
                self.screen_size.height / self.scale,
            ),
        );
    }
}

/// Clamps one position axis to `[0, map - viewport]`, or 0 when the
/// viewport covers the whole map extent.
fn clamp_axis(value: f64, map_extent: f64, viewport_extent: f64) -> f64 {
    let max = map_extent - viewport_extent;
    if max <= 0.0 {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn sanitize_view_size(size: Size) -> Size {
    Size::new(sanitize_extent(size.width), sanitize_extent(size.height))
}

fn sanitize_extent(value: f64) -> f64 {
    if value.is_finite() {
        value.max(1.0)
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
