//! SceneRegistry -- the retained object store and per-frame diff producer.
//!
//! Simulation code mutates the registry every tick through a tolerant API:
//! malformed fields are sanitized, unknown ids are logged no-ops, and
//! nothing returns an error. Once per render frame the renderer calls
//! [`SceneRegistry::flush_changes`] and receives the minimal
//! added/updated/removed diff since the previous flush. Structural
//! removals are deferred and batched (see [`crate::changes`]) so churny
//! ticks do not thrash renderer-side buffer allocations; a removed object
//! turns invisible immediately and disappears structurally a little later.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use kiln_payload::cache::PayloadCache;
use kiln_payload::snapshot::PayloadSnapshot;

use crate::camera::Camera;
use crate::changes::{ChangeTracker, FlushDiagnostics, FrameChanges, RenderObject};
use crate::fill::{sanitize_color, sanitize_fill, sanitize_stroke, Color, Fill};
use crate::object::{
    normalize_rotation, sanitize_point, sanitize_size, ObjectData, ObjectId, PayloadPatch,
    SceneObject, Size, Vec2, DEFAULT_SIZE,
};

/// Default structural-removal batch size.
pub const DEFAULT_REMOVAL_QUOTA: usize = 128;

/// Default minimum spacing between structural-removal batches.
pub const DEFAULT_REMOVAL_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// SceneConfig
// ---------------------------------------------------------------------------

/// Registry construction parameters.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Map extent in map units.
    pub map_size: Size,
    /// Render surface extent in device pixels.
    pub screen_size: Size,
    /// Upper zoom bound; the lower bound is derived from map and screen.
    pub max_scale: f64,
    /// Structural removals processed per batch. Must be at least 1.
    pub removal_quota: usize,
    /// Minimum spacing between removal batches below the quota.
    pub removal_flush_interval: Duration,
}

impl Default for SceneConfig {
    /// 1000x1000 map, 800x600 screen, max scale 4, removal batches of 128
    /// at most every 250ms.
    fn default() -> Self {
        SceneConfig {
            map_size: Size::new(1000.0, 1000.0),
            screen_size: Size::new(800.0, 600.0),
            max_scale: 4.0,
            removal_quota: DEFAULT_REMOVAL_QUOTA,
            removal_flush_interval: DEFAULT_REMOVAL_FLUSH_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// SceneRegistry
// ---------------------------------------------------------------------------

/// Retained scene store: object lifecycle, custom payload diffing, camera,
/// and per-frame change output.
///
/// Objects are iterated in insertion order. Ids are generated by the
/// registry and never reused, including across [`SceneRegistry::clear`].
#[derive(Debug)]
pub struct SceneRegistry {
    objects: HashMap<ObjectId, SceneObject>,
    /// Insertion order of live ids; kept in lockstep with `objects`.
    order: Vec<ObjectId>,
    payloads: PayloadCache<ObjectId>,
    tracker: ChangeTracker,
    camera: Camera,
    next_serial: u64,
    last_flush: FlushDiagnostics,
}

impl Default for SceneRegistry {
    fn default() -> Self {
        SceneRegistry::new(SceneConfig::default())
    }
}

impl SceneRegistry {
    /// Creates an empty registry.
    ///
    /// # Panics
    ///
    /// Panics if `config.removal_quota` is 0 or `config.max_scale` is not a
    /// positive finite number; both are configuration mistakes, not runtime
    /// data.
    pub fn new(config: SceneConfig) -> Self {
        assert!(
            config.removal_quota >= 1,
            "removal_quota must be at least 1, got {}",
            config.removal_quota
        );
        SceneRegistry {
            objects: HashMap::new(),
            order: Vec::new(),
            payloads: PayloadCache::new(),
            tracker: ChangeTracker::new(
                config.removal_quota,
                config.removal_flush_interval,
                Instant::now(),
            ),
            camera: Camera::new(config.map_size, config.screen_size, config.max_scale),
            next_serial: 1,
            last_flush: FlushDiagnostics::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Object lifecycle
    // -----------------------------------------------------------------------

    /// Registers a new object and returns its fresh id (`"{kind}-{serial}"`).
    ///
    /// Every field of `data` is optional: position defaults to the origin,
    /// size to [`DEFAULT_SIZE`], the fill to an opaque white solid (or a
    /// solid of the explicit color when one is given without a fill). The
    /// canonical color is the explicit one when supplied, else the fill's
    /// primary color. A non-null [`PayloadPatch::Set`] seeds the payload
    /// diff cache.
    pub fn add_object(&mut self, kind: &str, data: ObjectData) -> ObjectId {
        let serial = self.next_serial;
        self.next_serial += 1;
        let id = ObjectId::new(format!("{kind}-{serial}"));

        let explicit_color = data.color.map(sanitize_color);
        let fill = match (data.fill, explicit_color) {
            (Some(fill), _) => sanitize_fill(fill),
            (None, Some(color)) => Fill::solid(color),
            (None, None) => Fill::solid(Color::WHITE),
        };
        let object = SceneObject {
            id: id.clone(),
            kind: kind.to_owned(),
            position: sanitize_point(data.position.unwrap_or(Vec2::ZERO)),
            size: sanitize_size(data.size.unwrap_or(DEFAULT_SIZE)),
            rotation: data.rotation.map(normalize_rotation),
            color: explicit_color.unwrap_or_else(|| fill.primary_color()),
            fill,
            stroke: sanitize_stroke(data.stroke),
        };

        if let PayloadPatch::Set(value) = &data.custom {
            if !value.is_null() {
                self.payloads.apply(&id, value);
            }
        }

        self.objects.insert(id.clone(), object);
        self.order.push(id.clone());
        self.tracker.record_added(id.clone());
        id
    }

    /// Merges `data` into an existing object.
    ///
    /// No-op for unknown ids and for objects pending removal. Provided
    /// fields overwrite, absent fields keep their previous value. A
    /// provided fill takes precedence over a provided plain color: the
    /// canonical color is re-derived from the fill when its value actually
    /// changed, and kept otherwise. A plain color without a fill sets the
    /// color and replaces the fill with a solid of it, mirroring creation.
    pub fn update_object(&mut self, id: &ObjectId, data: ObjectData) {
        if self.tracker.is_pending_removal(id) {
            tracing::debug!(%id, "ignoring update for object pending removal");
            return;
        }
        let Some(object) = self.objects.get_mut(id) else {
            tracing::debug!(%id, "ignoring update for unknown object");
            return;
        };

        if let Some(position) = data.position {
            object.position = sanitize_point(position);
        }
        if let Some(size) = data.size {
            object.size = sanitize_size(size);
        }
        if let Some(rotation) = data.rotation {
            object.rotation = Some(normalize_rotation(rotation));
        }
        match (data.fill, data.color) {
            (Some(fill), _) => {
                let fill = sanitize_fill(fill);
                if fill != object.fill {
                    object.color = fill.primary_color();
                    object.fill = fill;
                }
            }
            (None, Some(color)) => {
                let color = sanitize_color(color);
                object.color = color;
                object.fill = Fill::solid(color);
            }
            (None, None) => {}
        }
        if let Some(stroke) = data.stroke {
            object.stroke = sanitize_stroke(Some(stroke));
        }

        match data.custom {
            PayloadPatch::Keep => {}
            PayloadPatch::Clear => {
                self.payloads.remove(id);
            }
            PayloadPatch::Set(value) => {
                if value.is_null() {
                    self.payloads.remove(id);
                } else {
                    self.payloads.apply(id, &value);
                }
            }
        }

        self.tracker.record_updated(id.clone());
    }

    /// Marks an object for removal. No-op for unknown ids and for ids
    /// already pending.
    ///
    /// The object turns invisible immediately: color and fill are forced to
    /// a fully transparent solid (gradient data is discarded on the spot)
    /// and the stroke is cleared. Its payload cache entry is evicted.
    /// Structural deletion is deferred to a later flush's removal batch;
    /// until then the object still exists, ignores updates, and occupies
    /// its insertion-order slot.
    pub fn remove_object(&mut self, id: &ObjectId) {
        if self.tracker.is_pending_removal(id) {
            tracing::debug!(%id, "ignoring removal for object already pending");
            return;
        }
        let Some(object) = self.objects.get_mut(id) else {
            tracing::debug!(%id, "ignoring removal for unknown object");
            return;
        };

        object.color = Color::TRANSPARENT;
        object.fill = Fill::solid(Color::TRANSPARENT);
        object.stroke = None;
        self.payloads.remove(id);

        self.tracker.queue_removal(id.clone());
        // Propagates the transparency; brand-new additions stay classified
        // as added.
        self.tracker.record_updated(id.clone());
    }

    /// Drops every object and payload entry, resets the camera position and
    /// scale, and reports all previously known ids as removed at the next
    /// flush. Map and screen sizes are retained, and the id serial keeps
    /// running so ids are never reused.
    pub fn clear(&mut self) {
        let removed = std::mem::take(&mut self.order);
        let count = removed.len();
        self.objects.clear();
        self.payloads.clear();
        self.tracker.reset_for_clear(removed);
        self.camera.reset();
        tracing::debug!(objects = count, "cleared scene");
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_object(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Iterates registered objects in insertion order, including ones
    /// pending structural removal.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Frozen custom payload for `id`, rebuilt lazily only when its content
    /// changed since the last read. `None` when the object carries no
    /// payload.
    pub fn custom_payload(&self, id: &ObjectId) -> Option<PayloadSnapshot> {
        self.payloads.snapshot(id)
    }

    /// Counters for the most recent [`SceneRegistry::flush_changes`].
    pub fn last_flush_diagnostics(&self) -> FlushDiagnostics {
        self.last_flush
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /// Produces the added/updated/removed diff accumulated since the last
    /// flush. Called once per render frame.
    ///
    /// Pending structural removals are processed first when their gate
    /// triggers (quota reached, or flush interval elapsed with work
    /// pending); the freed ids join the removed output together with ids
    /// finalized by [`SceneRegistry::clear`]. The added and updated outputs
    /// exclude anything in this frame's removed output, and carry clones of
    /// the current object state plus the frozen payload snapshot, safe for
    /// the renderer to retain.
    pub fn flush_changes(&mut self) -> FrameChanges {
        let flush_started = Instant::now();

        let batch = self.tracker.take_removal_batch(flush_started);
        let removal_batch = batch.len();
        if !batch.is_empty() {
            let batch_set: HashSet<&ObjectId> = batch.iter().collect();
            self.order.retain(|id| !batch_set.contains(id));
            for id in &batch {
                self.objects.remove(id);
            }
        }

        let mut removed = self.tracker.take_finalized();
        removed.extend(batch);

        let added_ids = self.tracker.take_added();
        let updated_ids = self.tracker.take_updated();
        let added = self.collect_render_objects(added_ids, &removed);
        let updated = self.collect_render_objects(updated_ids, &removed);

        let diagnostics = FlushDiagnostics {
            added: added.len(),
            updated: updated.len(),
            removed: removed.len(),
            pending_removals: self.tracker.pending_len(),
            removal_batch,
            flush_time: flush_started.elapsed(),
        };
        self.last_flush = diagnostics;

        FrameChanges {
            added,
            updated,
            removed,
        }
    }

    /// Clones current state for every id that survived this frame's removed
    /// output.
    fn collect_render_objects(
        &self,
        ids: Vec<ObjectId>,
        removed: &[ObjectId],
    ) -> Vec<RenderObject> {
        let removed_set: HashSet<&ObjectId> = removed.iter().collect();
        ids.into_iter()
            .filter(|id| !removed_set.contains(id))
            .filter_map(|id| {
                let object = self.objects.get(&id)?.clone();
                let custom = self.payloads.snapshot(&id);
                Some(RenderObject { object, custom })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Camera
    // -----------------------------------------------------------------------

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Resizes the map the camera is clamped against.
    pub fn set_map_size(&mut self, size: Size) {
        self.camera.set_map_size(size);
    }

    pub fn map_size(&self) -> Size {
        self.camera.map_size()
    }

    /// Resizes the render surface the viewport is derived from.
    pub fn set_viewport_screen_size(&mut self, size: Size) {
        self.camera.set_screen_size(size);
    }

    /// Sets the camera zoom, clamped into [`SceneRegistry::scale_range`].
    pub fn set_scale(&mut self, scale: f64) {
        self.camera.set_scale(scale);
    }

    pub fn scale_range(&self) -> (f64, f64) {
        self.camera.scale_range()
    }

    /// Moves the camera, clamped inside the map.
    pub fn set_camera_position(&mut self, position: Vec2) {
        self.camera.set_position(position);
    }

    /// Offsets the camera, clamped inside the map.
    pub fn pan_camera(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
