//! Property tests for scene operations.
//!
//! Random mutation sequences against the registry and the camera, checking
//! the flush-output exclusivity and camera clamp invariants after every
//! step, plus sanitizer idempotence over arbitrary appearance data
//! (including NaN and infinite fields).

use std::collections::HashSet;
use std::time::Duration;

use kiln_scene::prelude::*;
use proptest::prelude::*;

// -- Strategies -------------------------------------------------------------

/// Mostly reasonable values with a sprinkling of NaN and infinities.
fn wild_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1.0e6..1.0e6f64,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

fn wild_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        8 => -8.0..8.0f32,
        1 => Just(f32::NAN),
        1 => Just(f32::INFINITY),
        1 => Just(f32::NEG_INFINITY),
    ]
}

fn color_strategy() -> impl Strategy<Value = Color> {
    (wild_f32(), wild_f32(), wild_f32(), wild_f32())
        .prop_map(|(r, g, b, a)| Color { r, g, b, a })
}

fn stop_strategy() -> impl Strategy<Value = GradientStop> {
    (wild_f64(), color_strategy()).prop_map(|(offset, color)| GradientStop { offset, color })
}

fn anchor_strategy() -> impl Strategy<Value = Option<Vec2>> {
    proptest::option::of((wild_f64(), wild_f64()).prop_map(|(x, y)| Vec2::new(x, y)))
}

fn paint_strategy() -> impl Strategy<Value = Paint> {
    prop_oneof![
        color_strategy().prop_map(|color| Paint::Solid { color }),
        (
            anchor_strategy(),
            anchor_strategy(),
            prop::collection::vec(stop_strategy(), 0..4),
        )
            .prop_map(|(start, end, stops)| Paint::LinearGradient { start, end, stops }),
        (
            anchor_strategy(),
            proptest::option::of(wild_f64()),
            prop::collection::vec(stop_strategy(), 0..4),
        )
            .prop_map(|(center, radius, stops)| Paint::RadialGradient {
                center,
                radius,
                stops
            }),
        (
            anchor_strategy(),
            proptest::option::of(wild_f64()),
            prop::collection::vec(stop_strategy(), 0..4),
        )
            .prop_map(|(center, radius, stops)| Paint::DiamondGradient {
                center,
                radius,
                stops
            }),
    ]
}

fn fill_strategy() -> impl Strategy<Value = Fill> {
    (
        paint_strategy(),
        proptest::option::of((wild_f32(), wild_f64(), any::<u32>()).prop_map(
            |(intensity, scale, seed)| Noise {
                intensity,
                scale,
                seed,
            },
        )),
        proptest::option::of((color_strategy(), wild_f32(), any::<u32>()).prop_map(
            |(color, density, seed)| Filament {
                color,
                density,
                seed,
            },
        )),
        proptest::option::of((wild_f32(), any::<u32>()).prop_map(|(progress, seed)| {
            CrackMask { progress, seed }
        })),
    )
        .prop_map(|(paint, noise, filament, crack_mask)| Fill {
            paint,
            noise,
            filament,
            crack_mask,
        })
}

// -- Sanitizer idempotence ---------------------------------------------------

fn channel_in_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1024))]

    #[test]
    fn color_sanitization_is_idempotent_and_in_range(color in color_strategy()) {
        let once = sanitize_color(color);
        prop_assert_eq!(sanitize_color(once), once);
        prop_assert!(channel_in_range(once.r));
        prop_assert!(channel_in_range(once.g));
        prop_assert!(channel_in_range(once.b));
        prop_assert!(channel_in_range(once.a));
    }

    #[test]
    fn fill_sanitization_is_idempotent(fill in fill_strategy()) {
        let once = sanitize_fill(fill);
        prop_assert_eq!(sanitize_fill(once.clone()), once.clone());

        match &once.paint {
            Paint::Solid { color } => {
                prop_assert!(channel_in_range(color.r));
                prop_assert!(channel_in_range(color.a));
            }
            Paint::LinearGradient { stops, .. }
            | Paint::RadialGradient { stops, .. }
            | Paint::DiamondGradient { stops, .. } => {
                prop_assert!(!stops.is_empty());
                prop_assert!(stops
                    .windows(2)
                    .all(|pair| pair[0].offset <= pair[1].offset));
                for stop in stops {
                    prop_assert!((0.0..=1.0).contains(&stop.offset));
                }
            }
        }
        if let Some(noise) = &once.noise {
            prop_assert!(noise.scale.is_finite() && noise.scale > 0.0);
        }
    }

    #[test]
    fn stroke_sanitization_is_idempotent(color in color_strategy(), width in wild_f64()) {
        let once = sanitize_stroke(Some(Stroke { color, width }));
        prop_assert_eq!(sanitize_stroke(once), once);
        if let Some(stroke) = once {
            prop_assert!(stroke.width.is_finite() && stroke.width > 0.0);
        }
    }

    #[test]
    fn rotation_normalizes_into_the_unit_circle(angle in wild_f64()) {
        let normalized = normalize_rotation(angle);
        prop_assert!((0.0..std::f64::consts::TAU).contains(&normalized));
        prop_assert_eq!(normalize_rotation(normalized), normalized);
    }
}

// -- Camera mutation sequences ----------------------------------------------

#[derive(Debug, Clone)]
enum CameraOp {
    SetScale(f64),
    SetPosition(f64, f64),
    Pan(f64, f64),
    SetMapSize(f64, f64),
    SetScreenSize(f64, f64),
    Reset,
}

fn camera_op_strategy() -> impl Strategy<Value = CameraOp> {
    prop_oneof![
        wild_f64().prop_map(CameraOp::SetScale),
        (wild_f64(), wild_f64()).prop_map(|(x, y)| CameraOp::SetPosition(x, y)),
        (wild_f64(), wild_f64()).prop_map(|(x, y)| CameraOp::Pan(x, y)),
        (wild_f64(), wild_f64()).prop_map(|(w, h)| CameraOp::SetMapSize(w, h)),
        (wild_f64(), wild_f64()).prop_map(|(w, h)| CameraOp::SetScreenSize(w, h)),
        Just(CameraOp::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn camera_invariants_hold_after_any_mutation_sequence(
        ops in prop::collection::vec(camera_op_strategy(), 1..40)
    ) {
        let mut camera = Camera::new(Size::new(1000.0, 1000.0), Size::new(800.0, 600.0), 4.0);

        for op in ops {
            match op {
                CameraOp::SetScale(scale) => camera.set_scale(scale),
                CameraOp::SetPosition(x, y) => camera.set_position(Vec2::new(x, y)),
                CameraOp::Pan(x, y) => camera.pan(Vec2::new(x, y)),
                CameraOp::SetMapSize(w, h) => camera.set_map_size(Size::new(w, h)),
                CameraOp::SetScreenSize(w, h) => camera.set_screen_size(Size::new(w, h)),
                CameraOp::Reset => camera.reset(),
            }

            let (min_scale, max_scale) = camera.scale_range();
            prop_assert!(camera.scale().is_finite());
            prop_assert!(min_scale >= MIN_SCALE_FLOOR);
            prop_assert!(min_scale <= camera.scale() && camera.scale() <= max_scale);

            let position = camera.position();
            let viewport = camera.viewport_size();
            let map = camera.map_size();
            let max_x = (map.width - viewport.width).max(0.0);
            let max_y = (map.height - viewport.height).max(0.0);
            prop_assert!(position.x >= 0.0 && position.x <= max_x);
            prop_assert!(position.y >= 0.0 && position.y <= max_y);
        }
    }
}

// -- Registry mutation sequences --------------------------------------------

const KINDS: [&str; 4] = ["brick", "unit", "projectile", "explosion"];

#[derive(Debug, Clone)]
enum SceneOp {
    Add { kind: usize, x: f64, y: f64 },
    Move { index: usize, x: f64, y: f64 },
    Recolor { index: usize, color: Color },
    SetPayload { index: usize, tip: i32 },
    Remove { index: usize },
    Clear,
    Flush,
}

fn scene_op_strategy() -> impl Strategy<Value = SceneOp> {
    prop_oneof![
        3 => (0..KINDS.len(), wild_f64(), wild_f64())
            .prop_map(|(kind, x, y)| SceneOp::Add { kind, x, y }),
        3 => (0..64usize, wild_f64(), wild_f64())
            .prop_map(|(index, x, y)| SceneOp::Move { index, x, y }),
        2 => (0..64usize, color_strategy())
            .prop_map(|(index, color)| SceneOp::Recolor { index, color }),
        2 => (0..64usize, 0..100i32)
            .prop_map(|(index, tip)| SceneOp::SetPayload { index, tip }),
        2 => (0..64usize).prop_map(|index| SceneOp::Remove { index }),
        1 => Just(SceneOp::Clear),
        3 => Just(SceneOp::Flush),
    ]
}

fn pick(issued: &[ObjectId], index: usize) -> Option<ObjectId> {
    if issued.is_empty() {
        None
    } else {
        Some(issued[index % issued.len()].clone())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Drives a registry with a random op sequence (including mutations
    /// aimed at stale ids) and checks the diff contract at every flush:
    /// the three output sets are mutually exclusive, updated ids were
    /// added in an earlier flushed frame, and no id is removed twice.
    #[test]
    fn flush_outputs_stay_consistent_over_random_op_sequences(
        ops in prop::collection::vec(scene_op_strategy(), 1..60)
    ) {
        let mut scene = SceneRegistry::new(SceneConfig {
            removal_quota: 4,
            removal_flush_interval: Duration::ZERO,
            ..SceneConfig::default()
        });

        let mut issued: Vec<ObjectId> = Vec::new();
        let mut registered: HashSet<ObjectId> = HashSet::new();
        let mut flushed_added: HashSet<ObjectId> = HashSet::new();
        let mut removed_seen: HashSet<ObjectId> = HashSet::new();

        for op in ops {
            match op {
                SceneOp::Add { kind, x, y } => {
                    let id = scene.add_object(
                        KINDS[kind],
                        ObjectData {
                            position: Some(Vec2::new(x, y)),
                            ..ObjectData::default()
                        },
                    );
                    registered.insert(id.clone());
                    issued.push(id);
                }
                SceneOp::Move { index, x, y } => {
                    if let Some(id) = pick(&issued, index) {
                        scene.update_object(
                            &id,
                            ObjectData {
                                position: Some(Vec2::new(x, y)),
                                ..ObjectData::default()
                            },
                        );
                    }
                }
                SceneOp::Recolor { index, color } => {
                    if let Some(id) = pick(&issued, index) {
                        scene.update_object(
                            &id,
                            ObjectData {
                                color: Some(color),
                                ..ObjectData::default()
                            },
                        );
                    }
                }
                SceneOp::SetPayload { index, tip } => {
                    if let Some(id) = pick(&issued, index) {
                        scene.update_object(
                            &id,
                            ObjectData {
                                custom: PayloadPatch::Set(PayloadValue::map([(
                                    "tip",
                                    PayloadValue::Number(f64::from(tip)),
                                )])),
                                ..ObjectData::default()
                            },
                        );
                    }
                }
                SceneOp::Remove { index } => {
                    if let Some(id) = pick(&issued, index) {
                        scene.remove_object(&id);
                    }
                }
                SceneOp::Clear => {
                    scene.clear();
                    registered.clear();
                }
                SceneOp::Flush => {
                    let changes = scene.flush_changes();
                    let added_ids: HashSet<ObjectId> =
                        changes.added.iter().map(|e| e.object.id.clone()).collect();
                    let updated_ids: HashSet<ObjectId> =
                        changes.updated.iter().map(|e| e.object.id.clone()).collect();
                    let removed_ids: HashSet<ObjectId> =
                        changes.removed.iter().cloned().collect();

                    prop_assert_eq!(removed_ids.len(), changes.removed.len());
                    prop_assert!(added_ids.is_disjoint(&updated_ids));
                    prop_assert!(added_ids.is_disjoint(&removed_ids));
                    prop_assert!(updated_ids.is_disjoint(&removed_ids));

                    for id in &updated_ids {
                        prop_assert!(
                            flushed_added.contains(id),
                            "updated id {} was never reported added",
                            id
                        );
                    }
                    for id in &changes.removed {
                        prop_assert!(issued.contains(id));
                        prop_assert!(
                            removed_seen.insert(id.clone()),
                            "id {} was removed twice",
                            id
                        );
                        registered.remove(id);
                    }
                    flushed_added.extend(added_ids);
                }
            }

            // The structural population always matches the shadow model.
            prop_assert_eq!(scene.object_count(), registered.len());

            // Everything the registry stores is already sanitized.
            for object in scene.objects() {
                prop_assert!(object.position.x.is_finite());
                prop_assert!(object.position.y.is_finite());
            }
        }
    }
}
