//! Headless brick-siege demo -- units shell a brick wall while a mock
//! renderer consumes the per-frame diffs.
//!
//! Run with:
//!   cargo run --example brick_siege -p kiln-scene
//!
//! The mock renderer stands in for the GPU surface: it retains objects by
//! id, enforces the added -> updated -> removed apply order, and counts
//! buffer operations. Payload buffers whose snapshot allocation did not
//! move between frames are skipped, which is the point of the diff cache.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use kiln_scene::prelude::*;

// ---------------------------------------------------------------------------
// Mock renderer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockRenderer {
    retained: HashMap<ObjectId, RenderObject>,
    buffer_allocs: usize,
    buffer_writes: usize,
    buffer_reuses: usize,
    buffer_frees: usize,
    unknown_removals: usize,
}

impl MockRenderer {
    /// Applies one frame in the contract order: added, updated, removed.
    fn apply(&mut self, changes: &FrameChanges) -> Result<(), anyhow::Error> {
        for entry in &changes.added {
            anyhow::ensure!(
                !self.retained.contains_key(&entry.object.id),
                "added id {} is already retained",
                entry.object.id
            );
            self.buffer_allocs += count_buffers(entry.custom.as_ref());
            self.retained.insert(entry.object.id.clone(), entry.clone());
        }
        for entry in &changes.updated {
            let previous = self.retained.get(&entry.object.id);
            anyhow::ensure!(
                previous.is_some(),
                "updated id {} was never added",
                entry.object.id
            );
            let (writes, reuses) = buffer_ops(
                previous.and_then(|p| p.custom.as_ref()),
                entry.custom.as_ref(),
            );
            self.buffer_writes += writes;
            self.buffer_reuses += reuses;
            self.retained.insert(entry.object.id.clone(), entry.clone());
        }
        for id in &changes.removed {
            // Removals may name ids that lived less than one reporting
            // window; those are no-ops by contract.
            match self.retained.remove(id) {
                Some(entry) => self.buffer_frees += count_buffers(entry.custom.as_ref()),
                None => self.unknown_removals += 1,
            }
        }
        Ok(())
    }
}

fn count_buffers(payload: Option<&PayloadSnapshot>) -> usize {
    let Some(map) = payload.and_then(PayloadSnapshot::as_map) else {
        return 0;
    };
    map.values().filter(|value| is_buffer(value)).count()
}

/// Per top-level buffer field: rewrite when the snapshot allocation moved,
/// skip when it is the same allocation as last frame.
fn buffer_ops(
    previous: Option<&PayloadSnapshot>,
    next: Option<&PayloadSnapshot>,
) -> (usize, usize) {
    let Some(map) = next.and_then(PayloadSnapshot::as_map) else {
        return (0, 0);
    };
    let mut writes = 0;
    let mut reuses = 0;
    for (key, value) in map {
        if !is_buffer(value) {
            continue;
        }
        match previous.and_then(|p| p.get(key)) {
            Some(old) if old.ptr_eq(value) => reuses += 1,
            _ => writes += 1,
        }
    }
    (writes, reuses)
}

fn is_buffer(value: &PayloadSnapshot) -> bool {
    value.as_float_buffer().is_some() || value.as_uint_buffer().is_some()
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

struct Brick {
    id: ObjectId,
    hits: u32,
    alive: bool,
}

struct Shell {
    id: ObjectId,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    target: usize,
    trail: Vec<f32>,
}

struct Explosion {
    id: ObjectId,
    ticks_left: u32,
    size: f64,
}

const WALL_X: f64 = 960.0;
const HITS_TO_DESTROY: u32 = 3;

fn brick_color(row: usize) -> Color {
    Color::rgb(0.75 - 0.08 * row as f32, 0.30, 0.22)
}

fn build_wall(scene: &mut SceneRegistry) -> Vec<Brick> {
    let mut bricks = Vec::new();
    for row in 0..6 {
        for col in 0..4 {
            let id = scene.add_object(
                "brick",
                ObjectData {
                    position: Some(Vec2::new(WALL_X + col as f64 * 26.0, 520.0 + row as f64 * 14.0)),
                    size: Some(Size::new(24.0, 12.0)),
                    color: Some(brick_color(row)),
                    stroke: Some(Stroke {
                        color: Color::rgb(0.1, 0.05, 0.05),
                        width: 1.0,
                    }),
                    custom: PayloadPatch::Set(PayloadValue::map([
                        ("hp", PayloadValue::from(HITS_TO_DESTROY as f64)),
                        ("impacts", PayloadValue::UintBuffer(Vec::new())),
                    ])),
                    ..ObjectData::default()
                },
            );
            bricks.push(Brick {
                id,
                hits: 0,
                alive: true,
            });
        }
    }
    bricks
}

fn spawn_units(scene: &mut SceneRegistry) -> Vec<ObjectId> {
    (0..4)
        .map(|idx| {
            scene.add_object(
                "unit",
                ObjectData {
                    position: Some(Vec2::new(80.0, 420.0 + idx as f64 * 60.0)),
                    size: Some(Size::new(16.0, 16.0)),
                    color: Some(Color::rgb(0.2, 0.55, 0.9)),
                    custom: PayloadPatch::Set(unit_payload(idx, 0.0)),
                    ..ObjectData::default()
                },
            )
        })
        .collect()
}

/// The loadout buffer never changes; only the heat scalar does. The diff
/// cache keeps the buffer allocation stable, so the renderer skips it.
fn unit_payload(idx: usize, heat: f64) -> PayloadValue {
    PayloadValue::map([
        (
            "loadout",
            PayloadValue::UintBuffer(vec![idx as u32, 40, 40, 7]),
        ),
        ("heat", PayloadValue::Number(heat)),
    ])
}

fn shell_payload(shell: &Shell) -> PayloadValue {
    PayloadValue::map([
        ("trail", PayloadValue::FloatBuffer(shell.trail.clone())),
        ("kind", PayloadValue::from("mortar")),
    ])
}

fn explosion_fill(intensity: f32) -> Fill {
    Fill {
        paint: Paint::Solid {
            color: Color::rgba(1.0, 0.6, 0.15, 0.9),
        },
        noise: Some(Noise {
            intensity,
            scale: 3.0,
            seed: 11,
        }),
        filament: Some(Filament {
            color: Color::rgb(1.0, 0.9, 0.5),
            density: 0.4,
            seed: 11,
        }),
        crack_mask: None,
    }
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut scene = SceneRegistry::new(SceneConfig {
        map_size: Size::new(1200.0, 800.0),
        screen_size: Size::new(800.0, 600.0),
        max_scale: 3.0,
        removal_flush_interval: Duration::from_millis(50),
        ..SceneConfig::default()
    });
    let mut renderer = MockRenderer::default();

    let mut bricks = build_wall(&mut scene);
    let units = spawn_units(&mut scene);
    println!(
        "brick siege: {} bricks, {} units, map {:?}",
        bricks.len(),
        units.len(),
        scene.map_size()
    );

    let mut shells: Vec<Shell> = Vec::new();
    let mut explosions: Vec<Explosion> = Vec::new();
    let mut shots_fired = 0usize;
    let mut bricks_destroyed = 0usize;

    for tick in 0..300u32 {
        // -- 1. Units bob in place and build up heat --
        for (idx, id) in units.iter().enumerate() {
            let t = f64::from(tick);
            scene.update_object(
                id,
                ObjectData {
                    position: Some(Vec2::new(
                        80.0,
                        420.0 + idx as f64 * 60.0 + 18.0 * (t * 0.08 + idx as f64).sin(),
                    )),
                    custom: PayloadPatch::Set(unit_payload(idx, (t * 0.05).sin().abs())),
                    ..ObjectData::default()
                },
            );
        }

        // -- 2. Fire mortars on a per-unit cadence --
        for (idx, _) in units.iter().enumerate() {
            if tick % (20 + idx as u32 * 7) != 5 {
                continue;
            }
            let target = (shots_fired * 7) % bricks.len();
            let id = scene.add_object(
                "projectile",
                ObjectData {
                    position: Some(Vec2::new(96.0, 420.0 + idx as f64 * 60.0)),
                    size: Some(Size::new(6.0, 3.0)),
                    color: Some(Color::rgb(0.9, 0.9, 0.3)),
                    ..ObjectData::default()
                },
            );
            shells.push(Shell {
                id,
                x: 96.0,
                y: 420.0 + idx as f64 * 60.0,
                vx: 30.0,
                vy: -9.0,
                target,
                trail: Vec::new(),
            });
            shots_fired += 1;
        }

        // -- 3. Integrate shells and resolve impacts --
        let mut exploded: Vec<Shell> = Vec::new();
        let mut flying: Vec<Shell> = Vec::new();
        for mut shell in shells {
            shell.x += shell.vx;
            shell.y += shell.vy;
            shell.vy += 0.55;
            shell.trail.push(shell.x as f32);
            shell.trail.push(shell.y as f32);
            if shell.trail.len() > 16 {
                shell.trail.drain(0..2);
            }
            if shell.x >= WALL_X || shell.y > 800.0 {
                exploded.push(shell);
            } else {
                let rotation = shell.vy.atan2(shell.vx);
                scene.update_object(
                    &shell.id,
                    ObjectData {
                        position: Some(Vec2::new(shell.x, shell.y)),
                        rotation: Some(rotation),
                        custom: PayloadPatch::Set(shell_payload(&shell)),
                        ..ObjectData::default()
                    },
                );
                flying.push(shell);
            }
        }
        shells = flying;

        for shell in exploded {
            scene.remove_object(&shell.id);
            let Some(brick) = nearest_alive(&mut bricks, shell.target) else {
                continue;
            };
            brick.hits += 1;
            if brick.hits >= HITS_TO_DESTROY {
                brick.alive = false;
                bricks_destroyed += 1;
                let position = scene
                    .get_object(&brick.id)
                    .map(|object| object.position)
                    .unwrap_or(Vec2::new(WALL_X, 560.0));
                scene.remove_object(&brick.id);
                let id = scene.add_object(
                    "explosion",
                    ObjectData {
                        position: Some(position),
                        size: Some(Size::new(6.0, 6.0)),
                        fill: Some(explosion_fill(1.0)),
                        ..ObjectData::default()
                    },
                );
                explosions.push(Explosion {
                    id,
                    ticks_left: 10,
                    size: 6.0,
                });
            } else {
                let progress = brick.hits as f32 / HITS_TO_DESTROY as f32;
                scene.update_object(
                    &brick.id,
                    ObjectData {
                        fill: Some(Fill {
                            paint: Paint::Solid {
                                color: brick_color(0),
                            },
                            noise: None,
                            filament: None,
                            crack_mask: Some(CrackMask {
                                progress,
                                seed: 3,
                            }),
                        }),
                        custom: PayloadPatch::Set(PayloadValue::map([
                            (
                                "hp",
                                PayloadValue::from(f64::from(HITS_TO_DESTROY - brick.hits)),
                            ),
                            ("impacts", PayloadValue::UintBuffer(vec![tick])),
                        ])),
                        ..ObjectData::default()
                    },
                );
            }
        }

        // -- 4. Explosions flare out and disappear --
        explosions.retain_mut(|explosion| {
            explosion.ticks_left -= 1;
            if explosion.ticks_left == 0 {
                scene.remove_object(&explosion.id);
                return false;
            }
            explosion.size += 4.0;
            scene.update_object(
                &explosion.id,
                ObjectData {
                    size: Some(Size::new(explosion.size, explosion.size)),
                    fill: Some(explosion_fill(explosion.ticks_left as f32 / 10.0)),
                    ..ObjectData::default()
                },
            );
            true
        });

        // -- 5. Camera drifts toward the wall and breathes --
        scene.pan_camera(Vec2::new(0.8, 0.2));
        scene.set_scale(1.1 + 0.2 * (f64::from(tick) * 0.02).sin());

        // -- 6. Flush and render --
        let changes = scene.flush_changes();
        renderer.apply(&changes)?;

        if tick % 60 == 0 {
            let d = scene.last_flush_diagnostics();
            println!(
                "tick {tick:>3}: +{} ~{} -{} (pending {}, batch {}, {:?})",
                d.added, d.updated, d.removed, d.pending_removals, d.removal_batch, d.flush_time
            );
        }

        thread::sleep(Duration::from_millis(4));
    }

    // Tear the level down; everything still known is reported removed.
    scene.clear();
    renderer.apply(&scene.flush_changes())?;
    anyhow::ensure!(
        renderer.retained.is_empty(),
        "renderer still retains {} objects after clear",
        renderer.retained.len()
    );

    println!(
        "done: {shots_fired} shells fired, {bricks_destroyed}/{} bricks destroyed",
        bricks.len()
    );
    println!(
        "renderer: {} buffer allocs, {} writes, {} reuses, {} frees, {} unknown removals",
        renderer.buffer_allocs,
        renderer.buffer_writes,
        renderer.buffer_reuses,
        renderer.buffer_frees,
        renderer.unknown_removals
    );
    Ok(())
}

fn nearest_alive(bricks: &mut [Brick], target: usize) -> Option<&mut Brick> {
    let len = bricks.len();
    (0..len)
        .map(|offset| (target + offset) % len)
        .find(|&idx| bricks[idx].alive)
        .map(|idx| &mut bricks[idx])
}
