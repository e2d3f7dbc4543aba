//! Fill, color, and stroke model with tolerant sanitization.
//!
//! Simulation modules hand the registry loosely-validated appearance data
//! (often straight from level templates). Nothing here rejects input: the
//! sanitizers clamp numeric fields into range, sort gradient stops, drop
//! non-finite geometry, and fall back to sensible defaults, so a malformed
//! template yields a wrong-looking object rather than a crash or a skipped
//! frame. All three sanitizers are pure and idempotent.
//!
//! The serde shapes match the flat fill records used by level data:
//! `{"type": "linear-gradient", "stops": [...], "noise": {...}}`.

use crate::object::Vec2;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// RGBA color with `f32` channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Opacity; defaults to 1 when absent in serialized data.
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

impl Color {
    /// Opaque white, the fallback primary color.
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    /// Fully transparent. Objects pending removal are forced to this.
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque color from RGB channels, clamped into range.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        sanitize_color(Color { r, g, b, a: 1.0 })
    }

    /// Color from RGBA channels, clamped into range.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        sanitize_color(Color { r, g, b, a })
    }
}

// ---------------------------------------------------------------------------
// Paint
// ---------------------------------------------------------------------------

/// One stop of a gradient. `offset` lies in `[0, 1]` after sanitization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

/// The base paint of a fill.
///
/// Gradient geometry (anchor points, radius) is optional; renderers derive
/// defaults from the object's bounds when it is absent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Paint {
    /// Uniform color.
    Solid { color: Color },
    /// Linear gradient between two anchor points.
    LinearGradient {
        #[serde(default)]
        start: Option<Vec2>,
        #[serde(default)]
        end: Option<Vec2>,
        stops: Vec<GradientStop>,
    },
    /// Circular gradient around a center.
    RadialGradient {
        #[serde(default)]
        center: Option<Vec2>,
        #[serde(default)]
        radius: Option<f64>,
        stops: Vec<GradientStop>,
    },
    /// Diamond-shaped gradient around a center.
    DiamondGradient {
        #[serde(default)]
        center: Option<Vec2>,
        #[serde(default)]
        radius: Option<f64>,
        stops: Vec<GradientStop>,
    },
}

// ---------------------------------------------------------------------------
// Fill modifiers
// ---------------------------------------------------------------------------

/// Procedural noise overlaid on a fill.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Noise {
    /// Blend strength in `[0, 1]`.
    pub intensity: f32,
    /// Feature size in map units; positive.
    #[serde(default = "default_noise_scale")]
    pub scale: f64,
    #[serde(default)]
    pub seed: u32,
}

fn default_noise_scale() -> f64 {
    1.0
}

/// Thin bright strands overlaid on a fill (energy and explosion effects).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Filament {
    pub color: Color,
    /// Strand coverage in `[0, 1]`.
    pub density: f32,
    #[serde(default)]
    pub seed: u32,
}

/// Damage crack overlay. `progress` 0 shows none, 1 fully cracked.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CrackMask {
    pub progress: f32,
    #[serde(default)]
    pub seed: u32,
}

// ---------------------------------------------------------------------------
// Fill
// ---------------------------------------------------------------------------

/// Canonical fill: a base paint plus optional modifiers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    #[serde(flatten)]
    pub paint: Paint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<Noise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filament: Option<Filament>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crack_mask: Option<CrackMask>,
}

impl Fill {
    /// A plain solid fill with no modifiers.
    pub fn solid(color: Color) -> Self {
        Fill {
            paint: Paint::Solid { color },
            noise: None,
            filament: None,
            crack_mask: None,
        }
    }

    /// The fill's primary color: the solid color, or the first gradient
    /// stop. White if a gradient somehow carries no stops.
    pub fn primary_color(&self) -> Color {
        match &self.paint {
            Paint::Solid { color } => *color,
            Paint::LinearGradient { stops, .. }
            | Paint::RadialGradient { stops, .. }
            | Paint::DiamondGradient { stops, .. } => {
                stops.first().map(|stop| stop.color).unwrap_or(Color::WHITE)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stroke
// ---------------------------------------------------------------------------

/// Object outline. Only strokes with finite positive width exist after
/// sanitization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub color: Color,
    /// Width in map units.
    pub width: f64,
}

// ---------------------------------------------------------------------------
// Sanitizers
// ---------------------------------------------------------------------------

/// Clamps every channel into `[0, 1]`. NaN red/green/blue become 0; NaN
/// alpha becomes 1 (visible is the tolerant default).
pub fn sanitize_color(color: Color) -> Color {
    Color {
        r: clamp_channel(color.r, 0.0),
        g: clamp_channel(color.g, 0.0),
        b: clamp_channel(color.b, 0.0),
        a: clamp_channel(color.a, 1.0),
    }
}

/// Normalizes a fill: clamps nested colors and offsets, sorts stops by
/// offset (stable), guarantees at least one stop, drops non-finite gradient
/// geometry, and clamps modifier fields.
pub fn sanitize_fill(mut fill: Fill) -> Fill {
    match &mut fill.paint {
        Paint::Solid { color } => *color = sanitize_color(*color),
        Paint::LinearGradient { start, end, stops } => {
            *start = sanitize_anchor(*start);
            *end = sanitize_anchor(*end);
            sanitize_stops(stops);
        }
        Paint::RadialGradient {
            center,
            radius,
            stops,
        }
        | Paint::DiamondGradient {
            center,
            radius,
            stops,
        } => {
            *center = sanitize_anchor(*center);
            *radius = sanitize_radius(*radius);
            sanitize_stops(stops);
        }
    }
    fill.noise = fill.noise.map(sanitize_noise);
    fill.filament = fill.filament.map(sanitize_filament);
    fill.crack_mask = fill.crack_mask.map(sanitize_crack_mask);
    fill
}

/// Returns `None` unless the stroke width is a finite positive number;
/// otherwise clamps the stroke color and keeps the width.
pub fn sanitize_stroke(stroke: Option<Stroke>) -> Option<Stroke> {
    let stroke = stroke?;
    if !stroke.width.is_finite() || stroke.width <= 0.0 {
        return None;
    }
    Some(Stroke {
        color: sanitize_color(stroke.color),
        width: stroke.width,
    })
}

fn clamp_channel(value: f32, nan_fallback: f32) -> f32 {
    if value.is_nan() {
        nan_fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn clamp_offset(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn sanitize_anchor(point: Option<Vec2>) -> Option<Vec2> {
    point.filter(|p| p.x.is_finite() && p.y.is_finite())
}

fn sanitize_radius(radius: Option<f64>) -> Option<f64> {
    radius.filter(|r| r.is_finite() && *r > 0.0)
}

fn sanitize_stops(stops: &mut Vec<GradientStop>) {
    for stop in stops.iter_mut() {
        stop.offset = clamp_offset(stop.offset);
        stop.color = sanitize_color(stop.color);
    }
    // Stable sort: equal offsets keep their authored order.
    stops.sort_by(|a, b| {
        a.offset
            .partial_cmp(&b.offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if stops.is_empty() {
        stops.push(GradientStop {
            offset: 0.0,
            color: Color::WHITE,
        });
    }
}

fn sanitize_noise(noise: Noise) -> Noise {
    Noise {
        intensity: clamp_channel(noise.intensity, 0.0),
        scale: if noise.scale.is_finite() && noise.scale > 0.0 {
            noise.scale
        } else {
            default_noise_scale()
        },
        seed: noise.seed,
    }
}

fn sanitize_filament(filament: Filament) -> Filament {
    Filament {
        color: sanitize_color(filament.color),
        density: clamp_channel(filament.density, 0.0),
        seed: filament.seed,
    }
}

fn sanitize_crack_mask(mask: CrackMask) -> CrackMask {
    CrackMask {
        progress: clamp_channel(mask.progress, 0.0),
        seed: mask.seed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(stops: Vec<GradientStop>) -> Fill {
        Fill {
            paint: Paint::LinearGradient {
                start: Some(Vec2::new(0.0, 0.0)),
                end: Some(Vec2::new(1.0, 0.0)),
                stops,
            },
            noise: None,
            filament: None,
            crack_mask: None,
        }
    }

    // -- 1. color ------------------------------------------------------------

    #[test]
    fn color_channels_clamp_into_unit_range() {
        let color = sanitize_color(Color {
            r: -0.5,
            g: 1.5,
            b: 0.25,
            a: 2.0,
        });
        assert_eq!(color, Color::rgba(0.0, 1.0, 0.25, 1.0));
    }

    #[test]
    fn nan_channels_fall_back_visible() {
        let color = sanitize_color(Color {
            r: f32::NAN,
            g: 0.5,
            b: 0.5,
            a: f32::NAN,
        });
        assert_eq!(color.r, 0.0);
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn infinite_channels_clamp_rather_than_reset() {
        let color = sanitize_color(Color {
            r: f32::INFINITY,
            g: f32::NEG_INFINITY,
            b: 0.0,
            a: 1.0,
        });
        assert_eq!(color.r, 1.0);
        assert_eq!(color.g, 0.0);
    }

    // -- 2. fills ------------------------------------------------------------

    #[test]
    fn stops_are_clamped_and_sorted() {
        let fill = sanitize_fill(gradient(vec![
            GradientStop {
                offset: 0.9,
                color: Color::WHITE,
            },
            GradientStop {
                offset: -0.2,
                color: Color::rgb(1.0, 0.0, 0.0),
            },
            GradientStop {
                offset: 1.7,
                color: Color::rgb(0.0, 1.0, 0.0),
            },
        ]));
        match &fill.paint {
            Paint::LinearGradient { stops, .. } => {
                let offsets: Vec<f64> = stops.iter().map(|s| s.offset).collect();
                assert_eq!(offsets, vec![0.0, 0.9, 1.0]);
                assert_eq!(stops[0].color, Color::rgb(1.0, 0.0, 0.0));
            }
            other => panic!("expected linear gradient, got {other:?}"),
        }
    }

    #[test]
    fn empty_stop_list_gains_a_default_stop() {
        let fill = sanitize_fill(gradient(vec![]));
        assert_eq!(fill.primary_color(), Color::WHITE);
        match &fill.paint {
            Paint::LinearGradient { stops, .. } => assert_eq!(stops.len(), 1),
            other => panic!("expected linear gradient, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_gradient_geometry_is_dropped() {
        let fill = sanitize_fill(Fill {
            paint: Paint::RadialGradient {
                center: Some(Vec2::new(f64::NAN, 0.0)),
                radius: Some(f64::INFINITY),
                stops: vec![GradientStop {
                    offset: 0.0,
                    color: Color::WHITE,
                }],
            },
            noise: None,
            filament: None,
            crack_mask: None,
        });
        match &fill.paint {
            Paint::RadialGradient { center, radius, .. } => {
                assert!(center.is_none());
                assert!(radius.is_none());
            }
            other => panic!("expected radial gradient, got {other:?}"),
        }
    }

    #[test]
    fn modifier_fields_clamp() {
        let mut fill = Fill::solid(Color::WHITE);
        fill.noise = Some(Noise {
            intensity: 3.0,
            scale: -1.0,
            seed: 7,
        });
        fill.crack_mask = Some(CrackMask {
            progress: f32::NAN,
            seed: 0,
        });
        let fill = sanitize_fill(fill);
        let noise = fill.noise.unwrap();
        assert_eq!(noise.intensity, 1.0);
        assert_eq!(noise.scale, 1.0);
        assert_eq!(noise.seed, 7);
        assert_eq!(fill.crack_mask.unwrap().progress, 0.0);
    }

    #[test]
    fn sanitizers_are_idempotent() {
        let messy = Fill {
            paint: Paint::DiamondGradient {
                center: Some(Vec2::new(f64::INFINITY, 2.0)),
                radius: Some(-3.0),
                stops: vec![
                    GradientStop {
                        offset: 2.0,
                        color: Color {
                            r: 9.0,
                            g: -1.0,
                            b: f32::NAN,
                            a: 0.5,
                        },
                    },
                    GradientStop {
                        offset: 0.5,
                        color: Color::WHITE,
                    },
                ],
            },
            noise: Some(Noise {
                intensity: -2.0,
                scale: f64::NAN,
                seed: 1,
            }),
            filament: None,
            crack_mask: None,
        };
        let once = sanitize_fill(messy.clone());
        assert_eq!(sanitize_fill(once.clone()), once);

        let color = Color {
            r: 5.0,
            g: f32::NAN,
            b: -1.0,
            a: 0.0,
        };
        assert_eq!(sanitize_color(sanitize_color(color)), sanitize_color(color));

        let stroke = Some(Stroke {
            color,
            width: 2.0,
        });
        assert_eq!(sanitize_stroke(sanitize_stroke(stroke)), sanitize_stroke(stroke));
    }

    // -- 3. strokes ----------------------------------------------------------

    #[test]
    fn non_positive_or_non_finite_widths_clear_the_stroke() {
        for width in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let stroke = sanitize_stroke(Some(Stroke {
                color: Color::WHITE,
                width,
            }));
            assert!(stroke.is_none(), "width {width} should clear the stroke");
        }
        assert!(sanitize_stroke(None).is_none());
        assert!(sanitize_stroke(Some(Stroke {
            color: Color::WHITE,
            width: 1.5,
        }))
        .is_some());
    }

    // -- 4. serde shape ------------------------------------------------------

    #[test]
    fn fill_serializes_to_flat_tagged_records() {
        let fill = Fill::solid(Color::rgb(1.0, 0.0, 0.0));
        let json = serde_json::to_value(&fill).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "solid",
                "color": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 },
            })
        );
    }

    #[test]
    fn alpha_defaults_to_opaque_on_deserialization() {
        let color: Color = serde_json::from_value(serde_json::json!({
            "r": 0.2, "g": 0.4, "b": 0.6,
        }))
        .unwrap();
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn gradient_deserializes_from_template_shape() {
        let fill: Fill = serde_json::from_value(serde_json::json!({
            "type": "linear-gradient",
            "stops": [
                { "offset": 0.0, "color": { "r": 1.0, "g": 0.0, "b": 0.0 } },
                { "offset": 1.0, "color": { "r": 0.0, "g": 0.0, "b": 1.0 } },
            ],
            "noise": { "intensity": 0.3 },
        }))
        .unwrap();
        match &fill.paint {
            Paint::LinearGradient { start, end, stops } => {
                assert!(start.is_none());
                assert!(end.is_none());
                assert_eq!(stops.len(), 2);
            }
            other => panic!("expected linear gradient, got {other:?}"),
        }
        let noise = fill.noise.unwrap();
        assert_eq!(noise.intensity, 0.3);
        assert_eq!(noise.scale, 1.0);
        assert_eq!(noise.seed, 0);
    }
}
