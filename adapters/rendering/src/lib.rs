#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wheel geometry and presentation contracts for draft wheel adapters.
//!
//! Segments are laid out in roster order from angle zero. Angles are degrees,
//! clockwise in screen space (y grows downwards), with zero on the +x axis.
//! Under a wheel rotation `R` the wheel angle beneath a pointer fixed at
//! screen angle `P` is `(P - R) mod 360`.
//!
//! The draw engine decides who wins. Everything here only has to agree with
//! it: [`resolve_geometric`] answers analytically, while [`WheelRaster`] and
//! [`resolve_by_sampling`] reproduce the pixel-sampling path of a canvas
//! front end so the two can be checked against each other.

use anyhow::Result as AnyResult;
use draft_wheel_core::{
    angular_spans, normalize_degrees, AngularSpan, ContestantName, ContestantSnapshot,
    HistoryEntry, SegmentColor, DEFAULT_POINTER_DEGREES,
};
use glam::Vec2;
use std::{error::Error, fmt};
use tracing::debug;

/// Distance kept free between the end of a label and the rim, in pixels.
pub const LABEL_MARGIN: f32 = 20.0;

/// Inset of the label anchor and marker tip from the rim, in pixels.
pub const LABEL_INSET: f32 = 10.0;

/// Average advance of a glyph in the 16px label font, in pixels.
pub const DEFAULT_GLYPH_WIDTH: f32 = 9.0;

/// Segments must be wider than this, in degrees, to carry a text label.
pub const DEFAULT_MIN_LABEL_SPAN_DEGREES: f64 = 8.0;

/// Largest wheel radius, in pixels, whose raster still fits in memory.
pub const MAX_RADIUS: f32 = 4096.0;

const MARKER_LENGTH: f32 = 20.0;
const MARKER_HALF_WIDTH: f32 = 10.0;
const EDGE_BLEND_PIXELS: f64 = 0.5;

/// Static description of how the wheel is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelPresentation {
    radius: f32,
    pointer_angle: f64,
    min_label_span_degrees: f64,
    glyph_width: f32,
}

impl WheelPresentation {
    /// Creates a validated presentation descriptor.
    pub fn new(
        radius: f32,
        pointer_angle: f64,
        min_label_span_degrees: f64,
        glyph_width: f32,
    ) -> Result<Self, RenderingError> {
        if !(radius.is_finite() && radius > LABEL_MARGIN && radius <= MAX_RADIUS) {
            return Err(RenderingError::InvalidRadius { radius });
        }
        if !pointer_angle.is_finite() {
            return Err(RenderingError::InvalidPointerAngle {
                degrees: pointer_angle,
            });
        }
        if !(min_label_span_degrees.is_finite() && (0.0..360.0).contains(&min_label_span_degrees))
        {
            return Err(RenderingError::InvalidLabelThreshold {
                degrees: min_label_span_degrees,
            });
        }
        if !(glyph_width.is_finite() && glyph_width > 0.0) {
            return Err(RenderingError::InvalidGlyphWidth { width: glyph_width });
        }

        Ok(Self {
            radius,
            pointer_angle: normalize_degrees(pointer_angle),
            min_label_span_degrees,
            glyph_width,
        })
    }

    /// Presentation with the pointer on top and default label settings.
    pub fn with_radius(radius: f32) -> Result<Self, RenderingError> {
        Self::new(
            radius,
            DEFAULT_POINTER_DEGREES,
            DEFAULT_MIN_LABEL_SPAN_DEGREES,
            DEFAULT_GLYPH_WIDTH,
        )
    }

    /// Wheel radius in pixels.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Fixed screen angle of the pointer.
    #[must_use]
    pub const fn pointer_angle(&self) -> f64 {
        self.pointer_angle
    }

    /// Sweep a segment must exceed to carry a text label.
    #[must_use]
    pub const fn min_label_span_degrees(&self) -> f64 {
        self.min_label_span_degrees
    }

    /// Wheel center in raster coordinates.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.radius)
    }

    /// Side length of the square raster that holds the wheel.
    #[must_use]
    pub fn side_pixels(&self) -> u32 {
        (self.radius * 2.0).ceil() as u32
    }

    /// Estimated width of `text` when drawn in the label font.
    #[must_use]
    pub fn estimate_text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.glyph_width
    }

    /// Whether a segment of `sweep_degrees` can show `name` as text.
    #[must_use]
    pub fn label_fits(&self, name: &str, sweep_degrees: f64) -> bool {
        sweep_degrees > self.min_label_span_degrees
            && self.estimate_text_width(name) < self.radius - LABEL_MARGIN
    }

    fn point_at(&self, screen_degrees: f64, distance: f32) -> Vec2 {
        self.center() + direction(screen_degrees) * distance
    }
}

/// How a segment's name is shown on the wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentLabel {
    /// Right-aligned text ending at `anchor`, rotated along the segment's midline.
    Text {
        /// End point of the text in raster coordinates.
        anchor: Vec2,
        /// Screen angle of the baseline.
        rotation_degrees: f64,
    },
    /// Arrow pointing at the segment; the name is listed in the overflow list.
    Marker {
        /// Arrow tip near the rim.
        tip: Vec2,
        /// Base corner on the counter-clockwise side.
        base_left: Vec2,
        /// Base corner on the clockwise side.
        base_right: Vec2,
    },
}

/// Single contestant segment ready for drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelSegment {
    /// Contestant identifier.
    pub name: ContestantName,
    /// Fill color.
    pub color: SegmentColor,
    /// Angular extent on the unrotated wheel.
    pub span: AngularSpan,
    /// Label placement at the layout's rotation.
    pub label: SegmentLabel,
}

/// Drawable wheel: segments in roster order plus names that did not fit.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WheelLayout {
    /// Segments in roster order.
    pub segments: Vec<WheelSegment>,
    /// Names shown as markers, listed alongside the wheel.
    pub overflow_names: Vec<ContestantName>,
}

impl WheelLayout {
    /// Lays out the active contestants at the given wheel rotation.
    #[must_use]
    pub fn new(
        presentation: &WheelPresentation,
        contestants: &[ContestantSnapshot],
        rotation: f64,
    ) -> Self {
        let weights: Vec<f64> = contestants
            .iter()
            .map(|contestant| contestant.weight.get())
            .collect();
        let spans = angular_spans(&weights);

        let mut layout = Self::default();
        for (contestant, span) in contestants.iter().zip(spans) {
            let screen_mid = span.midpoint() + rotation;
            let label = if presentation.label_fits(contestant.name.as_str(), span.sweep()) {
                SegmentLabel::Text {
                    anchor: presentation
                        .point_at(screen_mid, presentation.radius - LABEL_INSET),
                    rotation_degrees: normalize_degrees(screen_mid),
                }
            } else {
                layout.overflow_names.push(contestant.name.clone());
                marker(presentation, screen_mid)
            };
            layout.segments.push(WheelSegment {
                name: contestant.name.clone(),
                color: contestant.color,
                span,
                label,
            });
        }
        layout
    }

    /// Angular spans in segment order.
    #[must_use]
    pub fn spans(&self) -> Vec<AngularSpan> {
        self.segments.iter().map(|segment| segment.span).collect()
    }

    /// Index of the segment covering `wheel_angle`.
    #[must_use]
    pub fn segment_index_at(&self, wheel_angle: f64) -> Option<usize> {
        locate(&self.spans(), wheel_angle)
    }

    /// Whether `color` fills more than one segment.
    #[must_use]
    pub fn is_ambiguous(&self, color: SegmentColor) -> bool {
        self.segments
            .iter()
            .filter(|segment| segment.color == color)
            .nth(1)
            .is_some()
    }

    fn match_color(&self, color: SegmentColor) -> ColorMatch {
        let mut matches = self
            .segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.color == color)
            .map(|(index, _)| index);
        match (matches.next(), matches.next()) {
            (None, _) => ColorMatch::Missing,
            (Some(index), None) => ColorMatch::Unique(index),
            (Some(_), Some(_)) => ColorMatch::Ambiguous,
        }
    }
}

fn marker(presentation: &WheelPresentation, screen_mid: f64) -> SegmentLabel {
    let tip_distance = presentation.radius - LABEL_INSET;
    let base_distance = tip_distance - MARKER_LENGTH;
    let normal = direction(screen_mid + 90.0) * MARKER_HALF_WIDTH;
    let base = presentation.point_at(screen_mid, base_distance);
    SegmentLabel::Marker {
        tip: presentation.point_at(screen_mid, tip_distance),
        base_left: base - normal,
        base_right: base + normal,
    }
}

fn direction(screen_degrees: f64) -> Vec2 {
    let radians = screen_degrees.to_radians();
    Vec2::new(radians.cos() as f32, radians.sin() as f32)
}

// Floating-point slack can leave a sliver past the last span's end.
fn locate(spans: &[AngularSpan], wheel_angle: f64) -> Option<usize> {
    let angle = normalize_degrees(wheel_angle);
    spans
        .iter()
        .position(|span| span.contains(angle))
        .or_else(|| spans.len().checked_sub(1))
}

/// Wheel angle sitting under a pointer at `pointer_angle` after `rotation`.
#[must_use]
pub fn pointer_wheel_angle(rotation: f64, pointer_angle: f64) -> f64 {
    normalize_degrees(pointer_angle - rotation)
}

/// Resolves the segment under the pointer analytically.
#[must_use]
pub fn resolve_geometric(spans: &[AngularSpan], rotation: f64, pointer_angle: f64) -> Option<usize> {
    locate(spans, pointer_wheel_angle(rotation, pointer_angle))
}

/// Raster settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    /// Color outside the wheel.
    pub background: SegmentColor,
    /// Mix colors along segment borders and the rim to mimic antialiasing.
    pub edge_blending: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            background: SegmentColor::from_rgb(0x1b, 0x1b, 0x1f),
            edge_blending: true,
        }
    }
}

/// Software rendering of the rotated wheel's segment fills.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelRaster {
    side: u32,
    pixels: Vec<SegmentColor>,
}

impl WheelRaster {
    /// Rasterises `layout` rotated by `rotation` degrees.
    #[must_use]
    pub fn render(
        presentation: &WheelPresentation,
        layout: &WheelLayout,
        rotation: f64,
        options: RasterOptions,
    ) -> Self {
        let side = presentation.side_pixels();
        let center = presentation.center();
        let radius = f64::from(presentation.radius);
        let spans = layout.spans();
        let mut pixels = Vec::with_capacity((side * side) as usize);

        for y in 0..side {
            for x in 0..side {
                let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let distance = f64::from(offset.length());
                let color = if distance > radius || spans.is_empty() {
                    options.background
                } else {
                    let screen = f64::from(offset.y).atan2(f64::from(offset.x)).to_degrees();
                    shade(layout, &spans, screen - rotation, distance, radius, options)
                };
                pixels.push(color);
            }
        }

        Self { side, pixels }
    }

    /// Width and height of the raster in pixels.
    #[must_use]
    pub const fn side(&self) -> u32 {
        self.side
    }

    /// Color at integer pixel coordinates, if inside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<SegmentColor> {
        if x >= self.side || y >= self.side {
            return None;
        }
        self.pixels.get((y * self.side + x) as usize).copied()
    }

    /// Color of the pixel containing `point`, if inside the raster.
    #[must_use]
    pub fn sample(&self, point: Vec2) -> Option<SegmentColor> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        self.pixel(point.x.floor() as u32, point.y.floor() as u32)
    }
}

fn shade(
    layout: &WheelLayout,
    spans: &[AngularSpan],
    wheel_angle: f64,
    distance: f64,
    radius: f64,
    options: RasterOptions,
) -> SegmentColor {
    let angle = normalize_degrees(wheel_angle);
    let Some(index) = locate(spans, angle) else {
        return options.background;
    };
    let fill = layout.segments[index].color;
    if !options.edge_blending {
        return fill;
    }

    if radius - distance < EDGE_BLEND_PIXELS {
        return mix(fill, options.background);
    }

    if spans.len() > 1 {
        let span = spans[index];
        let from_start = (angle - span.start()).max(0.0);
        let to_end = (span.end() - angle).max(0.0);
        let arc_pixels = |degrees: f64| degrees.to_radians() * distance;
        if arc_pixels(from_start) < EDGE_BLEND_PIXELS {
            let previous = (index + spans.len() - 1) % spans.len();
            return mix(fill, layout.segments[previous].color);
        }
        if arc_pixels(to_end) < EDGE_BLEND_PIXELS {
            let next = (index + 1) % spans.len();
            return mix(fill, layout.segments[next].color);
        }
    }
    fill
}

fn mix(a: SegmentColor, b: SegmentColor) -> SegmentColor {
    let average = |x: u8, y: u8| ((u16::from(x) + u16::from(y)) / 2) as u8;
    SegmentColor::from_rgb(
        average(a.red(), b.red()),
        average(a.green(), b.green()),
        average(a.blue(), b.blue()),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorMatch {
    Missing,
    Unique(usize),
    Ambiguous,
}

/// Where and how far the pixel resolver looks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerProbe {
    sample_distance: f32,
    max_scan_pixels: u32,
}

impl PointerProbe {
    /// Creates a probe sampling `sample_distance` pixels from the center
    /// along the pointer direction, then scanning up to `max_scan_pixels`
    /// towards the center.
    pub fn new(sample_distance: f32, max_scan_pixels: u32) -> Result<Self, RenderingError> {
        if !(sample_distance.is_finite() && sample_distance >= 0.0) {
            return Err(RenderingError::InvalidProbe {
                sample_distance,
            });
        }
        Ok(Self {
            sample_distance,
            max_scan_pixels,
        })
    }

    /// Probe sampling just inside the rim, clear of labels and the border blend.
    #[must_use]
    pub fn for_presentation(presentation: &WheelPresentation) -> Self {
        Self {
            sample_distance: presentation.radius * 0.85,
            max_scan_pixels: 16,
        }
    }
}

/// Path that produced a pixel-based resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionMethod {
    /// The pixel under the pointer matched a contestant color exactly.
    Sampled,
    /// A pixel found while scanning inwards matched.
    Scanned {
        /// Pixels stepped before the match.
        steps: u32,
    },
    /// No usable color was found, or colors were ambiguous.
    Geometric,
}

/// Segment chosen by the pixel resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Index of the segment under the pointer.
    pub index: usize,
    /// Path that produced the answer.
    pub method: ResolutionMethod,
}

/// Resolves the segment under the pointer by sampling a rendered wheel.
///
/// The pixel at the probe point is matched against segment colors. A miss
/// scans pixel by pixel towards the wheel center along the pointer's axis,
/// which keeps the wheel angle fixed. If nothing matches, or the matching
/// color belongs to several contestants, the geometric answer is used.
#[must_use]
pub fn resolve_by_sampling(
    raster: &WheelRaster,
    layout: &WheelLayout,
    presentation: &WheelPresentation,
    rotation: f64,
    probe: PointerProbe,
) -> Option<Resolution> {
    let geometric = resolve_geometric(&layout.spans(), rotation, presentation.pointer_angle)?;
    let fallback = Resolution {
        index: geometric,
        method: ResolutionMethod::Geometric,
    };

    let outward = direction(presentation.pointer_angle);
    let origin = presentation.center() + outward * probe.sample_distance;
    for steps in 0..=probe.max_scan_pixels {
        let point = origin - outward * steps as f32;
        let Some(color) = raster.sample(point) else {
            continue;
        };
        match layout.match_color(color) {
            ColorMatch::Missing => {}
            ColorMatch::Ambiguous => {
                debug!(%color, "ambiguous pointer color, using geometry");
                return Some(fallback);
            }
            ColorMatch::Unique(index) => {
                let method = if steps == 0 {
                    ResolutionMethod::Sampled
                } else {
                    ResolutionMethod::Scanned { steps }
                };
                return Some(Resolution { index, method });
            }
        }
    }

    debug!(
        max_scan_pixels = probe.max_scan_pixels,
        "no contestant color under pointer, using geometry"
    );
    Some(fallback)
}

/// Frame handed to a rendering backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Wheel laid out at the current rotation.
    pub layout: WheelLayout,
    /// Current wheel rotation in degrees.
    pub rotation: f64,
    /// Fraction of the running spin that has elapsed, if one is running.
    pub spin_progress: Option<f64>,
    /// Most recent committed winner.
    pub winner: Option<HistoryEntry>,
    /// Draws left in the session.
    pub remaining_draws: u32,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Heading shown above the wheel.
    pub title: String,
    /// Wheel geometry.
    pub wheel: WheelPresentation,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, wheel: WheelPresentation) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            wheel,
        }
    }
}

/// Rendering backend capable of presenting wheel scenes.
pub trait RenderingBackend {
    /// Shows a single scene.
    fn present(&mut self, presentation: &Presentation, scene: &Scene) -> AnyResult<()>;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// The radius must leave room for the label margin and stay rasterisable.
    InvalidRadius {
        /// Radius that failed validation.
        radius: f32,
    },
    /// Pointer angle was not finite.
    InvalidPointerAngle {
        /// Angle that failed validation.
        degrees: f64,
    },
    /// Label threshold must lie in `[0, 360)`.
    InvalidLabelThreshold {
        /// Threshold that failed validation.
        degrees: f64,
    },
    /// Glyph width must be positive.
    InvalidGlyphWidth {
        /// Width that failed validation.
        width: f32,
    },
    /// Probe distance must be non-negative.
    InvalidProbe {
        /// Distance that failed validation.
        sample_distance: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRadius { radius } => write!(
                f,
                "wheel radius must lie in ({LABEL_MARGIN}, {MAX_RADIUS}] pixels (received {radius})"
            ),
            Self::InvalidPointerAngle { degrees } => {
                write!(f, "pointer angle must be finite (received {degrees})")
            }
            Self::InvalidLabelThreshold { degrees } => write!(
                f,
                "label threshold must lie in [0, 360) degrees (received {degrees})"
            ),
            Self::InvalidGlyphWidth { width } => {
                write!(f, "glyph width must be positive (received {width})")
            }
            Self::InvalidProbe { sample_distance } => write!(
                f,
                "probe distance must be non-negative (received {sample_distance})"
            ),
        }
    }
}

impl Error for RenderingError {}
