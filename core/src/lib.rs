#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the draft wheel engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative draw state, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems
//! and presentation layers to react to. The weight and angle arithmetic that
//! both the draw engine and the wheel geometry depend on lives here so the two
//! sides can never disagree about where a segment starts.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Fantasy Draft.";

/// Number of degrees in a full turn of the wheel.
pub const FULL_TURN_DEGREES: f64 = 360.0;

/// Screen angle of the pointer when it sits at the top of the wheel.
///
/// Angles grow clockwise in screen space with 0 degrees on the +x axis.
pub const DEFAULT_POINTER_DEGREES: f64 = 270.0;

/// Commands that express all permissible draw state mutations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Selects a winner using the supplied roll without committing it.
    Draw {
        /// Point on the cumulative weight line, drawn from `[0, total)`.
        roll: Roll,
    },
    /// Commits the pending winner: records history and redistributes weight.
    Acknowledge,
    /// Restores the original roster and clears all progress.
    Reset,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A winner was selected and awaits acknowledgement.
    WinnerSelected {
        /// Selection details including the target wheel angle.
        selection: Selection,
    },
    /// The pending winner was committed to the draw history.
    DrawCommitted {
        /// History entry appended for the winner.
        entry: HistoryEntry,
        /// Draws left after the commit.
        remaining_draws: u32,
    },
    /// The draw state was restored to its initial roster.
    DrawReset {
        /// Draw budget restored by the reset.
        remaining_draws: u32,
    },
    /// A command was refused without mutating state.
    DrawRejected {
        /// Specific reason the command failed.
        reason: DrawError,
    },
}

/// Reasons a draw state command may be refused.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum DrawError {
    /// Every draw in the session has already been made.
    #[error("no draws remain in this session")]
    Exhausted,
    /// A winner was selected but has not been acknowledged yet.
    #[error("a draw is already awaiting acknowledgement")]
    AlreadyInFlight,
    /// No active contestants are left to draw from.
    #[error("no active contestants remain")]
    EmptyRoster,
    /// A command referenced a contestant that is not in the active set.
    #[error("contestant `{0}` is not active")]
    UnknownContestant(ContestantName),
    /// Acknowledgement was requested while nothing was pending.
    #[error("there is no pending draw to acknowledge")]
    NoPendingDraw,
    /// The supplied roll lies outside `[0, total weight)`.
    #[error("roll is outside the active weight range")]
    InvalidRoll,
    /// Handing out the winner's weight would leave a survivor without a finite weight.
    #[error("redistributed weight for `{0}` is not finite")]
    WeightOverflow(ContestantName),
}

/// Unique, human-readable contestant identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestantName(String);

impl ContestantName {
    /// Creates a new contestant name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContestantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContestantName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Visual identifier attached to a contestant's wheel segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl SegmentColor {
    /// Creates a new segment color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses a `#rrggbb` (or `rrggbb`) hex string.
    #[must_use]
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#').unwrap_or(value.trim());
        if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

impl fmt::Display for SegmentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// Strictly positive, finite selection weight.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Weight(f64);

impl Weight {
    /// Creates a weight, returning `None` for zero, negative or non-finite values.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Retrieves the raw weight value.
    #[must_use]
    pub const fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Weight {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("weight must be positive and finite, got {value}"))
    }
}

impl From<Weight> for f64 {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}

/// How a roster entry expresses its share of the wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightInput {
    /// Raw weight proportional to the draw probability.
    Raw(f64),
    /// Pre-normalised share of the whole roster, in percent (0–100).
    Percent(f64),
}

/// Point on the cumulative weight line used to pick a winner.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Roll(f64);

impl Roll {
    /// Wraps an absolute roll value.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Retrieves the absolute roll value.
    #[must_use]
    pub const fn get(&self) -> f64 {
        self.0
    }
}

/// Read-only view of a single active contestant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestantSnapshot {
    /// Unique contestant identifier.
    pub name: ContestantName,
    /// Segment color used on the wheel and in the history table.
    pub color: SegmentColor,
    /// Current, possibly redistributed weight.
    pub weight: Weight,
    /// Weight assigned when the roster was configured.
    pub initial_weight: Weight,
}

/// Single committed draw recorded in chronological order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Contestant that was drawn.
    pub name: ContestantName,
    /// Color the contestant carried on the wheel.
    pub color: SegmentColor,
    /// Zero-based position in the draw order.
    pub order_index: u32,
}

/// Outcome of a draw awaiting acknowledgement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Roster position of the winner at the time of the draw.
    pub index: usize,
    /// Winner's name.
    pub name: ContestantName,
    /// Winner's segment color.
    pub color: SegmentColor,
    /// Angular span the winner occupies on the unrotated wheel.
    pub span: AngularSpan,
    /// Midpoint of [`Selection::span`], the angle the pointer should stop on.
    pub target_angle: f64,
}

/// Half-open arc `[start, start + sweep)` measured in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngularSpan {
    start_degrees: f64,
    sweep_degrees: f64,
}

impl AngularSpan {
    /// Creates a span from its start angle and sweep.
    #[must_use]
    pub const fn new(start_degrees: f64, sweep_degrees: f64) -> Self {
        Self {
            start_degrees,
            sweep_degrees,
        }
    }

    /// Angle at which the span begins.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start_degrees
    }

    /// Angular extent of the span.
    #[must_use]
    pub const fn sweep(&self) -> f64 {
        self.sweep_degrees
    }

    /// Angle at which the span ends (exclusive).
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start_degrees + self.sweep_degrees
    }

    /// Angle halfway through the span.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        self.start_degrees + self.sweep_degrees * 0.5
    }

    /// Reports whether the normalised angle falls inside the span.
    #[must_use]
    pub fn contains(&self, angle: f64) -> bool {
        let angle = normalize_degrees(angle);
        angle >= self.start_degrees && angle < self.end()
    }
}

/// Wraps an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN_DEGREES);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= FULL_TURN_DEGREES {
        0.0
    } else {
        wrapped
    }
}

/// Selects the first index whose cumulative weight reaches `roll`.
///
/// Boundary ties resolve to the earlier index: a roll equal to the cumulative
/// weight of entry `i` selects `i`. Rolls past the accumulated total (only
/// possible through floating-point slack) resolve to the last entry. Returns
/// `None` for an empty iterator.
#[must_use]
pub fn select_cumulative<I>(weights: I, roll: f64) -> Option<usize>
where
    I: IntoIterator<Item = f64>,
{
    let mut accumulated = 0.0;
    let mut last = None;
    for (index, weight) in weights.into_iter().enumerate() {
        accumulated += weight;
        if accumulated >= roll {
            return Some(index);
        }
        last = Some(index);
    }
    last
}

/// Lays weights out around the wheel in order, starting at angle zero.
///
/// Each span covers `360 * weight / total` degrees. An empty or zero-total
/// input yields no spans.
#[must_use]
pub fn angular_spans(weights: &[f64]) -> Vec<AngularSpan> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }

    let mut accumulated = 0.0;
    weights
        .iter()
        .map(|weight| {
            let start = FULL_TURN_DEGREES * accumulated / total;
            accumulated += weight;
            AngularSpan::new(start, FULL_TURN_DEGREES * weight / total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn history_entry_round_trips_through_bincode() {
        assert_round_trip(&HistoryEntry {
            name: ContestantName::from("Alex"),
            color: SegmentColor::from_rgb(0x1f, 0x77, 0xb4),
            order_index: 3,
        });
    }

    #[test]
    fn draw_error_round_trips_through_bincode() {
        assert_round_trip(&DrawError::UnknownContestant(ContestantName::from("Quinn")));
    }

    #[test]
    fn selection_round_trips_through_bincode() {
        assert_round_trip(&Selection {
            index: 1,
            name: ContestantName::from("Jamie"),
            color: SegmentColor::from_rgb(1, 2, 3),
            span: AngularSpan::new(180.0, 144.0),
            target_angle: 252.0,
        });
    }

    #[test]
    fn weight_rejects_non_positive_values() {
        assert!(Weight::new(0.0).is_none());
        assert!(Weight::new(-1.0).is_none());
        assert!(Weight::new(f64::NAN).is_none());
        assert!(Weight::new(f64::INFINITY).is_none());
        assert_eq!(Weight::new(2.5).map(|weight| weight.get()), Some(2.5));
    }

    #[test]
    fn weight_deserialization_validates_values() {
        let bytes = bincode::serialize(&-4.0_f64).expect("serialize");
        assert!(bincode::deserialize::<Weight>(&bytes).is_err());
    }

    #[test]
    fn segment_color_parses_and_formats_hex() {
        let color = SegmentColor::parse_hex("#FF8000").expect("valid hex");
        assert_eq!(color, SegmentColor::from_rgb(0xff, 0x80, 0x00));
        assert_eq!(color.to_string(), "#ff8000");
        assert_eq!(SegmentColor::parse_hex("00ff00"), Some(SegmentColor::from_rgb(0, 255, 0)));
        assert!(SegmentColor::parse_hex("#12345").is_none());
        assert!(SegmentColor::parse_hex("#zzzzzz").is_none());
    }

    #[test]
    fn cumulative_selection_prefers_earlier_index_on_ties() {
        let weights = [10.0, 8.0, 2.0];
        assert_eq!(select_cumulative(weights, 0.0), Some(0));
        assert_eq!(select_cumulative(weights, 9.0), Some(0));
        assert_eq!(select_cumulative(weights, 10.0), Some(0));
        assert_eq!(select_cumulative(weights, 10.5), Some(1));
        assert_eq!(select_cumulative(weights, 18.0), Some(1));
        assert_eq!(select_cumulative(weights, 19.999), Some(2));
    }

    #[test]
    fn cumulative_selection_absorbs_rounding_slack() {
        assert_eq!(select_cumulative([1.0, 1.0], 2.000_000_1), Some(1));
        assert_eq!(select_cumulative(std::iter::empty(), 0.0), None);
    }

    #[test]
    fn angular_spans_cover_full_turn_in_order() {
        let spans = angular_spans(&[10.0, 8.0, 2.0]);
        assert_eq!(spans.len(), 3);
        assert!((spans[0].start() - 0.0).abs() < 1e-9);
        assert!((spans[0].sweep() - 180.0).abs() < 1e-9);
        assert!((spans[1].start() - 180.0).abs() < 1e-9);
        assert!((spans[1].sweep() - 144.0).abs() < 1e-9);
        assert!((spans[2].start() - 324.0).abs() < 1e-9);
        assert!((spans[2].end() - 360.0).abs() < 1e-9);
        assert!((spans[1].midpoint() - 252.0).abs() < 1e-9);
    }

    #[test]
    fn angular_spans_empty_for_degenerate_input() {
        assert!(angular_spans(&[]).is_empty());
        assert!(angular_spans(&[0.0, 0.0]).is_empty());
    }

    #[test]
    fn span_contains_is_half_open_and_wraps() {
        let span = AngularSpan::new(90.0, 45.0);
        assert!(span.contains(90.0));
        assert!(span.contains(134.9));
        assert!(!span.contains(135.0));
        assert!(span.contains(90.0 + 720.0));
        assert!(span.contains(-250.0));
    }

    #[test]
    fn normalize_degrees_wraps_into_turn() {
        assert!((normalize_degrees(370.0) - 10.0).abs() < 1e-9);
        assert!((normalize_degrees(-90.0) - 270.0).abs() < 1e-9);
        assert!(normalize_degrees(-1e-20) < FULL_TURN_DEGREES);
    }
}
