//! Validated roster configuration supplied when a draft session starts.

use std::collections::HashSet;

use draft_wheel_core::{ContestantName, SegmentColor, Weight, WeightInput};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PERCENT_SCALE: f64 = 100.0;

/// Unvalidated roster line as read from configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RosterEntry {
    /// Unique contestant identifier.
    pub name: ContestantName,
    /// Segment color shown on the wheel.
    pub color: SegmentColor,
    /// Raw weight or percent share.
    pub weight: WeightInput,
}

impl RosterEntry {
    /// Creates a roster entry with a raw weight.
    #[must_use]
    pub fn raw(name: impl Into<String>, weight: f64, color: SegmentColor) -> Self {
        Self {
            name: ContestantName::new(name),
            color,
            weight: WeightInput::Raw(weight),
        }
    }

    /// Creates a roster entry expressed as a percent of the whole wheel.
    #[must_use]
    pub fn percent(name: impl Into<String>, percent: f64, color: SegmentColor) -> Self {
        Self {
            name: ContestantName::new(name),
            color,
            weight: WeightInput::Percent(percent),
        }
    }
}

/// Contestant as seeded into the draw, with its initial weight resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterContestant {
    /// Unique contestant identifier.
    pub name: ContestantName,
    /// Segment color shown on the wheel.
    pub color: SegmentColor,
    /// Initial selection weight.
    pub weight: Weight,
}

/// Reasons a roster configuration may be rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RosterError {
    /// The roster contained no contestants.
    #[error("roster must contain at least one contestant")]
    Empty,
    /// Two entries shared a name.
    #[error("contestant `{0}` appears more than once")]
    DuplicateName(ContestantName),
    /// A raw weight was zero, negative or not finite.
    #[error("contestant `{name}` has invalid weight {value}")]
    InvalidWeight {
        /// Offending contestant.
        name: ContestantName,
        /// Weight that failed validation.
        value: f64,
    },
    /// A percent share was outside `(0, 100]`.
    #[error("contestant `{name}` has invalid percent {value}")]
    InvalidPercent {
        /// Offending contestant.
        name: ContestantName,
        /// Percent that failed validation.
        value: f64,
    },
    /// Percent shares leave no room for the raw-weighted entries.
    #[error("percent shares sum to {total}, leaving nothing for raw weights")]
    PercentOverflow {
        /// Sum of every percent share in the roster.
        total: f64,
    },
}

/// Ordered, validated roster with unique names and positive weights.
#[derive(Clone, Debug, PartialEq)]
pub struct Roster {
    contestants: Vec<RosterContestant>,
}

impl Roster {
    /// Validates configuration entries and resolves percent shares into weights.
    ///
    /// When every entry is a percent the percents are used as weights
    /// directly. Mixed rosters scale percent entries so that each one holds
    /// exactly its share of the final total.
    pub fn new(entries: Vec<RosterEntry>) -> Result<Self, RosterError> {
        if entries.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut raw_total = 0.0;
        let mut percent_total = 0.0;
        let mut has_raw = false;
        for entry in &entries {
            match entry.weight {
                WeightInput::Raw(value) => {
                    if Weight::new(value).is_none() {
                        return Err(RosterError::InvalidWeight {
                            name: entry.name.clone(),
                            value,
                        });
                    }
                    raw_total += value;
                    has_raw = true;
                }
                WeightInput::Percent(value) => {
                    if !(value.is_finite() && value > 0.0 && value <= PERCENT_SCALE) {
                        return Err(RosterError::InvalidPercent {
                            name: entry.name.clone(),
                            value,
                        });
                    }
                    percent_total += value;
                }
            }
        }

        let percent_unit = if has_raw {
            if percent_total >= PERCENT_SCALE {
                return Err(RosterError::PercentOverflow {
                    total: percent_total,
                });
            }
            let total = raw_total / (1.0 - percent_total / PERCENT_SCALE);
            total / PERCENT_SCALE
        } else {
            1.0
        };

        let contestants = entries
            .into_iter()
            .map(|entry| {
                let value = match entry.weight {
                    WeightInput::Raw(value) => value,
                    WeightInput::Percent(value) => value * percent_unit,
                };
                let weight = Weight::new(value).ok_or_else(|| RosterError::InvalidWeight {
                    name: entry.name.clone(),
                    value,
                })?;
                Ok(RosterContestant {
                    name: entry.name,
                    color: entry.color,
                    weight,
                })
            })
            .collect::<Result<Vec<_>, RosterError>>()?;

        Self::from_contestants(contestants)
    }

    /// Validates already-resolved contestants, e.g. when restoring a snapshot.
    pub fn from_contestants(contestants: Vec<RosterContestant>) -> Result<Self, RosterError> {
        if contestants.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut seen = HashSet::with_capacity(contestants.len());
        for contestant in &contestants {
            if !seen.insert(&contestant.name) {
                return Err(RosterError::DuplicateName(contestant.name.clone()));
            }
        }

        Ok(Self { contestants })
    }

    /// Contestants in configured order.
    #[must_use]
    pub fn contestants(&self) -> &[RosterContestant] {
        &self.contestants
    }

    /// Number of contestants, which is also the session's draw budget.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contestants.len()
    }

    /// Always `false`; validated rosters are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contestants.is_empty()
    }
}

/// Converts a weight into its percent share of `total`.
#[must_use]
pub fn weight_to_percent(weight: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    PERCENT_SCALE * weight / total
}
