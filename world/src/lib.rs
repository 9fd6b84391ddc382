#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative draw state management for the draft wheel.
//!
//! [`DrawState`] is the single owned value that tracks who is still on the
//! wheel, who has been drawn, and how many draws remain. It only changes
//! through [`DrawState::draw`], [`DrawState::acknowledge`] and
//! [`DrawState::reset`] (or the equivalent [`apply`] commands), and every
//! transition is all-or-nothing.

pub mod persistence;
pub mod roster;

use draft_wheel_core::{
    angular_spans, select_cumulative, Command, ContestantName, DrawError, Event, HistoryEntry,
    Roll, SegmentColor, Selection, Weight,
};
use tracing::{debug, info};

pub use roster::{Roster, RosterContestant, RosterEntry, RosterError};

/// Represents the authoritative state of a draft lottery session.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    roster: Roster,
    active: Vec<Contestant>,
    history: Vec<HistoryEntry>,
    remaining_draws: u32,
    pending: Option<Selection>,
}

impl DrawState {
    /// Creates a fresh session whose draw budget equals the roster size.
    #[must_use]
    pub fn new(roster: Roster) -> Self {
        let mut state = Self {
            active: Vec::new(),
            history: Vec::new(),
            remaining_draws: 0,
            pending: None,
            roster,
        };
        state.reset();
        state
    }

    /// Selects a winner for the given roll without mutating any weights.
    ///
    /// The roll must lie in `[0, total)` where `total` is the sum of current
    /// active weights. The winner is the first contestant, in roster order,
    /// whose cumulative weight reaches the roll. The selection stays pending
    /// until [`DrawState::acknowledge`] commits it, so a re-render during the
    /// spin still shows the pre-draw wheel.
    pub fn draw(&mut self, roll: Roll) -> Result<Selection, DrawError> {
        if self.pending.is_some() {
            return Err(DrawError::AlreadyInFlight);
        }
        if self.remaining_draws == 0 {
            return Err(DrawError::Exhausted);
        }
        if self.active.is_empty() {
            return Err(DrawError::EmptyRoster);
        }

        let weights = self.current_weights();
        let total: f64 = weights.iter().sum();
        let value = roll.get();
        if !(value.is_finite() && value >= 0.0 && value < total) {
            return Err(DrawError::InvalidRoll);
        }

        let index =
            select_cumulative(weights.iter().copied(), value).ok_or(DrawError::EmptyRoster)?;
        let span = angular_spans(&weights)
            .get(index)
            .copied()
            .ok_or(DrawError::EmptyRoster)?;
        let winner = &self.active[index];
        let selection = Selection {
            index,
            name: winner.name.clone(),
            color: winner.color,
            span,
            target_angle: span.midpoint(),
        };

        debug!(
            winner = %selection.name,
            index,
            roll = value,
            total,
            accumulated_angle = span.start(),
            segment_angle = span.sweep(),
            target_angle = selection.target_angle,
            "selected draw winner"
        );

        self.pending = Some(selection.clone());
        Ok(selection)
    }

    /// Commits the pending winner.
    ///
    /// Appends the winner to the history, removes it from the wheel, hands its
    /// current weight to the survivors in proportion to their initial weights,
    /// decrements the draw budget and clears the pending slot.
    pub fn acknowledge(&mut self) -> Result<HistoryEntry, DrawError> {
        let pending = self.pending.as_ref().ok_or(DrawError::NoPendingDraw)?;
        let position = self
            .active
            .iter()
            .position(|contestant| contestant.name == pending.name)
            .ok_or_else(|| DrawError::UnknownContestant(pending.name.clone()))?;

        let survivors: Vec<&Contestant> = self
            .active
            .iter()
            .enumerate()
            .filter_map(|(index, contestant)| (index != position).then_some(contestant))
            .collect();
        let redistributed = redistribute(&survivors, self.active[position].weight.get())?;

        let order_index = u32::try_from(self.history.len()).unwrap_or(u32::MAX);
        let entry = HistoryEntry {
            name: pending.name.clone(),
            color: self.active[position].color,
            order_index,
        };
        self.history.push(entry.clone());

        let _ = self.active.remove(position);
        for (contestant, weight) in self.active.iter_mut().zip(redistributed) {
            contestant.weight = weight;
        }

        self.remaining_draws = self.remaining_draws.saturating_sub(1);
        self.pending = None;

        info!(
            winner = %entry.name,
            order = entry.order_index + 1,
            remaining_draws = self.remaining_draws,
            "committed draw"
        );
        Ok(entry)
    }

    /// Restores the original roster and clears history and pending state.
    pub fn reset(&mut self) {
        self.active = self
            .roster
            .contestants()
            .iter()
            .map(Contestant::from_roster)
            .collect();
        self.history.clear();
        self.remaining_draws = u32::try_from(self.roster.len()).unwrap_or(u32::MAX);
        self.pending = None;
    }

    fn current_weights(&self) -> Vec<f64> {
        self.active
            .iter()
            .map(|contestant| contestant.weight.get())
            .collect()
    }
}

/// Applies the provided command to the draw state, broadcasting the outcome.
///
/// Refused commands leave the state untouched and emit
/// [`Event::DrawRejected`].
pub fn apply(state: &mut DrawState, command: Command, out_events: &mut Vec<Event>) {
    let outcome = match command {
        Command::Draw { roll } => state
            .draw(roll)
            .map(|selection| Event::WinnerSelected { selection }),
        Command::Acknowledge => state.acknowledge().map(|entry| Event::DrawCommitted {
            entry,
            remaining_draws: state.remaining_draws,
        }),
        Command::Reset => {
            state.reset();
            info!(remaining_draws = state.remaining_draws, "reset draw state");
            Ok(Event::DrawReset {
                remaining_draws: state.remaining_draws,
            })
        }
    };

    match outcome {
        Ok(event) => out_events.push(event),
        Err(reason) => {
            debug!(%reason, ?command, "rejected draw command");
            out_events.push(Event::DrawRejected { reason });
        }
    }
}

/// Query functions that provide read-only access to the draw state.
pub mod query {
    use draft_wheel_core::{
        angular_spans, AngularSpan, ContestantName, ContestantSnapshot, HistoryEntry,
        SegmentColor, Selection,
    };

    use super::{roster::weight_to_percent, DrawState, Roster};

    /// Draw odds of a single active contestant.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ContestantOdds {
        /// Contestant identifier.
        pub name: ContestantName,
        /// Segment color.
        pub color: SegmentColor,
        /// Probability of being selected by the next draw.
        pub probability: f64,
        /// Probability expressed as a whole percent for display.
        pub rounded_percent: u32,
    }

    /// Roster the session was created with.
    #[must_use]
    pub fn roster(state: &DrawState) -> &Roster {
        &state.roster
    }

    /// Captures the active contestants in wheel order.
    #[must_use]
    pub fn active_contestants(state: &DrawState) -> Vec<ContestantSnapshot> {
        state
            .active
            .iter()
            .map(|contestant| ContestantSnapshot {
                name: contestant.name.clone(),
                color: contestant.color,
                weight: contestant.weight,
                initial_weight: contestant.initial_weight,
            })
            .collect()
    }

    /// Committed draws in chronological order.
    #[must_use]
    pub fn history(state: &DrawState) -> &[HistoryEntry] {
        &state.history
    }

    /// Number of draws that may still be made.
    #[must_use]
    pub fn remaining_draws(state: &DrawState) -> u32 {
        state.remaining_draws
    }

    /// Selected winner awaiting acknowledgement, if any.
    #[must_use]
    pub fn pending_winner(state: &DrawState) -> Option<&Selection> {
        state.pending.as_ref()
    }

    /// Reports whether every draw in the session has been committed.
    #[must_use]
    pub fn is_complete(state: &DrawState) -> bool {
        state.remaining_draws == 0
    }

    /// Sum of the current active weights.
    #[must_use]
    pub fn total_weight(state: &DrawState) -> f64 {
        state
            .active
            .iter()
            .map(|contestant| contestant.weight.get())
            .sum()
    }

    /// Probability of each active contestant winning the next draw.
    #[must_use]
    pub fn odds(state: &DrawState) -> Vec<ContestantOdds> {
        let total = total_weight(state);
        state
            .active
            .iter()
            .map(|contestant| {
                let percent = weight_to_percent(contestant.weight.get(), total);
                ContestantOdds {
                    name: contestant.name.clone(),
                    color: contestant.color,
                    probability: percent / 100.0,
                    rounded_percent: percent.round() as u32,
                }
            })
            .collect()
    }

    /// Angular spans of the active contestants on the unrotated wheel.
    #[must_use]
    pub fn wheel_spans(state: &DrawState) -> Vec<AngularSpan> {
        angular_spans(&state.current_weights())
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Contestant {
    name: ContestantName,
    color: SegmentColor,
    weight: Weight,
    initial_weight: Weight,
}

impl Contestant {
    fn from_roster(entry: &RosterContestant) -> Self {
        Self {
            name: entry.name.clone(),
            color: entry.color,
            weight: entry.weight,
            initial_weight: entry.weight,
        }
    }
}

// Shares are proportional to initial weight, not current weight. Nothing is
// applied unless every survivor's new weight is valid.
fn redistribute(survivors: &[&Contestant], released_weight: f64) -> Result<Vec<Weight>, DrawError> {
    let initial_total: f64 = survivors
        .iter()
        .map(|contestant| contestant.initial_weight.get())
        .sum();
    if initial_total <= 0.0 {
        return Ok(survivors.iter().map(|contestant| contestant.weight).collect());
    }

    survivors
        .iter()
        .map(|contestant| {
            let share = contestant.initial_weight.get() / initial_total * released_weight;
            Weight::new(contestant.weight.get() + share)
                .ok_or_else(|| DrawError::WeightOverflow(contestant.name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_way_state() -> DrawState {
        let roster = Roster::new(vec![
            RosterEntry::raw("A", 10.0, SegmentColor::from_rgb(255, 0, 0)),
            RosterEntry::raw("B", 8.0, SegmentColor::from_rgb(0, 255, 0)),
            RosterEntry::raw("C", 2.0, SegmentColor::from_rgb(0, 0, 255)),
        ])
        .expect("valid roster");
        DrawState::new(roster)
    }

    #[test]
    fn empty_active_set_is_reported_as_empty_roster() {
        let mut state = three_way_state();
        state.active.clear();

        assert_eq!(state.draw(Roll::new(0.0)), Err(DrawError::EmptyRoster));
        assert_eq!(state.remaining_draws, 3);
    }

    #[test]
    fn acknowledge_reports_desynchronised_winner() {
        let mut state = three_way_state();
        let _ = state.draw(Roll::new(1.0)).expect("draw succeeds");
        state.active.retain(|contestant| contestant.name.as_str() != "A");
        let before = state.clone();

        assert_eq!(
            state.acknowledge(),
            Err(DrawError::UnknownContestant(ContestantName::from("A")))
        );
        assert_eq!(state, before, "failed acknowledge must not mutate state");
    }

    #[test]
    fn redistribution_ignores_empty_survivor_set() {
        assert_eq!(redistribute(&[], 5.0), Ok(Vec::new()));
    }

    #[test]
    fn overflowing_redistribution_leaves_state_untouched() {
        let mut state = three_way_state();
        let selection = state.draw(Roll::new(1.0)).expect("draw succeeds");
        assert_eq!(selection.name.as_str(), "A");
        let huge = Weight::new(f64::MAX).expect("finite weight");
        state.active[0].weight = huge;
        state.active[1].weight = huge;
        let before = state.clone();

        assert_eq!(
            state.acknowledge(),
            Err(DrawError::WeightOverflow(ContestantName::from("B")))
        );
        assert_eq!(state, before, "failed acknowledge must not mutate state");
    }

    #[test]
    fn apply_emits_rejection_without_mutation() {
        let mut state = three_way_state();
        let mut events = Vec::new();

        apply(&mut state, Command::Acknowledge, &mut events);

        assert_eq!(
            events,
            vec![Event::DrawRejected {
                reason: DrawError::NoPendingDraw
            }]
        );
        assert_eq!(state, three_way_state());
    }
}
