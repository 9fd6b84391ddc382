//! Serialisation of the draw state for storage between sessions.
//!
//! The state is captured as a [`DrawSnapshot`], encoded to JSON and wrapped
//! in a single-line `wheel:v1:<base64>` envelope so any key-value store that
//! can hold a string can persist it.

use std::{collections::HashMap, collections::HashSet, convert::Infallible, error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use draft_wheel_core::{ContestantSnapshot, HistoryEntry, Selection};
use serde::{Deserialize, Serialize};

use crate::{Contestant, DrawState, Roster, RosterContestant, RosterError};

const SNAPSHOT_DOMAIN: &str = "wheel";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "wheel:v1";
const FIELD_DELIMITER: char = ':';

/// Plain-data image of a [`DrawState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawSnapshot {
    /// Roster the session was created with, restored by a reset.
    pub roster: Vec<RosterContestant>,
    /// Contestants still on the wheel, in wheel order.
    pub active: Vec<ContestantSnapshot>,
    /// Draws that may still be made.
    pub remaining_draws: u32,
    /// Committed draws in chronological order.
    pub history: Vec<HistoryEntry>,
    /// Selected winner that was never acknowledged.
    pub pending: Option<Selection>,
}

/// Captures the full state as plain data.
#[must_use]
pub fn snapshot(state: &DrawState) -> DrawSnapshot {
    DrawSnapshot {
        roster: state.roster.contestants().to_vec(),
        active: crate::query::active_contestants(state),
        remaining_draws: state.remaining_draws,
        history: state.history.clone(),
        pending: state.pending.clone(),
    }
}

/// Rebuilds a draw state, rejecting snapshots that break its invariants.
pub fn restore(snapshot: DrawSnapshot) -> Result<DrawState, SnapshotError> {
    let roster = Roster::from_contestants(snapshot.roster).map_err(SnapshotError::InvalidRoster)?;

    let initial_weights: HashMap<_, _> = roster
        .contestants()
        .iter()
        .map(|entry| (&entry.name, entry.weight))
        .collect();

    let mut active_names = HashSet::with_capacity(snapshot.active.len());
    for contestant in &snapshot.active {
        if !active_names.insert(&contestant.name) {
            return Err(SnapshotError::Inconsistent("duplicate active contestant"));
        }
        match initial_weights.get(&contestant.name) {
            None => {
                return Err(SnapshotError::Inconsistent("active contestant missing from roster"))
            }
            Some(weight) if *weight != contestant.initial_weight => {
                return Err(SnapshotError::Inconsistent(
                    "active contestant's initial weight differs from the roster",
                ))
            }
            Some(_) => {}
        }
    }

    let active_count = u32::try_from(snapshot.active.len()).unwrap_or(u32::MAX);
    if snapshot.remaining_draws != active_count {
        return Err(SnapshotError::Inconsistent("remaining draws do not match the wheel"));
    }

    let mut drawn_names = HashSet::with_capacity(snapshot.history.len());
    for (position, entry) in snapshot.history.iter().enumerate() {
        if usize::try_from(entry.order_index).ok() != Some(position) {
            return Err(SnapshotError::Inconsistent("history order is not sequential"));
        }
        if !initial_weights.contains_key(&entry.name) {
            return Err(SnapshotError::Inconsistent("drawn contestant missing from roster"));
        }
        if !drawn_names.insert(&entry.name) {
            return Err(SnapshotError::Inconsistent("contestant drawn more than once"));
        }
        if active_names.contains(&entry.name) {
            return Err(SnapshotError::Inconsistent("drawn contestant is still active"));
        }
    }

    // Active and drawn names are disjoint roster members, so matching counts
    // means together they cover the roster.
    if active_names.len() + drawn_names.len() != roster.len() {
        return Err(SnapshotError::Inconsistent("contestants are missing from the session"));
    }

    if let Some(pending) = &snapshot.pending {
        let slot = snapshot.active.get(pending.index);
        if slot.map(|contestant| &contestant.name) != Some(&pending.name) {
            return Err(SnapshotError::Inconsistent("pending winner is not on the wheel"));
        }
    }

    let active = snapshot
        .active
        .into_iter()
        .map(|contestant| Contestant {
            name: contestant.name,
            color: contestant.color,
            weight: contestant.weight,
            initial_weight: contestant.initial_weight,
        })
        .collect();

    Ok(DrawState {
        roster,
        active,
        history: snapshot.history,
        remaining_draws: snapshot.remaining_draws,
        pending: snapshot.pending,
    })
}

/// Encodes the snapshot into a single-line string suitable for any string store.
pub fn encode(snapshot: &DrawSnapshot) -> Result<String, SnapshotError> {
    let json = serde_json::to_vec(snapshot).map_err(SnapshotError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{SNAPSHOT_HEADER}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a snapshot from the provided string representation.
pub fn decode(value: &str) -> Result<DrawSnapshot, SnapshotError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SnapshotError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(SnapshotError::MissingPrefix)?;
    let version = parts.next().ok_or(SnapshotError::MissingVersion)?;
    let payload = parts.next().ok_or(SnapshotError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SnapshotError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SnapshotError::InvalidEncoding)?;
    serde_json::from_slice(&bytes).map_err(SnapshotError::InvalidPayload)
}

/// Key-value storage able to hold encoded draw states.
pub trait StateStore {
    /// Error raised by the underlying storage mechanism.
    type Error: Error + Send + Sync + 'static;

    /// Reads the value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Writes `value` under `key`, replacing any previous value.
    fn store(&mut self, key: &str, value: String) -> Result<(), Self::Error>;

    /// Deletes the value stored under `key`; missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), Self::Error>;
}

/// In-memory store, useful for tests and single-process hosts.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl StateStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: String) -> Result<(), Self::Error> {
        let _ = self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        let _ = self.entries.remove(key);
        Ok(())
    }
}

/// Persists the state under `key`.
pub fn save<S: StateStore>(store: &mut S, key: &str, state: &DrawState) -> Result<(), SnapshotError> {
    let encoded = encode(&snapshot(state))?;
    store
        .store(key, encoded)
        .map_err(|error| SnapshotError::Store(Box::new(error)))
}

/// Loads the state stored under `key`, returning `None` when nothing was saved.
pub fn load<S: StateStore>(store: &S, key: &str) -> Result<Option<DrawState>, SnapshotError> {
    let Some(encoded) = store
        .load(key)
        .map_err(|error| SnapshotError::Store(Box::new(error)))?
    else {
        return Ok(None);
    };
    restore(decode(&encoded)?).map(Some)
}

/// Errors that can occur while persisting or restoring draw states.
#[derive(Debug)]
pub enum SnapshotError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
    /// The stored roster failed validation.
    InvalidRoster(RosterError),
    /// The snapshot contradicts a draw state invariant.
    Inconsistent(&'static str),
    /// The backing store failed.
    Store(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "stored draw state was empty"),
            Self::MissingPrefix => write!(f, "draw state string is missing the prefix"),
            Self::MissingVersion => write!(f, "draw state string is missing the version"),
            Self::MissingPayload => write!(f, "draw state string is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "draw state prefix '{prefix}' is not supported")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "draw state version '{version}' is not supported")
            }
            Self::InvalidEncoding(error) => write!(f, "could not decode draw state: {error}"),
            Self::InvalidPayload(error) => write!(f, "could not parse draw state: {error}"),
            Self::InvalidRoster(error) => write!(f, "stored roster is invalid: {error}"),
            Self::Inconsistent(reason) => write!(f, "stored draw state is inconsistent: {reason}"),
            Self::Store(error) => write!(f, "state store failed: {error}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidRoster(error) => Some(error),
            Self::Store(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RosterEntry;
    use draft_wheel_core::{ContestantName, Roll, SegmentColor, Weight};

    fn sample_state() -> DrawState {
        let roster = Roster::new(vec![
            RosterEntry::raw("Alex", 10.0, SegmentColor::from_rgb(0x1f, 0x77, 0xb4)),
            RosterEntry::raw("Jamie", 8.0, SegmentColor::from_rgb(0xff, 0x7f, 0x0e)),
            RosterEntry::raw("Taylor", 7.0, SegmentColor::from_rgb(0x2c, 0xa0, 0x2c)),
        ])
        .expect("valid roster");
        DrawState::new(roster)
    }

    #[test]
    fn encoded_state_carries_header() {
        let encoded = encode(&snapshot(&sample_state())).expect("encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:")));
    }

    #[test]
    fn state_with_history_and_pending_winner_survives_storage() {
        let mut state = sample_state();
        let _ = state.draw(Roll::new(12.0)).expect("draw");
        let _ = state.acknowledge().expect("acknowledge");
        let _ = state.draw(Roll::new(0.5)).expect("second draw");

        let mut store = MemoryStore::default();
        save(&mut store, "draft", &state).expect("save");
        let restored = load(&store, "draft").expect("load").expect("present");

        assert_eq!(restored, state);
    }

    #[test]
    fn missing_key_loads_as_none() {
        let store = MemoryStore::default();
        assert!(load(&store, "draft").expect("load").is_none());
    }

    #[test]
    fn decode_rejects_foreign_envelopes() {
        assert!(matches!(decode("   "), Err(SnapshotError::EmptyPayload)));
        assert!(matches!(decode("layout:v1:abc"), Err(SnapshotError::InvalidPrefix(_))));
        assert!(matches!(decode("wheel:v9:abc"), Err(SnapshotError::UnsupportedVersion(_))));
        assert!(matches!(decode("wheel:v1"), Err(SnapshotError::MissingPayload)));
        assert!(matches!(decode("wheel:v1:***"), Err(SnapshotError::InvalidEncoding(_))));
    }

    #[test]
    fn restore_rejects_inconsistent_snapshots() {
        let mut image = snapshot(&sample_state());
        image.remaining_draws = 7;
        assert!(matches!(restore(image), Err(SnapshotError::Inconsistent(_))));

        let mut image = snapshot(&sample_state());
        let duplicate = image.active[0].clone();
        image.active.push(duplicate);
        assert!(matches!(restore(image), Err(SnapshotError::Inconsistent(_))));

        let mut image = snapshot(&sample_state());
        image.history.push(HistoryEntry {
            name: image.active[0].name.clone(),
            color: image.active[0].color,
            order_index: 0,
        });
        assert!(matches!(restore(image), Err(SnapshotError::Inconsistent(_))));
    }

    #[test]
    fn restore_rejects_histories_that_lose_contestants() {
        let mut state = sample_state();
        for roll in [0.5, 0.5] {
            let _ = state.draw(Roll::new(roll)).expect("draw");
            let _ = state.acknowledge().expect("acknowledge");
        }
        let image = snapshot(&state);
        assert_eq!(image.history[0].name.as_str(), "Alex");
        assert!(restore(image.clone()).is_ok());

        let mut drafted_twice = image.clone();
        drafted_twice.history[1].name = drafted_twice.history[0].name.clone();
        assert!(matches!(
            restore(drafted_twice),
            Err(SnapshotError::Inconsistent(_))
        ));

        let mut stranger = image.clone();
        stranger.history[1].name = ContestantName::from("Morgan");
        assert!(matches!(restore(stranger), Err(SnapshotError::Inconsistent(_))));

        let mut reweighted = image;
        reweighted.active[0].initial_weight = Weight::new(1.0).expect("positive weight");
        assert!(matches!(
            restore(reweighted),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn tampered_weights_fail_to_decode() {
        let image = snapshot(&sample_state());
        let mut json = serde_json::to_value(&image).expect("to json");
        json["active"][0]["weight"] = serde_json::json!(-3.0);
        let bytes = serde_json::to_vec(&json).expect("bytes");
        let tampered = format!("{SNAPSHOT_HEADER}:{}", STANDARD_NO_PAD.encode(bytes));

        assert!(matches!(decode(&tampered), Err(SnapshotError::InvalidPayload(_))));
    }
}
