//! Roster configuration loaded from TOML.
//!
//! ```toml
//! version = 1
//!
//! [[contestant]]
//! name = "Alex"
//! weight = 10
//! color = "#e6194b"
//!
//! [[contestant]]
//! name = "Jamie"
//! percent = 20
//! color = "#3cb44b"
//! ```

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use draft_wheel_core::SegmentColor;
use draft_wheel_world::{Roster, RosterEntry};
use serde::Deserialize;

const SUPPORTED_ROSTER_VERSION: u32 = 1;

const DEFAULT_LEAGUE: [(&str, f64, SegmentColor); 12] = [
    ("Alex", 10.0, SegmentColor::from_rgb(0xe6, 0x19, 0x4b)),
    ("Jamie", 8.0, SegmentColor::from_rgb(0x3c, 0xb4, 0x4b)),
    ("Taylor", 7.0, SegmentColor::from_rgb(0xff, 0xc1, 0x07)),
    ("Morgan", 6.0, SegmentColor::from_rgb(0x43, 0x63, 0xd8)),
    ("Casey", 5.0, SegmentColor::from_rgb(0xf5, 0x82, 0x31)),
    ("Riley", 4.0, SegmentColor::from_rgb(0x91, 0x1e, 0xb4)),
    ("Jordan", 3.0, SegmentColor::from_rgb(0x46, 0xf0, 0xf0)),
    ("Peyton", 3.0, SegmentColor::from_rgb(0xf0, 0x32, 0xe6)),
    ("Quinn", 2.0, SegmentColor::from_rgb(0xbc, 0xf6, 0x0c)),
    ("Avery", 2.0, SegmentColor::from_rgb(0xc8, 0x2a, 0x36)),
    ("Skyler", 1.0, SegmentColor::from_rgb(0x00, 0x80, 0x80)),
    ("Dakota", 1.0, SegmentColor::from_rgb(0x58, 0x47, 0xff)),
];

/// Twelve-team league used when no roster file is supplied.
pub(crate) fn default_roster() -> Result<Roster> {
    let entries = DEFAULT_LEAGUE
        .iter()
        .map(|(name, weight, color)| RosterEntry::raw(*name, *weight, *color))
        .collect();
    Roster::new(entries).context("built-in roster is invalid")
}

/// Reads and validates a roster file.
pub(crate) fn load_roster(path: &Path) -> Result<Roster> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read roster file at {}", path.display()))?;
    parse_roster(&contents)
        .with_context(|| format!("failed to load roster from {}", path.display()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterFile {
    version: u32,
    #[serde(default, rename = "contestant")]
    contestants: Vec<ContestantLine>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContestantLine {
    name: String,
    weight: Option<f64>,
    percent: Option<f64>,
    color: String,
}

fn parse_roster(contents: &str) -> Result<Roster> {
    let file: RosterFile =
        toml::from_str(contents).context("failed to parse roster toml contents")?;
    if file.version != SUPPORTED_ROSTER_VERSION {
        bail!(
            "unsupported roster version {}; expected {}",
            file.version,
            SUPPORTED_ROSTER_VERSION
        );
    }

    let mut entries = Vec::with_capacity(file.contestants.len());
    for line in file.contestants {
        let Some(color) = SegmentColor::parse_hex(&line.color) else {
            bail!(
                "contestant `{}` has invalid color `{}`; expected #rrggbb",
                line.name,
                line.color
            );
        };
        let entry = match (line.weight, line.percent) {
            (Some(weight), None) => RosterEntry::raw(line.name, weight, color),
            (None, Some(percent)) => RosterEntry::percent(line.name, percent, color),
            (Some(_), Some(_)) => {
                bail!("contestant `{}` sets both weight and percent", line.name)
            }
            (None, None) => bail!("contestant `{}` needs a weight or percent", line.name),
        };
        entries.push(entry);
    }

    Roster::new(entries).context("roster failed validation")
}
