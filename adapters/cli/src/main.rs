#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the fantasy draft wheel.

mod roster_file;
mod state_file;
mod terminal;

use std::{io, path::PathBuf, thread, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use draft_wheel_core::{
    normalize_degrees, Command, ContestantSnapshot, DrawError, Event, HistoryEntry, Selection,
    WELCOME_BANNER,
};
use draft_wheel_rendering::{
    resolve_by_sampling, PointerProbe, Presentation, RasterOptions, RenderingBackend, Scene,
    WheelLayout, WheelPresentation, WheelRaster,
};
use draft_wheel_system_lottery::{Config as LotteryConfig, Lottery};
use draft_wheel_system_spin::{Config as SpinConfig, Spinner};
use draft_wheel_world::{self as world, persistence, query, DrawState};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use state_file::FileStore;
use terminal::TerminalBackend;

const STATE_KEY: &str = "session";
const WHEEL_RADIUS: f32 = 200.0;
const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const SPIN_SEED_SALT: u64 = 0x5be1_1e55_c0ff_ee00;

#[derive(Debug, Parser)]
#[command(name = "draft-wheel", version)]
#[command(about = "Weighted lottery wheel that decides a fantasy draft order")]
struct Cli {
    #[command(subcommand)]
    action: Option<Action>,

    /// Roster TOML file; the built-in twelve-team league is used when omitted.
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// File that keeps the draft between invocations.
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// RNG seed for reproducible drafts.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Skip the spin animation and reveal winners immediately.
    #[arg(long, global = true)]
    no_animation: bool,

    /// Length of a spin in milliseconds.
    #[arg(long, global = true, default_value_t = 12_000)]
    spin_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
enum Action {
    /// Show odds, remaining spins and the draft order so far.
    Status,
    /// Spin the wheel once and commit the winner.
    Spin,
    /// Spin until every pick has been made.
    Draft,
    /// Put every contestant back on the wheel.
    Reset,
}

/// Entry point for the draft wheel command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let action = cli.action.unwrap_or(Action::Status);
    let mut session = Session::open(&cli, action)?;

    match action {
        Action::Status => session.status()?,
        Action::Spin => {
            let _ = session.spin()?;
        }
        Action::Draft => {
            while session.spin()?.is_some() {}
        }
        Action::Reset => {
            session.reset();
            session.status()?;
            session.save()?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

struct Session {
    state: DrawState,
    store: Option<FileStore>,
    lottery: Lottery,
    spinner: Spinner,
    presentation: Presentation,
    probe: PointerProbe,
    backend: TerminalBackend<io::Stdout>,
    rotation: f64,
    animate: bool,
}

impl Session {
    fn open(cli: &Cli, action: Action) -> Result<Self> {
        let roster = match &cli.roster {
            Some(path) => roster_file::load_roster(path)?,
            None => roster_file::default_roster()?,
        };

        let store = cli.state.as_ref().map(FileStore::new);
        let fresh_roster = action == Action::Reset && cli.roster.is_some();
        let persisted = match &store {
            Some(store) if !fresh_roster => persistence::load(store, STATE_KEY)
                .with_context(|| {
                    format!("failed to load draft state from {}", store.path().display())
                })?,
            _ => None,
        };
        let state = match persisted {
            Some(state) => {
                if cli.roster.is_some() && query::roster(&state) != &roster {
                    warn!("saved draft keeps its own roster; run `reset --roster` to replace it");
                }
                state
            }
            None => DrawState::new(roster),
        };

        let lottery_config = match cli.seed {
            Some(seed) => LotteryConfig::seeded(seed),
            None => LotteryConfig::unseeded(),
        };
        let spin_seed = cli
            .seed
            .map_or_else(rand::random::<u64>, |seed| seed ^ SPIN_SEED_SALT);
        let spin_config =
            SpinConfig::with_seed(spin_seed).with_duration(Duration::from_millis(cli.spin_ms));
        let wheel = WheelPresentation::new(
            WHEEL_RADIUS,
            spin_config.pointer_angle(),
            draft_wheel_rendering::DEFAULT_MIN_LABEL_SPAN_DEGREES,
            draft_wheel_rendering::DEFAULT_GLYPH_WIDTH,
        )
        .context("invalid wheel presentation")?;

        Ok(Self {
            state,
            store,
            lottery: Lottery::new(lottery_config),
            spinner: Spinner::new(spin_config),
            presentation: Presentation::new(WELCOME_BANNER, wheel),
            probe: PointerProbe::for_presentation(&wheel),
            backend: TerminalBackend::stdout(),
            rotation: 0.0,
            animate: !cli.no_animation,
        })
    }

    fn status(&mut self) -> Result<()> {
        let contestants = query::active_contestants(&self.state);
        let last = query::history(&self.state).last().cloned();
        self.present(&contestants, self.rotation, None, last)?;

        if let Some(pending) = query::pending_winner(&self.state) {
            println!(
                "A spin for {} was interrupted; `spin` reveals it again.",
                pending.name
            );
        }
        let history = query::history(&self.state);
        if !history.is_empty() {
            println!("Order  Name");
            for entry in history {
                println!("{:>5}  {}", entry.order_index + 1, entry.name);
            }
        }
        Ok(())
    }

    /// Spins once, returning the committed pick or `None` when the draft is over.
    ///
    /// The session is saved once the winner is chosen and again once it is
    /// committed, so an interrupted spin reveals the same winner next time.
    fn spin(&mut self) -> Result<Option<HistoryEntry>> {
        let Some(selection) = self.select()? else {
            println!("Draft Complete!");
            return Ok(None);
        };

        // Weights only change on commit, so this is the wheel being spun.
        let contestants = query::active_contestants(&self.state);
        let mut animation = self.spinner.animate(self.rotation, selection.target_angle);
        if self.animate {
            loop {
                let frame = animation.advance(FRAME_INTERVAL);
                if frame.finished {
                    break;
                }
                self.present(&contestants, frame.rotation, Some(frame.progress), None)?;
                thread::sleep(FRAME_INTERVAL);
            }
        }
        let landed = animation.plan().end();
        self.confirm_landing(&contestants, landed, &selection);
        self.rotation = normalize_degrees(landed);

        let mut events = Vec::new();
        world::apply(&mut self.state, Command::Acknowledge, &mut events);
        let entry = match events.pop() {
            Some(Event::DrawCommitted { entry, .. }) => entry,
            Some(Event::DrawRejected { reason }) => {
                return Err(reason).context("failed to commit the winning pick")
            }
            other => bail!("unexpected outcome while committing a pick: {other:?}"),
        };

        self.save()?;

        let remaining = query::active_contestants(&self.state);
        self.present(&remaining, self.rotation, Some(1.0), Some(entry.clone()))?;
        Ok(Some(entry))
    }

    /// Returns the winner to reveal, replaying an interrupted spin before rolling again.
    fn select(&mut self) -> Result<Option<Selection>> {
        if let Some(pending) = query::pending_winner(&self.state) {
            info!(winner = %pending.name, "resuming interrupted spin");
            return Ok(Some(pending.clone()));
        }
        let selection = self.draw()?;
        if selection.is_some() {
            self.save()?;
        }
        Ok(selection)
    }

    fn draw(&mut self) -> Result<Option<Selection>> {
        let mut commands = Vec::new();
        self.lottery
            .handle(true, query::total_weight(&self.state), &mut commands);

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.state, command, &mut events);
        }

        match events.pop() {
            Some(Event::WinnerSelected { selection }) => Ok(Some(selection)),
            Some(Event::DrawRejected {
                reason: DrawError::Exhausted,
            }) => Ok(None),
            Some(Event::DrawRejected { reason }) => Err(reason).context("the wheel refused to spin"),
            other => bail!("unexpected outcome while drawing: {other:?}"),
        }
    }

    fn confirm_landing(&self, contestants: &[ContestantSnapshot], rotation: f64, selection: &Selection) {
        let wheel = &self.presentation.wheel;
        let layout = WheelLayout::new(wheel, contestants, rotation);
        let raster = WheelRaster::render(wheel, &layout, rotation, RasterOptions::default());
        match resolve_by_sampling(&raster, &layout, wheel, rotation, self.probe) {
            Some(resolution) if resolution.index == selection.index => {
                debug!(method = ?resolution.method, "wheel landed on the selected winner");
            }
            Some(resolution) => warn!(
                shown = %layout.segments[resolution.index].name,
                selected = %selection.name,
                "wheel display disagrees with the draw; keeping the draw"
            ),
            None => warn!("wheel has no segments to resolve"),
        }
    }

    fn reset(&mut self) {
        let mut events = Vec::new();
        world::apply(&mut self.state, Command::Reset, &mut events);
        self.rotation = 0.0;
        info!(?events, "reset draft");
    }

    fn present(
        &mut self,
        contestants: &[ContestantSnapshot],
        rotation: f64,
        spin_progress: Option<f64>,
        winner: Option<HistoryEntry>,
    ) -> Result<()> {
        let scene = Scene {
            layout: WheelLayout::new(&self.presentation.wheel, contestants, rotation),
            rotation,
            spin_progress,
            winner,
            remaining_draws: query::remaining_draws(&self.state),
        };
        self.backend.present(&self.presentation, &scene)
    }

    fn save(&mut self) -> Result<()> {
        let Some(store) = &mut self.store else {
            return Ok(());
        };
        persistence::save(store, STATE_KEY, &self.state)
            .with_context(|| format!("failed to save draft state to {}", store.path().display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, process};

    fn session_args(path: &std::path::Path) -> Cli {
        let state = path.display().to_string();
        Cli::parse_from([
            "draft-wheel",
            "--state",
            state.as_str(),
            "--seed",
            "7",
            "--no-animation",
            "spin",
        ])
    }

    #[test]
    fn interrupted_spin_replays_saved_winner() {
        let path =
            std::env::temp_dir().join(format!("draft-wheel-{}-interrupted.state", process::id()));
        let cli = session_args(&path);

        let mut interrupted = Session::open(&cli, Action::Spin).expect("open session");
        let selected = interrupted
            .select()
            .expect("select succeeds")
            .expect("a winner is drawn");
        drop(interrupted);

        let mut resumed = Session::open(&cli, Action::Spin).expect("reopen session");
        assert_eq!(query::pending_winner(&resumed.state), Some(&selected));
        let entry = resumed
            .spin()
            .expect("spin succeeds")
            .expect("pick is committed");
        assert_eq!(entry.name, selected.name);
        assert_eq!(entry.order_index, 0);

        let reopened = Session::open(&cli, Action::Status).expect("reopen session");
        assert_eq!(query::history(&reopened.state).len(), 1);
        assert!(query::pending_winner(&reopened.state).is_none());
        assert_eq!(query::remaining_draws(&reopened.state), 11);

        let _ = fs::remove_file(&path);
    }
}
