#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spin planning and easing for the draft wheel.
//!
//! A spin is a pure function of elapsed time: [`SpinPlan::angle_at`] maps a
//! duration since the spin started onto a wheel rotation. The plan is built
//! so that the final rotation places the engine's target angle exactly under
//! the pointer.

use std::time::Duration;

pub use draft_wheel_core::DEFAULT_POINTER_DEGREES;
use draft_wheel_core::{normalize_degrees, FULL_TURN_DEGREES};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Length of a spin unless configured otherwise.
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_millis(12_000);

/// Fewest full turns a default spin makes before settling.
pub const DEFAULT_MIN_ROTATIONS: u32 = 5;

/// Most full turns a default spin makes before settling.
pub const DEFAULT_MAX_ROTATIONS: u32 = 10;

/// Ease-out cubic curve `1 - (1 - t)^3`, clamped to `[0, 1]`.
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let inverse = 1.0 - t;
    1.0 - inverse * inverse * inverse
}

/// Time-indexed rotation from a start angle to a precomputed end angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinPlan {
    start: f64,
    end: f64,
    duration: Duration,
}

impl SpinPlan {
    /// Plans a spin that brings `target_wheel_angle` under the pointer.
    ///
    /// The end rotation is `start + 360 * extra_rotations + delta`, where
    /// `delta` in `[0, 360)` is the smallest clockwise advance after which
    /// `(pointer_angle - end) mod 360` equals the target.
    #[must_use]
    pub fn new(
        start: f64,
        target_wheel_angle: f64,
        pointer_angle: f64,
        extra_rotations: u32,
        duration: Duration,
    ) -> Self {
        let landing = pointer_angle - target_wheel_angle;
        let delta = normalize_degrees(landing - start);
        let end = start + FULL_TURN_DEGREES * f64::from(extra_rotations) + delta;
        Self {
            start,
            end,
            duration,
        }
    }

    /// Rotation at the moment the spin starts.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Rotation once the spin has settled.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Time the spin takes to settle.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Fraction of the duration covered by `elapsed`, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Rotation after `elapsed`; never decreases and equals [`Self::end`]
    /// exactly once the duration has passed.
    #[must_use]
    pub fn angle_at(&self, elapsed: Duration) -> f64 {
        let progress = self.progress(elapsed);
        if progress >= 1.0 {
            return self.end;
        }
        self.start + (self.end - self.start) * ease_out_cubic(progress)
    }
}

/// Configuration parameters required to construct the spinner.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    min_rotations: u32,
    max_rotations: u32,
    duration: Duration,
    pointer_angle: f64,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration; the rotation bounds may be given in any order.
    #[must_use]
    pub fn new(
        rotations: (u32, u32),
        duration: Duration,
        pointer_angle: f64,
        rng_seed: u64,
    ) -> Self {
        let (low, high) = rotations;
        Self {
            min_rotations: low.min(high),
            max_rotations: low.max(high),
            duration,
            pointer_angle,
            rng_seed,
        }
    }

    /// Default spin: five to ten turns over twelve seconds, pointer on top.
    #[must_use]
    pub fn with_seed(rng_seed: u64) -> Self {
        Self::new(
            (DEFAULT_MIN_ROTATIONS, DEFAULT_MAX_ROTATIONS),
            DEFAULT_SPIN_DURATION,
            DEFAULT_POINTER_DEGREES,
            rng_seed,
        )
    }

    /// Replaces the spin duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Screen angle of the pointer.
    #[must_use]
    pub fn pointer_angle(&self) -> f64 {
        self.pointer_angle
    }
}

/// Builds spin plans with a randomised number of extra turns.
///
/// The spinner owns its own generator, so cosmetic choices never consume
/// entropy from the lottery that selects winners.
#[derive(Debug)]
pub struct Spinner {
    config: Config,
    rng: ChaCha8Rng,
}

impl Spinner {
    /// Creates a new spinner using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
        }
    }

    /// Configuration the spinner was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plans a spin from `start` that lands `target_wheel_angle` under the pointer.
    pub fn plan(&mut self, start: f64, target_wheel_angle: f64) -> SpinPlan {
        let extra_rotations = self
            .rng
            .gen_range(self.config.min_rotations..=self.config.max_rotations);
        let plan = SpinPlan::new(
            start,
            target_wheel_angle,
            self.config.pointer_angle,
            extra_rotations,
            self.config.duration,
        );
        debug!(
            start,
            end = plan.end(),
            extra_rotations,
            target_wheel_angle,
            duration_ms = self.config.duration.as_millis() as u64,
            "planned spin"
        );
        plan
    }

    /// Starts an animation for a freshly planned spin.
    pub fn animate(&mut self, start: f64, target_wheel_angle: f64) -> SpinAnimation {
        SpinAnimation::new(self.plan(start, target_wheel_angle))
    }
}

/// Single rendered step of a spin animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinFrame {
    /// Wheel rotation to draw.
    pub rotation: f64,
    /// Fraction of the spin duration that has elapsed.
    pub progress: f64,
    /// Whether the wheel has settled on its final rotation.
    pub finished: bool,
}

/// Steps a [`SpinPlan`] with frame deltas.
///
/// Dropping an animation before it finishes only stops the visuals; the draw
/// it was started for stays pending in the engine.
#[derive(Clone, Debug)]
pub struct SpinAnimation {
    plan: SpinPlan,
    elapsed: Duration,
}

impl SpinAnimation {
    /// Wraps a plan with no time elapsed.
    #[must_use]
    pub fn new(plan: SpinPlan) -> Self {
        Self {
            plan,
            elapsed: Duration::ZERO,
        }
    }

    /// Plan being animated.
    #[must_use]
    pub fn plan(&self) -> &SpinPlan {
        &self.plan
    }

    /// Advances the animation by `dt` and returns the resulting frame.
    pub fn advance(&mut self, dt: Duration) -> SpinFrame {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.plan.duration());
        self.frame()
    }

    /// Frame at the current elapsed time.
    #[must_use]
    pub fn frame(&self) -> SpinFrame {
        let progress = self.plan.progress(self.elapsed);
        SpinFrame {
            rotation: self.plan.angle_at(self.elapsed),
            progress,
            finished: progress >= 1.0,
        }
    }

    /// Whether the wheel has settled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.frame().finished
    }
}
