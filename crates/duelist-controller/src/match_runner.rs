//! Running one match between two controllers.
//!
//! ```text
//! acquire arena ─▶ loop while running ∧ frame < max_frames
//!                    │ cancelled ─▶ Cancelled   past deadline ─▶ SimulatorFailure
//!                    │ observe both agents, sample distance
//!                    │ B out of lives ─▶ Decisive(A)   A out of lives ─▶ Decisive(B)
//!                    │ decide, apply, step(dt)
//!                  ─▶ Timeout
//! any simulator error ─▶ SimulatorFailure
//! ```
//!
//! Side A is the lowest agent id reported by the arena, side B the next one. The arena is
//! held through an [`ArenaLease`], so it is shut down whichever way the match ends.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use duelist_engine::{AgentState, ArenaFactory, ArenaLease, SimulatorConfig, SimulatorError};

use crate::controller::Controller;

/// Average distance reported when no frame was observed.
pub const UNSAMPLED_DISTANCE: f32 = 9999.0;
/// Initial value of the minimum-distance tracker.
pub const MAX_TRACKED_DISTANCE: f32 = 10_000.0;

/// One side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum Side {
    A,
    B,
}

/// Engagement statistics gathered while a match runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStats {
    /// Frames simulated before the match ended.
    pub frames: u64,
    /// Mean Euclidean distance between the agents over all observed frames.
    pub avg_distance: f32,
    /// Smallest Manhattan distance observed.
    pub min_distance: f32,
    pub shots_a: u32,
    pub shots_b: u32,
    /// First observed states.
    pub initial_a: Option<AgentState>,
    pub initial_b: Option<AgentState>,
    /// Last observed states.
    pub final_a: Option<AgentState>,
    pub final_b: Option<AgentState>,
}

impl Default for MatchStats {
    fn default() -> Self {
        Self {
            frames: 0,
            avg_distance: UNSAMPLED_DISTANCE,
            min_distance: MAX_TRACKED_DISTANCE,
            shots_a: 0,
            shots_b: 0,
            initial_a: None,
            initial_b: None,
            final_a: None,
            final_b: None,
        }
    }
}

impl MatchStats {
    /// Last observed state of `side`.
    #[must_use]
    pub fn final_state(&self, side: Side) -> Option<&AgentState> {
        match side {
            Side::A => self.final_a.as_ref(),
            Side::B => self.final_b.as_ref(),
        }
    }

    /// First observed state of `side`.
    #[must_use]
    pub fn initial_state(&self, side: Side) -> Option<&AgentState> {
        match side {
            Side::A => self.initial_a.as_ref(),
            Side::B => self.initial_b.as_ref(),
        }
    }

    /// Final health of `side`, or 0 if it was never observed.
    #[must_use]
    pub fn final_health(&self, side: Side) -> f32 {
        self.final_state(side).map_or(0.0, |s| s.health)
    }

    /// Final lives of `side`, or 0 if it was never observed.
    #[must_use]
    pub fn final_lives(&self, side: Side) -> u32 {
        self.final_state(side).map_or(0, |s| s.lives)
    }

    /// Number of primary-fire presses by `side`.
    #[must_use]
    pub fn shots(&self, side: Side) -> u32 {
        match side {
            Side::A => self.shots_a,
            Side::B => self.shots_b,
        }
    }
}

/// How a match ended.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum MatchOutcome {
    /// One side's opponent ran out of lives.
    Decisive { winner: Side, stats: MatchStats },
    /// The frame budget ran out (or the simulator stopped) with both sides alive.
    Timeout(MatchStats),
    /// The arena failed to start or failed mid-match.
    SimulatorFailure(SimulatorError),
    /// The match was aborted by a [`CancelToken`].
    Cancelled,
}

/// Termination limits of a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLimits {
    /// Hard frame ceiling.
    pub max_frames: u64,
    /// Optional wall-clock limit. Overrunning it is reported as a simulator failure.
    pub deadline: Option<Duration>,
}

impl MatchLimits {
    #[must_use]
    pub const fn frames(max_frames: u64) -> Self {
        Self {
            max_frames,
            deadline: None,
        }
    }
}

/// Shared flag used to abort running matches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs matches in arenas created by one factory.
#[derive(Clone, Copy)]
pub struct MatchRunner<'a> {
    pub factory: &'a dyn ArenaFactory,
    pub simulator: &'a SimulatorConfig,
    pub limits: MatchLimits,
    pub cancel: Option<&'a CancelToken>,
}

impl std::fmt::Debug for MatchRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRunner")
            .field("simulator", &self.simulator)
            .field("limits", &self.limits)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl<'a> MatchRunner<'a> {
    #[must_use]
    pub fn new(
        factory: &'a dyn ArenaFactory,
        simulator: &'a SimulatorConfig,
        limits: MatchLimits,
    ) -> Self {
        Self {
            factory,
            simulator,
            limits,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Plays `a` against `b` until a side runs out of lives or a limit is reached.
    pub fn run(&self, a: &mut dyn Controller, b: &mut dyn Controller) -> MatchOutcome {
        match self.try_run(a, b) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("match in '{}' failed: {err}", self.simulator.label);
                MatchOutcome::SimulatorFailure(err)
            }
        }
    }

    fn try_run(
        &self,
        a: &mut dyn Controller,
        b: &mut dyn Controller,
    ) -> Result<MatchOutcome, SimulatorError> {
        let started = Instant::now();
        let mut arena = ArenaLease::acquire(self.factory, self.simulator)?;

        let mut stats = MatchStats::default();
        let mut total_distance = 0.0_f64;
        let mut samples = 0_u32;
        let mut frame = 0;

        while arena.is_running() && frame < self.limits.max_frames {
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                return Ok(MatchOutcome::Cancelled);
            }
            if let Some(limit) = self.limits.deadline.filter(|&d| started.elapsed() >= d) {
                return Err(SimulatorError::DeadlineExceeded { limit });
            }

            let states = arena.agent_states();
            let mut agents = states.into_iter();
            if let (Some((id_a, state_a)), Some((id_b, state_b))) = (agents.next(), agents.next())
            {
                total_distance += f64::from(state_a.distance_to(&state_b));
                samples += 1;
                stats.min_distance = stats
                    .min_distance
                    .min(state_a.manhattan_distance_to(&state_b));
                stats.initial_a.get_or_insert(state_a);
                stats.initial_b.get_or_insert(state_b);
                stats.final_a = Some(state_a);
                stats.final_b = Some(state_b);

                let winner = if state_b.is_eliminated() {
                    Some(Side::A)
                } else if state_a.is_eliminated() {
                    Some(Side::B)
                } else {
                    None
                };
                if let Some(winner) = winner {
                    stats.frames = frame;
                    stats.avg_distance = mean_distance(total_distance, samples);
                    return Ok(MatchOutcome::Decisive { winner, stats });
                }

                let action_a = a.decide(frame, &state_a, &state_b);
                let action_b = b.decide(frame, &state_b, &state_a);
                stats.shots_a += u32::from(action_a.primary_fire);
                stats.shots_b += u32::from(action_b.primary_fire);
                arena.apply_action(id_a, action_a)?;
                arena.apply_action(id_b, action_b)?;
            }

            arena.step(self.simulator.dt)?;
            frame += 1;
        }

        stats.frames = frame;
        stats.avg_distance = mean_distance(total_distance, samples);
        Ok(MatchOutcome::Timeout(stats))
    }
}

#[expect(clippy::cast_possible_truncation)]
fn mean_distance(total: f64, samples: u32) -> f32 {
    if samples == 0 {
        UNSAMPLED_DISTANCE
    } else {
        (total / f64::from(samples)) as f32
    }
}
