//! Turning match outcomes into a scalar fitness.
//!
//! A genome plays a small sample of matches as side A; each outcome is scored by a
//! [`ScoringPolicy`] and the fitness is the mean score. The counters in
//! [`GenomeStats`] are recomputed from the same sample.
//!
//! # Engagement scoring
//!
//! | outcome | score |
//! |---|---|
//! | knockout win | `100 + max(0, budget - frames) / 100 + health / 10 + lives * 50` |
//! | knockout loss | `0` |
//! | timeout, own health ahead by > 0.5 | `60 + Δhealth / 2 + proximity + shots` (counts as a win) |
//! | timeout, opponent health ahead by > 0.5 | `max(0, proximity + shots - 5)` (counts as a loss) |
//! | timeout, otherwise | `5 + proximity + shots` |
//! | simulator failure, cancelled | `5` |
//!
//! with `proximity = max(0, 500 - min(500, avg_distance)) / 10` and
//! `shots = min(20, 0.5 * primary shots)`. The shaping terms give an ordering between
//! matches that run to the time limit.
//!
//! # Parallelism
//!
//! Opponents are sampled on the caller's thread. The matches themselves run on a rayon
//! pool with one thread per simulator instance, and all results are collected before any
//! genome's counters are touched.

use duelist_controller::{
    controller::ControllerSource,
    match_runner::{MatchOutcome, MatchRunner, MatchStats, Side},
};
use duelist_engine::AgentState;
use rand::{Rng, seq::index};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::genome::{Genome, GenomeStats};

const WIN_BASE: f32 = 100.0;
const TECHNICAL_WIN_BASE: f32 = 60.0;
const TECHNICAL_LOSS_PENALTY: f32 = 5.0;
const DRAW_BASE: f32 = 5.0;
const HEALTH_MARGIN: f32 = 0.5;
const PROXIMITY_RANGE: f32 = 500.0;
const SHOTS_CAP: f32 = 20.0;

/// Result of one match from the evaluated genome's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum MatchVerdict {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub verdict: MatchVerdict,
    pub score: f32,
}

impl MatchScore {
    const FAILED: Self = Self {
        verdict: MatchVerdict::Draw,
        score: DRAW_BASE,
    };
}

/// How a match outcome is converted into a score for side A.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringPolicy {
    /// Knockout bonuses plus engagement shaping on timeouts.
    #[default]
    Engagement,
    /// Damage dealt minus damage taken, plus a bonus for closing in.
    ///
    /// `(damage_taken_b - damage_taken_a) * 10 + (1000 - min_distance)`, where damage
    /// taken is `lives lost * 100 + health missing`.
    DamageRace,
}

impl ScoringPolicy {
    #[must_use]
    pub fn score(self, outcome: &MatchOutcome, max_frames: u64) -> MatchScore {
        match outcome {
            MatchOutcome::SimulatorFailure(_) | MatchOutcome::Cancelled => MatchScore::FAILED,
            MatchOutcome::Decisive { winner, stats } => match self {
                Self::Engagement => engagement_decisive(*winner, stats, max_frames),
                Self::DamageRace => MatchScore {
                    verdict: if winner.is_a() {
                        MatchVerdict::Win
                    } else {
                        MatchVerdict::Loss
                    },
                    score: damage_race(stats),
                },
            },
            MatchOutcome::Timeout(stats) => match self {
                Self::Engagement => engagement_timeout(stats),
                Self::DamageRace => MatchScore {
                    verdict: MatchVerdict::Draw,
                    score: damage_race(stats),
                },
            },
        }
    }
}

#[expect(clippy::cast_precision_loss)]
fn engagement_decisive(winner: Side, stats: &MatchStats, max_frames: u64) -> MatchScore {
    if winner.is_b() {
        return MatchScore {
            verdict: MatchVerdict::Loss,
            score: 0.0,
        };
    }
    let speed_bonus = max_frames.saturating_sub(stats.frames) as f32 / 100.0;
    let health_bonus = stats.final_health(Side::A) / 10.0;
    let lives_bonus = stats.final_lives(Side::A) as f32 * 50.0;
    MatchScore {
        verdict: MatchVerdict::Win,
        score: WIN_BASE + speed_bonus + health_bonus + lives_bonus,
    }
}

#[expect(clippy::cast_precision_loss)]
fn engagement_timeout(stats: &MatchStats) -> MatchScore {
    let hp_a = stats.final_health(Side::A);
    let hp_b = stats.final_health(Side::B);
    let proximity = (PROXIMITY_RANGE - stats.avg_distance.min(PROXIMITY_RANGE)).max(0.0) / 10.0;
    let shots = (stats.shots_a as f32 * 0.5).min(SHOTS_CAP);

    if hp_a > hp_b + HEALTH_MARGIN {
        MatchScore {
            verdict: MatchVerdict::Win,
            score: TECHNICAL_WIN_BASE + (hp_a - hp_b) / 2.0 + proximity + shots,
        }
    } else if hp_b > hp_a + HEALTH_MARGIN {
        MatchScore {
            verdict: MatchVerdict::Loss,
            score: (proximity + shots - TECHNICAL_LOSS_PENALTY).max(0.0),
        }
    } else {
        MatchScore {
            verdict: MatchVerdict::Draw,
            score: DRAW_BASE + proximity + shots,
        }
    }
}

#[expect(clippy::cast_precision_loss)]
fn damage_taken(initial: Option<&AgentState>, last: Option<&AgentState>) -> f32 {
    let (lives, health) = last.map_or((0, 0.0), |s| (s.lives, s.health));
    let start_lives = initial.map_or(lives, |s| s.lives);
    start_lives.saturating_sub(lives) as f32 * 100.0 + (AgentState::MAX_HEALTH - health)
}

fn damage_race(stats: &MatchStats) -> f32 {
    let taken_a = damage_taken(stats.initial_state(Side::A), stats.final_state(Side::A));
    let taken_b = damage_taken(stats.initial_state(Side::B), stats.final_state(Side::B));
    (taken_b - taken_a) * 10.0 + (1000.0 - stats.min_distance)
}

/// Where the opponents of an evaluation come from.
#[derive(Clone, Copy)]
pub enum OpponentSource<'a> {
    /// A sample of the other genomes of the population.
    Population,
    /// A single fixed opponent (for example a recording), played exactly once.
    Fixed(&'a dyn ControllerSource),
}

impl std::fmt::Debug for OpponentSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Population => f.write_str("Population"),
            Self::Fixed(_) => f.write_str("Fixed(..)"),
        }
    }
}

/// An evaluation was aborted through the cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("evaluation cancelled")]
pub struct EvaluationCancelled;

/// Scores genomes by playing matches.
#[derive(Debug)]
pub struct FitnessEvaluator<'a> {
    runner: MatchRunner<'a>,
    tournament_size: usize,
    policy: ScoringPolicy,
    pool: rayon::ThreadPool,
}

impl<'a> FitnessEvaluator<'a> {
    /// Creates an evaluator whose worker pool matches the runner's simulator instance count.
    pub fn new(
        runner: MatchRunner<'a>,
        tournament_size: usize,
        policy: ScoringPolicy,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(runner.simulator.instances.get())
            .thread_name(|i| format!("match-worker-{i}"))
            .build()?;
        Ok(Self {
            runner,
            tournament_size,
            policy,
            pool,
        })
    }

    #[must_use]
    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    #[must_use]
    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Frame budget of every match, also the reference of the speed bonus.
    #[must_use]
    pub fn max_frames(&self) -> u64 {
        self.runner.limits.max_frames
    }

    /// Scores `genome` against up to `tournament_size` opponents drawn from `pool`.
    ///
    /// The caller excludes `genome` itself from `pool`.
    pub fn evaluate_genome<G, R>(
        &self,
        genome: &mut G,
        pool: &[G],
        rng: &mut R,
    ) -> Result<(), EvaluationCancelled>
    where
        G: Genome,
        R: Rng + ?Sized,
    {
        let amount = self.tournament_size.min(pool.len());
        let opponents: Vec<&dyn ControllerSource> = index::sample(rng, pool.len(), amount)
            .into_iter()
            .map(|i| &pool[i] as &dyn ControllerSource)
            .collect();
        let outcomes = self.play_all(&*genome, &opponents);
        *genome.stats_mut() = self.aggregate(&outcomes)?;
        Ok(())
    }

    /// Scores every genome of `population`.
    ///
    /// With [`OpponentSource::Population`], each genome meets a fresh sample of the
    /// others; with [`OpponentSource::Fixed`], each genome plays the fixed opponent once.
    /// On cancellation no genome's counters are modified.
    pub fn evaluate_population<G, R>(
        &self,
        population: &mut [G],
        opponents: OpponentSource<'_>,
        rng: &mut R,
    ) -> Result<(), EvaluationCancelled>
    where
        G: Genome,
        R: Rng + ?Sized,
    {
        let n = population.len();
        let jobs: Vec<(usize, &dyn ControllerSource)> = match opponents {
            OpponentSource::Fixed(opponent) => (0..n).map(|i| (i, opponent)).collect(),
            OpponentSource::Population => {
                let amount = self.tournament_size.min(n.saturating_sub(1));
                let mut jobs = Vec::with_capacity(n * amount);
                for i in 0..n {
                    // sample among the n - 1 others, skipping index i
                    for j in index::sample(rng, n - 1, amount) {
                        let j = if j >= i { j + 1 } else { j };
                        jobs.push((i, &population[j] as &dyn ControllerSource));
                    }
                }
                jobs
            }
        };

        let outcomes: Vec<(usize, MatchOutcome)> = self.pool.install(|| {
            jobs.par_iter()
                .map(|&(i, opponent)| (i, self.play(&population[i], opponent)))
                .collect()
        });
        if outcomes.iter().any(|(_, o)| o.is_cancelled()) {
            return Err(EvaluationCancelled);
        }

        let mut per_genome = vec![vec![]; n];
        for (i, outcome) in outcomes {
            per_genome[i].push(outcome);
        }
        let stats = per_genome
            .iter()
            .map(|outcomes| self.aggregate(outcomes))
            .collect::<Result<Vec<_>, _>>()?;
        for (genome, stats) in population.iter_mut().zip(stats) {
            *genome.stats_mut() = stats;
        }
        Ok(())
    }

    fn play(&self, genome: &dyn ControllerSource, opponent: &dyn ControllerSource) -> MatchOutcome {
        let mut a = genome.controller();
        let mut b = opponent.controller();
        let outcome = self.runner.run(a.as_mut(), b.as_mut());
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("match finished: {}", describe(&outcome));
        }
        outcome
    }

    fn play_all(
        &self,
        genome: &dyn ControllerSource,
        opponents: &[&dyn ControllerSource],
    ) -> Vec<MatchOutcome> {
        self.pool.install(|| {
            opponents
                .par_iter()
                .map(|&opponent| self.play(genome, opponent))
                .collect()
        })
    }

    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn aggregate(&self, outcomes: &[MatchOutcome]) -> Result<GenomeStats, EvaluationCancelled> {
        let mut stats = GenomeStats::default();
        let mut total = 0.0;
        for outcome in outcomes {
            if outcome.is_cancelled() {
                return Err(EvaluationCancelled);
            }
            let score = self.policy.score(outcome, self.runner.limits.max_frames);
            match score.verdict {
                MatchVerdict::Win => stats.wins += 1,
                MatchVerdict::Loss => stats.losses += 1,
                MatchVerdict::Draw => {}
            }
            total += score.score;
        }
        stats.matches_played = outcomes.len() as u32;
        if !outcomes.is_empty() {
            stats.fitness = total / outcomes.len() as f32;
        }
        Ok(stats)
    }
}

fn describe(outcome: &MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Decisive { winner, stats } => {
            format!("{winner:?} wins by knockout at frame {}", stats.frames)
        }
        MatchOutcome::Timeout(stats) => format!(
            "timeout after {} frames (health {:.1} vs {:.1})",
            stats.frames,
            stats.final_health(Side::A),
            stats.final_health(Side::B)
        ),
        MatchOutcome::SimulatorFailure(err) => format!("simulator failure: {err}"),
        MatchOutcome::Cancelled => "cancelled".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use duelist_controller::{
        controller::IdleController,
        match_runner::{CancelToken, MatchLimits},
    };
    use duelist_engine::{ArenaRules, DuelArenaFactory, Facing, SimulatorConfig, SimulatorError};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{
        genome::{ActionWindow, SequenceGenome, SequenceShape},
        test_support::{FailingFactory, KnockoutArenaFactory},
    };

    fn state(health: f32, lives: u32) -> AgentState {
        AgentState {
            x: 0.0,
            y: 0.0,
            health,
            lives,
            facing: Facing::Right,
        }
    }

    fn timeout(hp_a: f32, hp_b: f32, avg_distance: f32, shots_a: u32) -> MatchOutcome {
        MatchOutcome::Timeout(MatchStats {
            frames: 1200,
            avg_distance,
            shots_a,
            final_a: Some(state(hp_a, 3)),
            final_b: Some(state(hp_b, 3)),
            ..MatchStats::default()
        })
    }

    fn simulator() -> SimulatorConfig {
        SimulatorConfig {
            instances: std::num::NonZeroUsize::new(2).unwrap(),
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn test_decisive_win_score() {
        let outcome = MatchOutcome::Decisive {
            winner: Side::A,
            stats: MatchStats {
                frames: 500,
                final_a: Some(state(80.0, 2)),
                final_b: Some(state(0.0, 0)),
                ..MatchStats::default()
            },
        };
        let score = ScoringPolicy::Engagement.score(&outcome, 1200);
        assert!(score.verdict.is_win());
        assert!((score.score - (100.0 + 7.0 + 8.0 + 100.0)).abs() < 1e-4);
    }

    #[test]
    fn test_decisive_loss_scores_zero() {
        let outcome = MatchOutcome::Decisive {
            winner: Side::B,
            stats: MatchStats::default(),
        };
        let score = ScoringPolicy::Engagement.score(&outcome, 1200);
        assert_eq!(score.verdict, MatchVerdict::Loss);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_timeout_branches() {
        let policy = ScoringPolicy::Engagement;
        // proximity (500 - 300) / 10 = 20, shots min(20, 10 * 0.5) = 5
        let win = policy.score(&timeout(90.0, 50.0, 300.0, 10), 1200);
        assert!(win.verdict.is_win());
        assert!((win.score - (60.0 + 20.0 + 20.0 + 5.0)).abs() < 1e-4);

        let loss = policy.score(&timeout(50.0, 90.0, 300.0, 10), 1200);
        assert!(loss.verdict.is_loss());
        assert!((loss.score - 20.0).abs() < 1e-4);

        let draw = policy.score(&timeout(70.0, 70.3, 300.0, 10), 1200);
        assert!(draw.verdict.is_draw());
        assert!((draw.score - 30.0).abs() < 1e-4);

        let far_loss = policy.score(&timeout(10.0, 90.0, 9999.0, 0), 1200);
        assert_eq!(far_loss.score, 0.0);
    }

    #[test]
    fn test_closer_timeout_scores_higher() {
        let policy = ScoringPolicy::Engagement;
        let near = policy.score(&timeout(100.0, 100.0, 100.0, 0), 1200);
        let far = policy.score(&timeout(100.0, 100.0, 450.0, 0), 1200);
        assert!(near.score > far.score);
    }

    #[test]
    fn test_failure_is_zero_stat_draw() {
        let outcome = MatchOutcome::SimulatorFailure(SimulatorError::Crashed {
            reason: "boom".to_owned(),
        });
        for policy in [ScoringPolicy::Engagement, ScoringPolicy::DamageRace] {
            assert_eq!(policy.score(&outcome, 600), MatchScore::FAILED);
        }
    }

    #[test]
    fn test_damage_race() {
        let outcome = MatchOutcome::Timeout(MatchStats {
            min_distance: 200.0,
            initial_a: Some(state(100.0, 3)),
            initial_b: Some(state(100.0, 3)),
            final_a: Some(state(90.0, 3)),
            final_b: Some(state(40.0, 2)),
            ..MatchStats::default()
        });
        let score = ScoringPolicy::DamageRace.score(&outcome, 600);
        // (160 - 10) * 10 + (1000 - 200)
        assert!((score.score - 2300.0).abs() < 1e-3);
    }

    #[test]
    fn test_idle_genomes_draw() {
        let factory = DuelArenaFactory::new(ArenaRules {
            weapons_enabled: false,
            ..ArenaRules::default()
        });
        let simulator = simulator();
        let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(1200));
        let evaluator = FitnessEvaluator::new(runner, 1, ScoringPolicy::Engagement).unwrap();
        let shape = SequenceShape::default();
        let mut population = vec![
            SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL),
            SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL),
        ];
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        evaluator
            .evaluate_population(&mut population, OpponentSource::Population, &mut rng)
            .unwrap();
        for genome in &population {
            let stats = genome.stats();
            assert_eq!(stats.matches_played, 1);
            assert_eq!((stats.wins, stats.losses), (0, 0));
            // agents spawn 600 px apart: proximity bonus 0
            assert!((stats.fitness - DRAW_BASE).abs() < 1e-4);
        }
    }

    #[test]
    fn test_knockout_at_frame_500() {
        let factory = KnockoutArenaFactory { knockout_frame: 500 };
        let simulator = simulator();
        let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(1200));
        let evaluator = FitnessEvaluator::new(runner, 3, ScoringPolicy::Engagement).unwrap();
        let shape = SequenceShape::default();
        let mut population = vec![SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL)];
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        evaluator
            .evaluate_population(
                &mut population,
                OpponentSource::Fixed(&IdleController),
                &mut rng,
            )
            .unwrap();
        let stats = population[0].stats();
        assert_eq!(stats.matches_played, 1);
        assert_eq!(stats.wins, 1);
        // 100 + (1200 - 500) / 100 + 100 / 10 + 3 * 50
        assert!((stats.fitness - 267.0).abs() < 1e-3);
    }

    #[test]
    fn test_sampling_respects_tournament_size() {
        let factory = FailingFactory;
        let simulator = simulator();
        let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(10));
        let evaluator = FitnessEvaluator::new(runner, 3, ScoringPolicy::Engagement).unwrap();
        let shape = SequenceShape::default();
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut population: Vec<_> = (0..6)
            .map(|_| SequenceGenome::random(&shape, &mut rng))
            .collect();
        evaluator
            .evaluate_population(&mut population, OpponentSource::Population, &mut rng)
            .unwrap();
        for genome in &population {
            assert_eq!(genome.stats().matches_played, 3);
            assert!((genome.fitness() - DRAW_BASE).abs() < 1e-6);
        }

        let mut single = population.pop().unwrap();
        evaluator
            .evaluate_genome(&mut single, &population[..1], &mut rng)
            .unwrap();
        assert_eq!(single.stats().matches_played, 1);
    }

    #[test]
    fn test_cancellation_leaves_stats_untouched() {
        let factory = KnockoutArenaFactory { knockout_frame: 500 };
        let simulator = simulator();
        let cancel = CancelToken::new();
        cancel.cancel();
        let runner =
            MatchRunner::new(&factory, &simulator, MatchLimits::frames(1200)).with_cancel(&cancel);
        let evaluator = FitnessEvaluator::new(runner, 1, ScoringPolicy::Engagement).unwrap();
        let shape = SequenceShape::default();
        let mut population = vec![
            SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL),
            SequenceGenome::uniform(&shape, ActionWindow::ADVANCE_FIRING),
        ];
        population[0].stats_mut().fitness = 12.0;
        let mut rng = Pcg64Mcg::seed_from_u64(4);
        let result =
            evaluator.evaluate_population(&mut population, OpponentSource::Population, &mut rng);
        assert_eq!(result, Err(EvaluationCancelled));
        assert_eq!(population[0].fitness(), 12.0);
    }
}
