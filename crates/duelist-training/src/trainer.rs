//! The generation loop shared by all genome encodings.
//!
//! Each [`Trainer::step`] runs one generation through the states
//!
//! ```text
//! Initialized ─▶ Evaluating ─▶ Selecting ─▶ Breeding ─▶ Checkpointing ─┬─▶ Evaluating
//!                                                                     └─▶ Done
//! ```
//!
//! The loop stops after `num_generations` generations; there is no early stopping.
//!
//! A fresh run refuses an output directory that already holds checkpoints. A resumed run
//! continues after the newest generation found in either the statistics log or the
//! snapshot files, so a run interrupted between those writes never reuses a snapshot.

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64Mcg;

use crate::{
    breeding::{BreedingError, BreedingPolicy},
    checkpoint::{CheckpointError, CheckpointStore},
    config::{ConfigError, TrainerConfig},
    fitness::{EvaluationCancelled, FitnessEvaluator, OpponentSource},
    genome::Genome,
    population::{Population, PopulationError},
    stats::GenerationRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum TrainerState {
    Initialized,
    Evaluating,
    Selecting,
    Breeding,
    Checkpointing,
    Done,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("invalid trainer configuration")]
    Config(ConfigError),
    #[display("failed to build population")]
    Population(PopulationError),
    #[display("failed to breed the next generation")]
    Breeding(BreedingError),
    #[display("failed to write checkpoint")]
    Checkpoint(CheckpointError),
    #[display("training cancelled")]
    Cancelled(EvaluationCancelled),
    #[display("population can only be seeded before the first generation")]
    #[from(skip)]
    AlreadyStarted,
    #[display("{dir} already holds checkpoints of another run; resume it or pick a new directory")]
    #[from(skip)]
    ExistingRun { dir: String },
    #[display("evaluator {setting} is {evaluator}, but the trainer config says {config}")]
    #[from(skip)]
    EvaluatorMismatch {
        setting: &'static str,
        config: u64,
        evaluator: u64,
    },
}

/// Generic evolutionary loop over one genome encoding.
#[derive(Debug)]
pub struct Trainer<'a, G>
where
    G: Genome,
{
    config: TrainerConfig,
    shape: G::Shape,
    evaluator: FitnessEvaluator<'a>,
    store: CheckpointStore,
    opponents: OpponentSource<'a>,
    breeding: BreedingPolicy,
    population: Population<G>,
    best: Option<G>,
    state: TrainerState,
    resumed: bool,
    remaining: usize,
    rng: Pcg64Mcg,
}

impl<'a, G> Trainer<'a, G>
where
    G: Genome,
{
    /// Validates `config` and creates a random initial population.
    ///
    /// `evaluator` must play `config.tournament_size` opponents with a budget of
    /// `config.max_frames_per_match` frames.
    pub fn new(
        config: TrainerConfig,
        shape: G::Shape,
        evaluator: FitnessEvaluator<'a>,
        store: CheckpointStore,
        opponents: OpponentSource<'a>,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let settings = [
            (
                "tournament_size",
                config.tournament_size as u64,
                evaluator.tournament_size() as u64,
            ),
            (
                "max_frames_per_match",
                config.max_frames_per_match,
                evaluator.max_frames(),
            ),
        ];
        if let Some(&(setting, expected, actual)) = settings.iter().find(|(_, c, e)| c != e) {
            return Err(TrainingError::EvaluatorMismatch {
                setting,
                config: expected,
                evaluator: actual,
            });
        }
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("{} trainer rng seed: {seed}", G::KIND);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let population = Population::random(&shape, config.population_size, &mut rng);
        let breeding = BreedingPolicy {
            elite_size: config.elite_size,
            mutation_rate: config.mutation_rate,
            mutation_strength: config.mutation_strength,
        };
        let state = if config.num_generations == 0 {
            TrainerState::Done
        } else {
            TrainerState::Initialized
        };
        Ok(Self {
            remaining: config.num_generations,
            config,
            shape,
            evaluator,
            store,
            opponents,
            breeding,
            population,
            best: None,
            state,
            resumed: false,
            rng,
        })
    }

    /// Puts `seeds` at the front of the initial population; the rest stays random.
    pub fn seed(&mut self, seeds: Vec<G>) -> Result<(), TrainingError> {
        if !self.state.is_initialized() {
            return Err(TrainingError::AlreadyStarted);
        }
        self.ensure_fresh_store()?;
        let generation = self.population.generation();
        self.population = Population::with_seeds(
            seeds,
            &self.shape,
            self.config.population_size,
            &mut self.rng,
        )?
        .starting_at(generation);
        Ok(())
    }

    /// Continues a previous run stored in the checkpoint directory.
    ///
    /// The generation count continues after the last logged generation or snapshot,
    /// whichever is newer. The stored best genome becomes both the best-ever genome and a
    /// seed of the population. Missing files start a fresh run.
    pub fn resume(&mut self) -> Result<(), TrainingError> {
        if !self.state.is_initialized() {
            return Err(TrainingError::AlreadyStarted);
        }
        let after_log = self
            .store
            .load_stats()?
            .last()
            .map(|record| record.generation + 1);
        let after_snapshot = self.store.latest_snapshot()?.map(|g| g + 1);
        if after_snapshot > after_log {
            log::warn!(
                "statistics log ends before snapshot {}; skipping the interrupted generation",
                after_snapshot.unwrap_or_default() - 1
            );
        }
        let next_generation = after_log.max(after_snapshot).unwrap_or(0);
        let best = self.store.load_best::<G>(&self.shape)?;
        let seeds = best.iter().cloned().collect();
        self.population = Population::with_seeds(
            seeds,
            &self.shape,
            self.config.population_size,
            &mut self.rng,
        )?
        .starting_at(next_generation);
        self.best = best;
        self.resumed = true;
        log::info!(
            "resuming {} training at generation {next_generation} (best fitness {})",
            G::KIND,
            self.best
                .as_ref()
                .map_or_else(|| "none".to_owned(), |g| format!("{:.2}", g.fitness()))
        );
        Ok(())
    }

    /// Runs one generation. Returns `None` once all generations are done.
    pub fn step(&mut self) -> Result<Option<GenerationRecord>, TrainingError> {
        if self.state.is_done() {
            return Ok(None);
        }
        if self.state.is_initialized() && !self.resumed {
            self.ensure_fresh_store()?;
        }
        let generation = self.population.generation();

        self.state = TrainerState::Evaluating;
        self.evaluator.evaluate_population(
            self.population.current_mut(),
            self.opponents,
            &mut self.rng,
        )?;

        self.state = TrainerState::Selecting;
        let (Some(summary), Some(generation_best)) = (
            self.population.fitness_summary(),
            self.population.best().cloned(),
        ) else {
            return Err(PopulationError::Empty.into());
        };
        let best = match self.best.take() {
            Some(best) if generation_best.fitness() <= best.fitness() => best,
            _ => {
                log::info!(
                    "new best genome at generation {generation}: fitness {:.2} ({}W/{}L of {})",
                    generation_best.fitness(),
                    generation_best.stats().wins,
                    generation_best.stats().losses,
                    generation_best.stats().matches_played,
                );
                generation_best
            }
        };
        let best = &*self.best.insert(best);
        let record = GenerationRecord {
            generation,
            best_fitness: best.fitness(),
            avg_fitness: summary.mean,
            min_fitness: summary.min,
            max_fitness: summary.max,
            population_size: self.config.population_size,
            elite_size: self.config.elite_size,
            tournament_size: self.config.tournament_size,
        };

        self.state = TrainerState::Breeding;
        let next = self
            .breeding
            .next_generation(self.population.current(), &mut self.rng)?;

        self.state = TrainerState::Checkpointing;
        self.store.save_generation_snapshot(best, generation)?;
        let path = self.store.save_current_best(best)?;
        log::debug!("saved best genome to {}", path.display());
        self.store.append_stats(&record)?;

        self.population.replace(next)?;
        self.population.advance();
        self.remaining -= 1;

        log::info!(
            "generation {generation}: max {:.2}, avg {:.2}, min {:.2}, std dev {:.2}, best ever {:.2}",
            record.max_fitness,
            record.avg_fitness,
            record.min_fitness,
            summary.std_dev,
            record.best_fitness,
        );

        self.state = if self.remaining == 0 {
            TrainerState::Done
        } else {
            TrainerState::Evaluating
        };
        Ok(Some(record))
    }

    fn ensure_fresh_store(&self) -> Result<(), TrainingError> {
        if self.store.has_checkpoints()? {
            return Err(TrainingError::ExistingRun {
                dir: self.store.dir().display().to_string(),
            });
        }
        Ok(())
    }

    /// Runs the remaining generations and returns the best genome found.
    pub fn run(&mut self) -> Result<Option<&G>, TrainingError> {
        while self.step()?.is_some() {}
        Ok(self.best.as_ref())
    }

    #[must_use]
    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Best genome across all evaluated generations.
    #[must_use]
    pub fn best(&self) -> Option<&G> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use duelist_controller::{
        controller::IdleController,
        match_runner::{CancelToken, MatchLimits, MatchRunner},
    };
    use duelist_engine::{DuelArenaFactory, SimulatorConfig};

    use super::*;
    use crate::{
        fitness::ScoringPolicy,
        genome::{self, ActionWindow, SequenceGenome, SequenceShape},
        test_support::KnockoutArenaFactory,
    };

    const SHAPE: SequenceShape = SequenceShape {
        windows: 12,
        frames_per_window: 10,
    };

    fn config(num_generations: usize) -> TrainerConfig {
        TrainerConfig {
            population_size: 6,
            elite_size: 2,
            tournament_size: 2,
            mutation_rate: 0.2,
            mutation_strength: 0.0,
            max_frames_per_match: 120,
            num_generations,
            seed: Some(7),
        }
    }

    fn simulator() -> SimulatorConfig {
        SimulatorConfig {
            instances: NonZeroUsize::new(2).unwrap(),
            ..SimulatorConfig::default()
        }
    }

    fn evaluator<'a>(
        factory: &'a DuelArenaFactory,
        simulator: &'a SimulatorConfig,
    ) -> FitnessEvaluator<'a> {
        let runner = MatchRunner::new(factory, simulator, MatchLimits::frames(120));
        FitnessEvaluator::new(runner, 2, ScoringPolicy::Engagement).unwrap()
    }

    #[test]
    fn test_rejects_single_elite() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let result = Trainer::<SequenceGenome>::new(
            TrainerConfig {
                elite_size: 1,
                ..config(1)
            },
            SHAPE,
            evaluator(&factory, &simulator),
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        );
        assert!(matches!(
            result,
            Err(TrainingError::Config(ConfigError::EliteTooSmall { .. }))
        ));
    }

    #[test]
    fn test_run_writes_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let store = CheckpointStore::new(dir.path()).unwrap();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(3),
            SHAPE,
            evaluator(&factory, &simulator),
            store.clone(),
            OpponentSource::Population,
        )
        .unwrap();
        trainer
            .seed(vec![SequenceGenome::uniform(&SHAPE, ActionWindow::ADVANCE_FIRING)])
            .unwrap();
        let best = trainer.run().unwrap().unwrap().clone();

        assert!(trainer.state().is_done());
        assert_eq!(trainer.population().generation(), 3);
        assert_eq!(trainer.population().size(), 6);
        for generation in 0..3 {
            assert!(store.snapshot_path(generation).is_file());
        }
        let records = store.load_stats().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.min_fitness <= r.avg_fitness));
        let max_logged = records.iter().map(|r| r.best_fitness).fold(f32::MIN, f32::max);
        assert_eq!(best.fitness(), max_logged);
        assert_eq!(store.load_best::<SequenceGenome>(&SHAPE).unwrap(), Some(best));

        assert!(trainer.step().unwrap().is_none());
        assert!(trainer.seed(vec![]).is_err());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let run = || {
            let dir = tempfile::tempdir().unwrap();
            let mut trainer = Trainer::<SequenceGenome>::new(
                config(2),
                SHAPE,
                evaluator(&factory, &simulator),
                CheckpointStore::new(dir.path()).unwrap(),
                OpponentSource::Population,
            )
            .unwrap();
            trainer.run().unwrap().cloned()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_best_ever_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(4),
            SHAPE,
            evaluator(&factory, &simulator),
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        )
        .unwrap();
        let mut logged_best = f32::MIN;
        while let Some(record) = trainer.step().unwrap() {
            let best = trainer.best().unwrap();
            assert_eq!(record.best_fitness, best.fitness());
            assert!(record.best_fitness >= logged_best);
            assert!(record.best_fitness >= record.max_fitness);
            let snapshot: SequenceGenome =
                genome::load_json(trainer.store().snapshot_path(record.generation), &SHAPE)
                    .unwrap();
            assert_eq!(&snapshot, best);
            logged_best = record.best_fitness;
        }
        let records = trainer.store().load_stats().unwrap();
        assert!(records.windows(2).all(|w| w[1].best_fitness >= w[0].best_fitness));
    }

    #[test]
    fn test_resume_continues_generation_count() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let mut first = Trainer::<SequenceGenome>::new(
            config(2),
            SHAPE,
            evaluator(&factory, &simulator),
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        )
        .unwrap();
        let best = first.run().unwrap().unwrap().clone();

        let mut second = Trainer::<SequenceGenome>::new(
            config(1),
            SHAPE,
            evaluator(&factory, &simulator),
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        )
        .unwrap();
        second.resume().unwrap();
        assert_eq!(second.population().generation(), 2);
        assert_eq!(second.best(), Some(&best));
        assert_eq!(second.population().current()[0].windows(), best.windows());

        second.run().unwrap();
        let records = second.store().load_stats().unwrap();
        let generations: Vec<_> = records.iter().map(|r| r.generation).collect();
        assert_eq!(generations, [0, 1, 2]);
        assert!(second.store().snapshot_path(2).is_file());
    }

    #[test]
    fn test_resume_skips_interrupted_generation() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let store = CheckpointStore::new(dir.path()).unwrap();
        // snapshot of generation 0 written, stats log never reached
        let leftover = SequenceGenome::uniform(&SHAPE, ActionWindow::STAND_STILL);
        store.save_generation_snapshot(&leftover, 0).unwrap();

        let mut trainer = Trainer::<SequenceGenome>::new(
            config(1),
            SHAPE,
            evaluator(&factory, &simulator),
            store.clone(),
            OpponentSource::Population,
        )
        .unwrap();
        trainer.resume().unwrap();
        assert_eq!(trainer.population().generation(), 1);
        let record = trainer.step().unwrap().unwrap();
        assert_eq!(record.generation, 1);
        assert!(store.snapshot_path(1).is_file());
        let snapshot: SequenceGenome = genome::load_json(store.snapshot_path(0), &SHAPE).unwrap();
        assert_eq!(snapshot.windows(), leftover.windows());
    }

    #[test]
    fn test_fresh_run_refuses_existing_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let new_trainer = || {
            Trainer::<SequenceGenome>::new(
                config(1),
                SHAPE,
                evaluator(&factory, &simulator),
                CheckpointStore::new(dir.path()).unwrap(),
                OpponentSource::Population,
            )
            .unwrap()
        };
        new_trainer().run().unwrap();

        let mut seeded = new_trainer();
        assert!(matches!(
            seeded.seed(vec![]),
            Err(TrainingError::ExistingRun { .. })
        ));
        let mut unseeded = new_trainer();
        assert!(matches!(
            unseeded.step(),
            Err(TrainingError::ExistingRun { .. })
        ));
        assert!(unseeded.state().is_initialized());
        assert_eq!(unseeded.store().load_stats().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_evaluator_out_of_sync_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let build = |tournament_size, max_frames| {
            let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(max_frames));
            let evaluator =
                FitnessEvaluator::new(runner, tournament_size, ScoringPolicy::Engagement).unwrap();
            Trainer::<SequenceGenome>::new(
                config(1),
                SHAPE,
                evaluator,
                CheckpointStore::new(dir.path()).unwrap(),
                OpponentSource::Population,
            )
        };
        assert!(matches!(
            build(5, 120),
            Err(TrainingError::EvaluatorMismatch {
                setting: "tournament_size",
                config: 2,
                evaluator: 5,
            })
        ));
        assert!(matches!(
            build(2, 600),
            Err(TrainingError::EvaluatorMismatch {
                setting: "max_frames_per_match",
                config: 120,
                evaluator: 600,
            })
        ));
        assert!(build(2, 120).is_ok());
    }

    #[test]
    fn test_overrun_matches_count_as_draws() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let limits = MatchLimits {
            max_frames: 120,
            deadline: Some(std::time::Duration::ZERO),
        };
        let runner = MatchRunner::new(&factory, &simulator, limits);
        let evaluator = FitnessEvaluator::new(runner, 2, ScoringPolicy::Engagement).unwrap();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(2),
            SHAPE,
            evaluator,
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        )
        .unwrap();
        let best = trainer.run().unwrap().unwrap();
        assert_eq!(best.fitness(), 5.0);
        assert_eq!((best.stats().wins, best.stats().losses), (0, 0));
        assert_eq!(trainer.store().load_stats().unwrap().len(), 2);
    }

    #[test]
    fn test_resume_without_checkpoint_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(1),
            SHAPE,
            evaluator(&factory, &simulator),
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Population,
        )
        .unwrap();
        trainer.resume().unwrap();
        assert_eq!(trainer.population().generation(), 0);
        assert!(trainer.best().is_none());
        assert_eq!(trainer.population().size(), 6);
    }

    #[test]
    fn test_fixed_opponent_knockout() {
        let dir = tempfile::tempdir().unwrap();
        let factory = KnockoutArenaFactory { knockout_frame: 50 };
        let simulator = simulator();
        let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(120));
        let evaluator = FitnessEvaluator::new(runner, 2, ScoringPolicy::Engagement).unwrap();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(1),
            SHAPE,
            evaluator,
            CheckpointStore::new(dir.path()).unwrap(),
            OpponentSource::Fixed(&IdleController),
        )
        .unwrap();
        let record = trainer.step().unwrap().unwrap();
        // every genome wins once: 100 + 70 / 100 + 100 / 10 + 3 * 50
        assert!((record.min_fitness - 260.7).abs() < 1e-3);
        assert!((record.max_fitness - 260.7).abs() < 1e-3);
        assert_eq!(trainer.best().unwrap().stats().matches_played, 1);
    }

    #[test]
    fn test_cancellation_skips_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DuelArenaFactory::default();
        let simulator = simulator();
        let cancel = CancelToken::new();
        cancel.cancel();
        let runner =
            MatchRunner::new(&factory, &simulator, MatchLimits::frames(120)).with_cancel(&cancel);
        let evaluator = FitnessEvaluator::new(runner, 2, ScoringPolicy::Engagement).unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        let mut trainer = Trainer::<SequenceGenome>::new(
            config(2),
            SHAPE,
            evaluator,
            store.clone(),
            OpponentSource::Population,
        )
        .unwrap();
        assert!(matches!(trainer.run(), Err(TrainingError::Cancelled(_))));
        assert!(trainer.state().is_evaluating());
        assert!(trainer.best().is_none());
        assert!(!store.best_path().exists());
        assert!(store.load_stats().unwrap().is_empty());
    }
}
