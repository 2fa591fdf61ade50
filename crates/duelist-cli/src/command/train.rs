use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::Context as _;
use chrono::Utc;
use duelist_controller::{
    match_runner::{MatchLimits, MatchRunner},
    neural::Architecture,
    recording::Recording,
};
use duelist_engine::{DuelArenaFactory, SimulatorConfig};
use duelist_training::{
    checkpoint::CheckpointStore,
    config::TrainerConfig,
    fitness::{FitnessEvaluator, OpponentSource},
    genome::{
        ActionWindow, Genome, ParamGenome, ParamSpace, SequenceGenome, SequenceShape,
        WeightGenome,
    },
    trainer::Trainer,
};

use super::{GenomeKind, ScoringArg};
use crate::{model::training_summary::TrainingSummary, util::JsonTarget};

const SUMMARY_FILE: &str = "training_summary.json";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Genome encoding to evolve (fuzzy, neural or sequence)
    #[arg(long)]
    genome: GenomeKind,
    /// JSON trainer config used instead of the preset of the genome encoding
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    population_size: Option<usize>,
    #[arg(long)]
    elite_size: Option<usize>,
    #[arg(long)]
    tournament_size: Option<usize>,
    #[arg(long)]
    mutation_rate: Option<f32>,
    #[arg(long)]
    mutation_strength: Option<f32>,
    /// Frame budget of a single match
    #[arg(long)]
    max_frames: Option<u64>,
    #[arg(long)]
    generations: Option<usize>,
    /// Seed of the trainer RNG
    #[arg(long)]
    seed: Option<u64>,
    /// Simulator instances running in parallel [default: available parallelism]
    #[arg(long)]
    instances: Option<NonZeroUsize>,
    /// Wall-clock limit of a single match
    #[arg(long)]
    match_timeout_secs: Option<u64>,
    /// Directory receiving snapshots, the best genome and the statistics log
    #[arg(long, default_value = "training_output")]
    output_dir: PathBuf,
    /// Continue from the checkpoints in the output directory
    #[arg(long)]
    resume: bool,
    /// Recorded opponent, required for sequence genomes
    #[arg(long)]
    recording: Option<PathBuf>,
    /// Match scoring [default: damage-race for sequence genomes, engagement otherwise]
    #[arg(long, value_enum)]
    scoring: Option<ScoringArg>,
    /// Name stored in the run summary
    #[arg(long)]
    name: Option<String>,
}

impl TrainArg {
    /// Preset or config file, then individual flags on top.
    fn trainer_config(&self) -> anyhow::Result<TrainerConfig> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::open(path)?,
            None => match self.genome {
                GenomeKind::Fuzzy => TrainerConfig::fuzzy_preset(),
                GenomeKind::Neural => TrainerConfig::neural_preset(),
                GenomeKind::Sequence => TrainerConfig::sequence_preset(),
            },
        };
        if let Some(v) = self.population_size {
            config.population_size = v;
        }
        if let Some(v) = self.elite_size {
            config.elite_size = v;
        }
        if let Some(v) = self.tournament_size {
            config.tournament_size = v;
        }
        if let Some(v) = self.mutation_rate {
            config.mutation_rate = v;
        }
        if let Some(v) = self.mutation_strength {
            config.mutation_strength = v;
        }
        if let Some(v) = self.max_frames {
            config.max_frames_per_match = v;
        }
        if let Some(v) = self.generations {
            config.num_generations = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }

    fn scoring(&self) -> ScoringArg {
        self.scoring.unwrap_or(match self.genome {
            GenomeKind::Sequence => ScoringArg::DamageRace,
            GenomeKind::Fuzzy | GenomeKind::Neural => ScoringArg::Engagement,
        })
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let config = arg.trainer_config()?;
    let mut simulator = SimulatorConfig {
        label: format!("duelist-train-{}", arg.genome),
        ..SimulatorConfig::default()
    };
    if let Some(instances) = arg.instances {
        simulator.instances = instances;
    }
    let limits = MatchLimits {
        max_frames: config.max_frames_per_match,
        deadline: arg.match_timeout_secs.map(Duration::from_secs),
    };
    let factory = DuelArenaFactory::default();
    let runner = MatchRunner::new(&factory, &simulator, limits);
    let evaluator = FitnessEvaluator::new(runner, config.tournament_size, arg.scoring().into())
        .context("Failed to build the match worker pool")?;
    let store = CheckpointStore::new(&arg.output_dir)?;

    eprintln!(
        "Training {} genomes: {} generations, population {}, {} simulator instances",
        arg.genome, config.num_generations, config.population_size, simulator.instances
    );
    eprintln!("  Scoring: {:?}", evaluator.policy());
    eprintln!("  Output: {}", arg.output_dir.display());

    let summary = match arg.genome {
        GenomeKind::Fuzzy => {
            let trainer = Trainer::<ParamGenome>::new(
                config,
                ParamSpace::default(),
                evaluator,
                store,
                OpponentSource::Population,
            )?;
            train(arg, trainer, vec![])?
        }
        GenomeKind::Neural => {
            let trainer = Trainer::<WeightGenome>::new(
                config,
                Architecture::default(),
                evaluator,
                store,
                OpponentSource::Population,
            )?;
            train(arg, trainer, vec![])?
        }
        GenomeKind::Sequence => {
            let shape = SequenceShape::default();
            let path = arg
                .recording
                .as_deref()
                .context("--recording is required for sequence genomes")?;
            let recording = Recording::open(path, usize::try_from(shape.total_frames())?)?;
            let seeds = vec![
                SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL),
                SequenceGenome::uniform(&shape, ActionWindow::ADVANCE_FIRING),
            ];
            let trainer = Trainer::<SequenceGenome>::new(
                config,
                shape,
                evaluator,
                store,
                OpponentSource::Fixed(&recording),
            )?;
            train(arg, trainer, seeds)?
        }
    };

    let path = arg.output_dir.join(SUMMARY_FILE);
    JsonTarget::File(path.clone()).write(&summary)?;

    eprintln!();
    eprintln!("Training completed");
    eprintln!("  Summary: {}", path.display());
    eprintln!("  Name: {}", summary.name);
    eprintln!("  Trained at: {}", summary.trained_at);
    eprintln!("  Generations: {}", summary.generations);
    eprintln!("  Final fitness: {:.3}", summary.final_fitness);

    Ok(())
}

fn train<G>(
    arg: &TrainArg,
    mut trainer: Trainer<'_, G>,
    seeds: Vec<G>,
) -> anyhow::Result<TrainingSummary>
where
    G: Genome,
{
    if arg.resume {
        trainer.resume()?;
    } else {
        trainer.seed(seeds)?;
    }
    let best = trainer
        .run()?
        .context("No generation was evaluated; --generations must be positive")?
        .clone();

    eprintln!("Best genome:");
    for line in best.summary().lines() {
        eprintln!("  {line}");
    }

    Ok(TrainingSummary {
        name: arg
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-duelist", G::KIND)),
        genome_kind: G::KIND.to_owned(),
        trained_at: Utc::now(),
        final_fitness: best.fitness(),
        generations: trainer.population().generation(),
    })
}
