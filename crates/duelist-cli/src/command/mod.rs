use std::path::Path;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use duelist_controller::{controller::ControllerSource, neural::Architecture};
use duelist_training::{
    fitness::ScoringPolicy,
    genome::{self, Genome, ParamGenome, ParamSpace, SequenceGenome, SequenceShape, WeightGenome},
};

use self::{duel::DuelArg, inspect::InspectArg, train::TrainArg};

mod duel;
mod inspect;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a population of controllers
    Train(#[clap(flatten)] TrainArg),
    /// Validate a genome file and print its summary
    Inspect(#[clap(flatten)] InspectArg),
    /// Play one headless match between two genome files
    Duel(#[clap(flatten)] DuelArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
        Mode::Duel(arg) => duel::run(&arg)?,
    }
    Ok(())
}

/// Genome encoding selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, derive_more::Display)]
pub(crate) enum GenomeKind {
    #[display("fuzzy")]
    Fuzzy,
    #[display("neural")]
    Neural,
    #[display("sequence")]
    Sequence,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ScoringArg {
    #[default]
    Engagement,
    DamageRace,
}

impl From<ScoringArg> for ScoringPolicy {
    fn from(arg: ScoringArg) -> Self {
        match arg {
            ScoringArg::Engagement => Self::Engagement,
            ScoringArg::DamageRace => Self::DamageRace,
        }
    }
}

pub(crate) fn load_genome<G>(path: &Path, shape: &G::Shape) -> anyhow::Result<G>
where
    G: Genome,
{
    let genome = genome::load_json(path, shape)
        .with_context(|| format!("Failed to load {} genome: {}", G::KIND, path.display()))?;
    log::info!("loaded {} genome from {}", G::KIND, path.display());
    Ok(genome)
}

/// Loads a genome file of `kind` with the default shape of that encoding.
pub(crate) fn load_controller(
    kind: GenomeKind,
    path: &Path,
) -> anyhow::Result<Box<dyn ControllerSource>> {
    Ok(match kind {
        GenomeKind::Fuzzy => Box::new(load_genome::<ParamGenome>(path, &ParamSpace::default())?),
        GenomeKind::Neural => {
            Box::new(load_genome::<WeightGenome>(path, &Architecture::default())?)
        }
        GenomeKind::Sequence => Box::new(load_genome::<SequenceGenome>(
            path,
            &SequenceShape::default(),
        )?),
    })
}
