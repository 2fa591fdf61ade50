use std::path::PathBuf;

use duelist_controller::neural::Architecture;
use duelist_training::genome::{
    Genome, ParamGenome, ParamSpace, SequenceGenome, SequenceShape, WeightGenome,
};

use super::{GenomeKind, load_genome};
use crate::util::JsonTarget;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Genome encoding of the file (fuzzy, neural or sequence)
    #[arg(long)]
    genome: GenomeKind,
    /// Genome file to validate
    file: PathBuf,
    /// Also write the validated record as JSON (`-` for stdout)
    #[arg(long)]
    json: Option<PathBuf>,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    match arg.genome {
        GenomeKind::Fuzzy => inspect::<ParamGenome>(arg, &ParamSpace::default()),
        GenomeKind::Neural => inspect::<WeightGenome>(arg, &Architecture::default()),
        GenomeKind::Sequence => inspect::<SequenceGenome>(arg, &SequenceShape::default()),
    }
}

fn inspect<G>(arg: &InspectArg, shape: &G::Shape) -> anyhow::Result<()>
where
    G: Genome,
{
    let genome = load_genome::<G>(&arg.file, shape)?;
    let stats = genome.stats();

    eprintln!("{} genome: {}", G::KIND, arg.file.display());
    for line in genome.summary().lines() {
        eprintln!("  {line}");
    }
    eprintln!("  Fitness: {:.3}", stats.fitness);
    eprintln!(
        "  Record: {}W/{}L of {} matches (win rate {:.1}%)",
        stats.wins,
        stats.losses,
        stats.matches_played,
        stats.win_rate() * 100.0
    );

    if let Some(path) = &arg.json {
        JsonTarget::from_arg(path).write(&genome.to_record())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use duelist_training::genome::{self, ActionWindow};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_inspect_writes_validated_record() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("genome.json");
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let original = WeightGenome::random(&Architecture::default(), &mut rng);
        genome::save_json(&original, &file).unwrap();

        let json = dir.path().join("record.json");
        let arg = InspectArg {
            genome: GenomeKind::Neural,
            file: file.clone(),
            json: Some(json.clone()),
        };
        run(&arg).unwrap();
        assert_eq!(fs::read_to_string(&json).unwrap(), fs::read_to_string(&file).unwrap());
    }

    #[test]
    fn test_inspect_rejects_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("genome.json");
        let original =
            SequenceGenome::uniform(&SequenceShape::default(), ActionWindow::STAND_STILL);
        genome::save_json(&original, &file).unwrap();

        let arg = InspectArg {
            genome: GenomeKind::Neural,
            file,
            json: None,
        };
        assert!(run(&arg).is_err());
    }
}
