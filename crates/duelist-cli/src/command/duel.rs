use std::path::PathBuf;

use duelist_controller::match_runner::{MatchLimits, MatchOutcome, MatchRunner, Side};
use duelist_engine::{DuelArenaFactory, SimulatorConfig};
use duelist_training::fitness::ScoringPolicy;

use super::{GenomeKind, ScoringArg, load_controller};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DuelArg {
    /// Genome encoding of side A
    #[arg(long)]
    genome_a: GenomeKind,
    file_a: PathBuf,
    /// Genome encoding of side B
    #[arg(long)]
    genome_b: GenomeKind,
    file_b: PathBuf,
    #[arg(long, default_value_t = 1200)]
    max_frames: u64,
    #[arg(long, value_enum, default_value_t)]
    scoring: ScoringArg,
}

pub(crate) fn run(arg: &DuelArg) -> anyhow::Result<()> {
    let source_a = load_controller(arg.genome_a, &arg.file_a)?;
    let source_b = load_controller(arg.genome_b, &arg.file_b)?;

    let factory = DuelArenaFactory::default();
    let simulator = SimulatorConfig {
        label: "duelist-duel".to_owned(),
        ..SimulatorConfig::default()
    };
    let runner = MatchRunner::new(&factory, &simulator, MatchLimits::frames(arg.max_frames));
    let outcome = runner.run(
        source_a.controller().as_mut(),
        source_b.controller().as_mut(),
    );
    let policy = ScoringPolicy::from(arg.scoring);
    let score = policy.score(&outcome, arg.max_frames);

    eprintln!(
        "{} ({}) vs {} ({})",
        arg.file_a.display(),
        arg.genome_a,
        arg.file_b.display(),
        arg.genome_b
    );
    match &outcome {
        MatchOutcome::Decisive { winner, stats } => {
            let winner = match winner {
                Side::A => "A",
                Side::B => "B",
            };
            eprintln!("  Knockout: side {winner} wins at frame {}", stats.frames);
        }
        MatchOutcome::Timeout(stats) => {
            eprintln!("  Timeout after {} frames", stats.frames);
            eprintln!(
                "  Health: {:.1} vs {:.1}",
                stats.final_health(Side::A),
                stats.final_health(Side::B)
            );
        }
        MatchOutcome::SimulatorFailure(err) => {
            anyhow::bail!("Simulator failed during the duel: {err}");
        }
        MatchOutcome::Cancelled => anyhow::bail!("Duel was cancelled"),
    }
    eprintln!("  Side A verdict: {:?}", score.verdict);
    eprintln!("  Side A score ({policy:?}): {:.3}", score.score);
    Ok(())
}

#[cfg(test)]
mod tests {
    use duelist_training::genome::{self, ActionWindow, SequenceGenome, SequenceShape};

    use super::*;

    #[test]
    fn test_duel_between_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let shape = SequenceShape::default();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        genome::save_json(&SequenceGenome::uniform(&shape, ActionWindow::ADVANCE_FIRING), &a)
            .unwrap();
        genome::save_json(&SequenceGenome::uniform(&shape, ActionWindow::STAND_STILL), &b)
            .unwrap();
        let arg = DuelArg {
            genome_a: GenomeKind::Sequence,
            file_a: a,
            genome_b: GenomeKind::Sequence,
            file_b: b,
            max_frames: 600,
            scoring: ScoringArg::Engagement,
        };
        run(&arg).unwrap();
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let arg = DuelArg {
            genome_a: GenomeKind::Fuzzy,
            file_a: dir.path().join("missing.json"),
            genome_b: GenomeKind::Fuzzy,
            file_b: dir.path().join("missing.json"),
            max_frames: 10,
            scoring: ScoringArg::Engagement,
        };
        let err = run(&arg).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
