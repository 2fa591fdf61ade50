use std::fmt::Write as _;

use duelist_controller::{
    controller::{Controller, ControllerSource},
    neural::{Architecture, NeuralController},
};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::{Genome, GenomeError, GenomeStats};

/// Weights are kept inside `[-WEIGHT_LIMIT, WEIGHT_LIMIT]` by mutation.
pub const WEIGHT_LIMIT: f32 = 3.0;

/// Creates a weight vector by applying a function to each index.
fn from_fn<F>(mut f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Xavier-uniform initialization of the weight matrices, zero biases.
///
/// `W1` is drawn from `±sqrt(6 / (input + hidden))`, `W2` from
/// `±sqrt(6 / (hidden + output))`.
#[expect(clippy::cast_precision_loss)]
fn xavier<R>(arch: Architecture, rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    let [w1, b1, w2, _] = arch.blocks();
    let scale1 = (6.0 / (arch.input + arch.hidden) as f32).sqrt();
    let scale2 = (6.0 / (arch.hidden + arch.output) as f32).sqrt();
    from_fn(
        |i| match i {
            i if i < w1 => rng.random_range(-scale1..=scale1),
            i if i < w1 + b1 => 0.0,
            i if i < w1 + b1 + w2 => rng.random_range(-scale2..=scale2),
            _ => 0.0,
        },
        arch.total(),
    )
}

/// Adds `N(0, sigma)` noise to each weight with probability `rate`, clamping to
/// [`WEIGHT_LIMIT`].
fn gaussian_mutate<R>(weights: &mut [f32], sigma: f32, rate: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let normal = match Normal::new(0.0, sigma) {
        Ok(normal) => normal,
        Err(err) => {
            log::warn!("weights left unmutated: invalid mutation strength {sigma} ({err})");
            return;
        }
    };
    for w in weights {
        if rng.random_bool(rate.into()) {
            *w = (*w + rng.sample(normal)).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
        }
    }
}

/// Picks each weight from either parent with equal probability.
fn uniform_crossover<R>(p1: &[f32], p2: &[f32], rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    from_fn(|i| if rng.random_bool(0.5) { p2[i] } else { p1[i] }, p1.len())
}

/// Flat weight vector for the feed-forward network controller.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightGenome {
    arch: Architecture,
    genes: Vec<f32>,
    stats: GenomeStats,
}

/// Architecture descriptor stored next to the weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchRecord {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub arch: ArchRecord,
    pub genes: Vec<f32>,
    #[serde(flatten)]
    pub stats: GenomeStats,
}

impl WeightGenome {
    #[must_use]
    pub fn genes(&self) -> &[f32] {
        &self.genes
    }
}

impl ControllerSource for WeightGenome {
    fn controller(&self) -> Box<dyn Controller + '_> {
        Box::new(NeuralController::new(self.arch, &self.genes))
    }
}

impl Genome for WeightGenome {
    type Shape = Architecture;
    type Record = WeightRecord;

    const KIND: &'static str = "neural";

    fn random<R>(shape: &Architecture, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            arch: *shape,
            genes: xavier(*shape, rng),
            stats: GenomeStats::default(),
        }
    }

    fn shape(&self) -> Architecture {
        self.arch
    }

    fn mutate<R>(&mut self, rate: f32, strength: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        gaussian_mutate(&mut self.genes, strength, rate, rng);
    }

    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.arch, other.arch);
        Self {
            arch: self.arch,
            genes: uniform_crossover(&self.genes, &other.genes, rng),
            stats: GenomeStats::default(),
        }
    }

    fn to_record(&self) -> WeightRecord {
        WeightRecord {
            arch: ArchRecord {
                input: self.arch.input,
                hidden: self.arch.hidden,
                output: self.arch.output,
                total: self.arch.total(),
            },
            genes: self.genes.clone(),
            stats: self.stats,
        }
    }

    fn from_record(record: WeightRecord, shape: &Architecture) -> Result<Self, GenomeError> {
        let ArchRecord {
            input,
            hidden,
            output,
            total,
        } = record.arch;
        let declared = Architecture {
            input,
            hidden,
            output,
        };
        if declared.total() != total {
            return Err(GenomeError::InconsistentArch {
                arch: declared,
                declared: total,
            });
        }
        if declared != *shape {
            return Err(GenomeError::ArchMismatch {
                expected: *shape,
                actual: declared,
            });
        }
        let genome = Self {
            arch: declared,
            genes: record.genes,
            stats: record.stats,
        };
        genome.check_shape(shape)?;
        Ok(genome)
    }

    fn check_shape(&self, shape: &Architecture) -> Result<(), GenomeError> {
        if self.arch != *shape {
            return Err(GenomeError::ArchMismatch {
                expected: *shape,
                actual: self.arch,
            });
        }
        if self.genes.len() != shape.total() {
            return Err(GenomeError::LengthMismatch {
                expected: shape.total(),
                actual: self.genes.len(),
            });
        }
        Ok(())
    }

    fn stats(&self) -> &GenomeStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut GenomeStats {
        &mut self.stats
    }

    fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Neural genome: {} genes (I={}, H={}, O={})",
            self.genes.len(),
            self.arch.input,
            self.arch.hidden,
            self.arch.output
        );
        let _ = write!(
            out,
            "  fitness={:.2} W/L={}/{} ({:.1}%) matches={}",
            self.stats.fitness,
            self.stats.wins,
            self.stats.losses,
            self.stats.win_rate() * 100.0,
            self.stats.matches_played
        );
        out
    }
}
