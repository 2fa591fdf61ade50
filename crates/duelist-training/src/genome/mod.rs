//! Evolvable encodings of a controller.
//!
//! Every encoding implements [`Genome`], so the population, breeding and trainer code stay
//! encoding-agnostic:
//!
//! - [`ParamGenome`] - Named, range-bounded parameters of the fuzzy controller
//! - [`WeightGenome`] - Flat weight vector of the feed-forward network
//! - [`SequenceGenome`] - Per-window action script
//!
//! A genome is also a [`ControllerSource`]: the fitness evaluator asks it for a fresh
//! controller before each match.
//!
//! # File format
//!
//! Genomes are stored as JSON records holding the heritable data under `genes` plus the
//! evaluation counters:
//!
//! ```json
//! { "genes": ..., "fitness": 112.4, "wins": 3, "losses": 1, "matches_played": 5 }
//! ```
//!
//! Weight genomes additionally carry an `arch` descriptor which is validated on load.

use std::{
    fmt, fs,
    io::{self, Write as _},
    path::Path,
};

use duelist_controller::{controller::ControllerSource, neural::Architecture};
use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::{params::*, sequence::*, weights::*};

mod params;
mod sequence;
mod weights;

/// Evaluation counters attached to every genome.
///
/// Overwritten by each fitness evaluation; children start from the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenomeStats {
    #[serde(default)]
    pub fitness: f32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub matches_played: u32,
}

impl GenomeStats {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn win_rate(&self) -> f32 {
        if self.matches_played == 0 {
            0.0
        } else {
            self.wins as f32 / self.matches_played as f32
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum GenomeError {
    #[display("expected {expected} genes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[display("architecture mismatch: expected {expected}, got {actual}")]
    ArchMismatch {
        expected: Architecture,
        actual: Architecture,
    },
    #[display("declared gene total {declared} does not match architecture {arch}")]
    InconsistentArch { arch: Architecture, declared: usize },
    #[display("missing parameter '{name}'")]
    MissingParam { name: String },
    #[display("unknown parameter '{name}'")]
    UnknownParam { name: String },
    #[display("parameter '{name}' is not a finite number")]
    NonFiniteParam { name: String },
    #[display("action sequence is empty")]
    EmptySequence,
    #[display("expected {expected} windows, got {actual}")]
    WindowCountMismatch { expected: usize, actual: usize },
    #[display("failed to access genome file {path}")]
    Io { path: String, source: io::Error },
    #[display("failed to parse genome file {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// An evolvable controller encoding.
pub trait Genome: ControllerSource + Clone + fmt::Debug + Send + Sync + Sized {
    /// Everything that must agree between genomes of one population.
    type Shape: Clone + fmt::Debug + PartialEq + Send + Sync;
    /// On-disk representation.
    type Record: Serialize + DeserializeOwned;

    /// Short name used in logs and file metadata.
    const KIND: &'static str;

    /// Creates a genome with random heritable data.
    fn random<R>(shape: &Self::Shape, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    fn shape(&self) -> Self::Shape;

    /// Perturbs the heritable data in place.
    ///
    /// `rate` is the per-unit mutation probability, `strength` the encoding-specific
    /// magnitude. The shape never changes.
    fn mutate<R>(&mut self, rate: f32, strength: f32, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Combines two parents of the same shape into a child with fresh stats.
    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    fn to_record(&self) -> Self::Record;

    /// Validates a record against `shape` and builds the genome.
    fn from_record(record: Self::Record, shape: &Self::Shape) -> Result<Self, GenomeError>;

    /// Fails if the genome does not have exactly `shape`.
    fn check_shape(&self, shape: &Self::Shape) -> Result<(), GenomeError>;

    fn stats(&self) -> &GenomeStats;
    fn stats_mut(&mut self) -> &mut GenomeStats;

    /// Human-readable multi-line description.
    fn summary(&self) -> String;

    fn fitness(&self) -> f32 {
        self.stats().fitness
    }
}

/// Writes `genome` as pretty-printed JSON.
pub fn save_json<G, P>(genome: &G, path: P) -> Result<(), GenomeError>
where
    G: Genome,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let io_err = |source| GenomeError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = io::BufWriter::new(fs::File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut file, &genome.to_record()).map_err(|source| {
        GenomeError::Parse {
            path: path.display().to_string(),
            source,
        }
    })?;
    writeln!(file).map_err(io_err)?;
    file.flush().map_err(io_err)
}

/// Reads and validates a genome file.
pub fn load_json<G, P>(path: P, shape: &G::Shape) -> Result<G, GenomeError>
where
    G: Genome,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| GenomeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let record = serde_json::from_str(&json).map_err(|source| GenomeError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    G::from_record(record, shape)
}

/// Genome record wrapper shared by the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeRecord<T> {
    pub genes: T,
    #[serde(flatten)]
    pub stats: GenomeStats,
}
