//! Trainer configuration.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("elite_size must be at least 2 to sample distinct parents, got {elite_size}")]
    EliteTooSmall { elite_size: usize },
    #[display("elite_size {elite_size} exceeds population_size {population_size}")]
    EliteExceedsPopulation {
        elite_size: usize,
        population_size: usize,
    },
    #[display("tournament_size must be positive")]
    ZeroTournament,
    #[display("mutation_rate must lie in [0, 1], got {mutation_rate}")]
    MutationRateOutOfRange { mutation_rate: f32 },
    #[display("mutation_strength must be finite and non-negative, got {mutation_strength}")]
    InvalidMutationStrength { mutation_strength: f32 },
    #[display("max_frames_per_match must be positive")]
    ZeroFrameBudget,
    #[display("failed to read config file {path}")]
    Io { path: String, source: io::Error },
    #[display("failed to parse config file {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Evolution settings, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub population_size: usize,
    /// Genomes carried unchanged into the next generation; also the parent pool.
    pub elite_size: usize,
    /// Opponents sampled per evaluation.
    pub tournament_size: usize,
    /// Per-unit mutation probability.
    pub mutation_rate: f32,
    /// Encoding-specific mutation magnitude.
    pub mutation_strength: f32,
    pub max_frames_per_match: u64,
    pub num_generations: usize,
    /// Seed of the trainer RNG. A fresh seed is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainerConfig {
    /// Settings of the fuzzy parameter trainer.
    #[must_use]
    pub const fn fuzzy_preset() -> Self {
        Self {
            population_size: 25,
            elite_size: 5,
            tournament_size: 5,
            mutation_rate: 0.15,
            mutation_strength: 0.2,
            max_frames_per_match: 1200,
            num_generations: 25,
            seed: None,
        }
    }

    /// Settings of the network weight trainer.
    #[must_use]
    pub const fn neural_preset() -> Self {
        Self {
            population_size: 5,
            elite_size: 2,
            tournament_size: 2,
            mutation_rate: 0.15,
            mutation_strength: 0.1,
            max_frames_per_match: 1800,
            num_generations: 3,
            seed: None,
        }
    }

    /// Settings of the action script trainer, which plays a single recorded opponent.
    #[must_use]
    pub const fn sequence_preset() -> Self {
        Self {
            population_size: 50,
            elite_size: 5,
            tournament_size: 1,
            mutation_rate: 0.1,
            mutation_strength: 0.0,
            max_frames_per_match: 600,
            num_generations: 100,
            seed: None,
        }
    }

    /// Loads a JSON config file.
    pub fn open<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elite_size < 2 {
            return Err(ConfigError::EliteTooSmall {
                elite_size: self.elite_size,
            });
        }
        if self.elite_size > self.population_size {
            return Err(ConfigError::EliteExceedsPopulation {
                elite_size: self.elite_size,
                population_size: self.population_size,
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroTournament);
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRateOutOfRange {
                mutation_rate: self.mutation_rate,
            });
        }
        if !self.mutation_strength.is_finite() || self.mutation_strength < 0.0 {
            return Err(ConfigError::InvalidMutationStrength {
                mutation_strength: self.mutation_strength,
            });
        }
        if self.max_frames_per_match == 0 {
            return Err(ConfigError::ZeroFrameBudget);
        }
        Ok(())
    }
}
