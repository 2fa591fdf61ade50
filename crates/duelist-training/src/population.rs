//! The current generation and its counter.

use rand::Rng;

use crate::{
    genome::{Genome, GenomeError},
    stats::FitnessSummary,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PopulationError {
    #[display("population must hold exactly {expected} genomes, got {actual}")]
    #[from(skip)]
    SizeMismatch { expected: usize, actual: usize },
    #[display("population is empty")]
    #[from(skip)]
    Empty,
    #[display("seed genome does not fit the population shape")]
    Genome(GenomeError),
}

/// Fixed-size list of genomes plus the generation index.
#[derive(Debug, Clone)]
pub struct Population<G> {
    genomes: Vec<G>,
    size: usize,
    generation: usize,
}

impl<G> Population<G>
where
    G: Genome,
{
    /// Creates `size` random genomes.
    pub fn random<R>(shape: &G::Shape, size: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let genomes = (0..size).map(|_| G::random(shape, rng)).collect();
        Self {
            genomes,
            size,
            generation: 0,
        }
    }

    /// Starts from `seeds` and fills the remaining slots with random genomes.
    ///
    /// Seeds beyond `size` are dropped. Every seed must have exactly `shape`.
    pub fn with_seeds<R>(
        seeds: Vec<G>,
        shape: &G::Shape,
        size: usize,
        rng: &mut R,
    ) -> Result<Self, PopulationError>
    where
        R: Rng + ?Sized,
    {
        let mut genomes = Vec::with_capacity(size);
        for seed in seeds.into_iter().take(size) {
            seed.check_shape(shape)?;
            genomes.push(seed);
        }
        while genomes.len() < size {
            genomes.push(G::random(shape, rng));
        }
        Ok(Self {
            genomes,
            size,
            generation: 0,
        })
    }

    /// Continues the generation count from `generation`.
    #[must_use]
    pub fn starting_at(mut self, generation: usize) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub fn current(&self) -> &[G] {
        &self.genomes
    }

    pub fn current_mut(&mut self) -> &mut [G] {
        &mut self.genomes
    }

    /// Replaces the genomes, keeping the population size fixed.
    pub fn replace(&mut self, genomes: Vec<G>) -> Result<(), PopulationError> {
        if genomes.len() != self.size {
            return Err(PopulationError::SizeMismatch {
                expected: self.size,
                actual: genomes.len(),
            });
        }
        self.genomes = genomes;
        Ok(())
    }

    pub fn advance(&mut self) {
        self.generation += 1;
    }

    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fittest genome; the earliest one wins ties.
    #[must_use]
    pub fn best(&self) -> Option<&G> {
        self.genomes
            .iter()
            .reduce(|best, g| if g.fitness() > best.fitness() { g } else { best })
    }

    #[must_use]
    pub fn fitness_summary(&self) -> Option<FitnessSummary> {
        FitnessSummary::new(self.genomes.iter().map(Genome::fitness))
    }
}
