//! Elite selection and offspring generation.
//!
//! One breeding step turns an evaluated population into the next one:
//!
//! 1. **Elite selection** - The `elite_size` fittest genomes, ordered by fitness with ties
//!    kept in population order, are carried over unchanged
//! 2. **Parent sampling** - Two distinct elites are drawn uniformly at random
//! 3. **Crossover** - The parents are combined into a child of the same shape
//! 4. **Mutation** - The child is mutated with the policy's rate and strength
//!
//! Steps 2-4 repeat until the population is full again. Elites are never mutated, so the
//! best fitness found so far can only be lost through re-evaluation noise, never through
//! breeding.

use rand::{Rng, seq::IndexedRandom as _};

use crate::genome::Genome;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BreedingError {
    #[display("at least 2 elites are needed to sample distinct parents, got {elites}")]
    TooFewElites { elites: usize },
    #[display("target size {target_size} is smaller than the {elites} elites")]
    TargetBelowElites { target_size: usize, elites: usize },
}

/// Returns the `elite_size` fittest genomes, best first.
///
/// The sort is stable: genomes with equal fitness keep their population order.
#[must_use]
pub fn select_elites<G>(population: &[G], elite_size: usize) -> Vec<G>
where
    G: Genome,
{
    let mut sorted: Vec<&G> = population.iter().collect();
    sorted.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
    sorted.into_iter().take(elite_size).cloned().collect()
}

/// Controls how the next generation is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreedingPolicy {
    pub elite_size: usize,
    pub mutation_rate: f32,
    pub mutation_strength: f32,
}

impl BreedingPolicy {
    /// Fills a population of `target_size` starting from `elites`.
    pub fn breed<G, R>(
        &self,
        elites: &[G],
        target_size: usize,
        rng: &mut R,
    ) -> Result<Vec<G>, BreedingError>
    where
        G: Genome,
        R: Rng + ?Sized,
    {
        if elites.len() < 2 {
            return Err(BreedingError::TooFewElites {
                elites: elites.len(),
            });
        }
        if target_size < elites.len() {
            return Err(BreedingError::TargetBelowElites {
                target_size,
                elites: elites.len(),
            });
        }

        let mut next = Vec::with_capacity(target_size);
        next.extend(elites.iter().cloned());
        while next.len() < target_size {
            let parents: Vec<&G> = elites.choose_multiple(rng, 2).collect();
            let mut child = parents[0].crossover(parents[1], rng);
            child.mutate(self.mutation_rate, self.mutation_strength, rng);
            next.push(child);
        }
        Ok(next)
    }

    /// Selects the elites of `population` and breeds a population of the same size.
    pub fn next_generation<G, R>(
        &self,
        population: &[G],
        rng: &mut R,
    ) -> Result<Vec<G>, BreedingError>
    where
        G: Genome,
        R: Rng + ?Sized,
    {
        let elites = select_elites(population, self.elite_size);
        self.breed(&elites, population.len(), rng)
    }
}
