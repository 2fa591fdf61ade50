//! Evolutionary training of duel controllers.
//!
//! # Architecture
//!
//! ```text
//! Population ─▶ FitnessEvaluator ─▶ select_elites ─▶ BreedingPolicy ─▶ next Population
//!                      │                  │
//!          MatchRunner on a rayon pool    └─▶ CheckpointStore
//! ```
//!
//! - [`genome`] - The [`Genome`](genome::Genome) capability and its three encodings
//! - [`fitness`] - Match scoring policies and parallel population evaluation
//! - [`population`] - Fixed-size generation container
//! - [`breeding`] - Elitism, parent sampling, crossover and mutation
//! - [`checkpoint`] - Snapshots, best genome and statistics log on disk
//! - [`trainer`] - The generation loop tying everything together
//!
//! The trainer is generic over the genome type, so the fuzzy, neural and sequence
//! trainers share selection, breeding and checkpoint logic.

pub mod breeding;
pub mod checkpoint;
pub mod config;
pub mod fitness;
pub mod genome;
pub mod population;
pub mod stats;
pub mod trainer;

#[cfg(test)]
mod test_support;
