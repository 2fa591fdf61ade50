//! Generation statistics.

use serde::{Deserialize, Serialize};

/// Summary of the fitness distribution of one population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std_dev: f32,
}

impl FitnessSummary {
    /// Computes the summary, or `None` for an empty dataset.
    ///
    /// # Examples
    ///
    /// ```
    /// # use duelist_training::stats::FitnessSummary;
    /// let summary = FitnessSummary::new([5.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(summary.min, 1.0);
    /// assert_eq!(summary.max, 5.0);
    /// assert_eq!(summary.mean, 3.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let min = values.iter().copied().reduce(f32::min)?;
        let max = values.iter().copied().reduce(f32::max)?;
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        Some(Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// One entry of the persistent statistics log.
///
/// Computed over the evaluated population, before breeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: f32,
    pub avg_fitness: f32,
    pub min_fitness: f32,
    pub max_fitness: f32,
    pub population_size: usize,
    pub elite_size: usize,
    pub tournament_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dataset() {
        assert!(FitnessSummary::new(std::iter::empty()).is_none());
    }

    #[test]
    fn test_std_dev() {
        let summary = FitnessSummary::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((summary.mean - 5.0).abs() < 1e-6);
        assert!((summary.std_dev - 2.0).abs() < 1e-6);
    }
}
