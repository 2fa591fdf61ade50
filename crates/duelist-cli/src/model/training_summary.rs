use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata written next to the checkpoints at the end of a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingSummary {
    pub name: String,
    pub genome_kind: String,
    pub trained_at: DateTime<Utc>,
    pub final_fitness: f32,
    /// Generation count including generations of resumed runs.
    pub generations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_fields() {
        let summary = TrainingSummary {
            name: "fuzzy-duelist".to_owned(),
            genome_kind: "fuzzy".to_owned(),
            trained_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            final_fitness: 123.5,
            generations: 25,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["genome_kind"], "fuzzy");
        assert_eq!(value["generations"], 25);
        assert_eq!(value["trained_at"], "2023-11-14T22:13:20Z");
        let back: TrainingSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back.trained_at, summary.trained_at);
    }
}
