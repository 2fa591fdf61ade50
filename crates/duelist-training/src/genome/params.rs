use std::{collections::BTreeMap, fmt::Write as _};

use duelist_controller::{
    controller::{Controller, ControllerSource},
    fuzzy::{self, FuzzyController, FuzzyParams, ParamDef},
};
use rand::Rng;

use super::{Genome, GenomeError, GenomeRecord, GenomeStats};

/// The declared parameter set of a [`ParamGenome`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpace {
    defs: &'static [ParamDef],
}

impl Default for ParamSpace {
    fn default() -> Self {
        Self::new(&fuzzy::PARAMETERS)
    }
}

impl ParamSpace {
    #[must_use]
    pub const fn new(defs: &'static [ParamDef]) -> Self {
        Self { defs }
    }

    #[must_use]
    pub fn defs(&self) -> &'static [ParamDef] {
        self.defs
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.defs.iter().position(|def| def.name == name)
    }
}

/// Named parameters, each kept inside its declared range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGenome {
    space: ParamSpace,
    values: Vec<f32>,
    stats: GenomeStats,
}

pub type ParamRecord = GenomeRecord<BTreeMap<String, f32>>;

impl ParamGenome {
    /// Value of the parameter `name`, if it belongs to this genome's space.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.space.index_of(name).map(|i| self.values[i])
    }

    /// `(definition, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static ParamDef, f32)> + '_ {
        self.space.defs.iter().zip(self.values.iter().copied())
    }
}

impl ControllerSource for ParamGenome {
    fn controller(&self) -> Box<dyn Controller + '_> {
        Box::new(FuzzyController::new(FuzzyParams::from_lookup(|name| {
            self.get(name)
        })))
    }
}

impl Genome for ParamGenome {
    type Shape = ParamSpace;
    type Record = ParamRecord;

    const KIND: &'static str = "fuzzy";

    fn random<R>(shape: &ParamSpace, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let values = shape
            .defs
            .iter()
            .map(|def| rng.random_range(def.min..=def.max))
            .collect();
        Self {
            space: *shape,
            values,
            stats: GenomeStats::default(),
        }
    }

    fn shape(&self) -> ParamSpace {
        self.space
    }

    fn mutate<R>(&mut self, rate: f32, strength: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let strength = strength.abs();
        for (def, value) in self.space.defs.iter().zip(&mut self.values) {
            if rng.random_bool(rate.into()) {
                let span = def.max - def.min;
                let delta = rng.random_range(-strength..=strength) * span;
                *value = (*value + delta).clamp(def.min, def.max);
            }
        }
    }

    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.space, other.space);
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| if rng.random_bool(0.5) { *a } else { *b })
            .collect();
        Self {
            space: self.space,
            values,
            stats: GenomeStats::default(),
        }
    }

    fn to_record(&self) -> ParamRecord {
        GenomeRecord {
            genes: self
                .iter()
                .map(|(def, value)| (def.name.to_owned(), value))
                .collect(),
            stats: self.stats,
        }
    }

    fn from_record(record: ParamRecord, shape: &ParamSpace) -> Result<Self, GenomeError> {
        if let Some(name) = record.genes.keys().find(|name| shape.index_of(name).is_none()) {
            return Err(GenomeError::UnknownParam { name: name.clone() });
        }
        let values = shape
            .defs
            .iter()
            .map(|def| {
                let value = *record
                    .genes
                    .get(def.name)
                    .ok_or_else(|| GenomeError::MissingParam {
                        name: def.name.to_owned(),
                    })?;
                if !value.is_finite() {
                    return Err(GenomeError::NonFiniteParam {
                        name: def.name.to_owned(),
                    });
                }
                let clamped = value.clamp(def.min, def.max);
                if clamped != value {
                    log::warn!(
                        "parameter '{}' = {value} is outside [{}, {}], clamped to {clamped}",
                        def.name,
                        def.min,
                        def.max
                    );
                }
                Ok(clamped)
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            space: *shape,
            values,
            stats: record.stats,
        })
    }

    fn check_shape(&self, shape: &ParamSpace) -> Result<(), GenomeError> {
        if let Some(def) = shape.defs.iter().find(|def| self.get(def.name).is_none()) {
            return Err(GenomeError::MissingParam {
                name: def.name.to_owned(),
            });
        }
        if let Some(def) = self.space.defs.iter().find(|def| shape.index_of(def.name).is_none()) {
            return Err(GenomeError::UnknownParam {
                name: def.name.to_owned(),
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
        let mut out = String::from("Fuzzy genome:\n");
        for (def, value) in self.iter() {
            let _ = writeln!(out, "  {:<26} {value:>8.2}  [{}, {}]", def.name, def.min, def.max);
        }
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
