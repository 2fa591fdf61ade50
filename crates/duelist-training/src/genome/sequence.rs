use std::fmt::Write as _;

use duelist_controller::{
    controller::{Controller, ControllerSource},
    script::ScriptController,
};
use duelist_engine::Action;
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use super::{Genome, GenomeError, GenomeRecord, GenomeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizontal {
    Left,
    Right,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fire {
    Primary,
    Secondary,
    Hold,
}

impl Horizontal {
    const ALL: [Self; 3] = [Self::Left, Self::Right, Self::Neutral];
}

impl Vertical {
    const ALL: [Self; 3] = [Self::Up, Self::Down, Self::Neutral];
}

impl Fire {
    const ALL: [Self; 3] = [Self::Primary, Self::Secondary, Self::Hold];
}

/// Picks a value from `all` other than `current`.
fn other_than<T, R>(all: &[T; 3], current: T, rng: &mut R) -> T
where
    T: Copy + PartialEq,
    R: Rng + ?Sized,
{
    let others: Vec<T> = all.iter().copied().filter(|v| *v != current).collect();
    others.choose(rng).copied().unwrap_or(current)
}

/// Inputs held for one window of frames: one choice per input group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionWindow {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
    pub fire: Fire,
}

impl ActionWindow {
    /// No input at all.
    pub const STAND_STILL: Self = Self {
        horizontal: Horizontal::Neutral,
        vertical: Vertical::Neutral,
        fire: Fire::Hold,
    };

    /// Walk right while holding primary fire.
    pub const ADVANCE_FIRING: Self = Self {
        horizontal: Horizontal::Right,
        vertical: Vertical::Neutral,
        fire: Fire::Primary,
    };

    fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            horizontal: Horizontal::ALL[rng.random_range(0..3)],
            vertical: Vertical::ALL[rng.random_range(0..3)],
            fire: Fire::ALL[rng.random_range(0..3)],
        }
    }

    /// Replaces one randomly chosen input group with a different value.
    fn mutate<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        match rng.random_range(0..3) {
            0 => self.horizontal = other_than(&Horizontal::ALL, self.horizontal, rng),
            1 => self.vertical = other_than(&Vertical::ALL, self.vertical, rng),
            _ => self.fire = other_than(&Fire::ALL, self.fire, rng),
        }
    }

    #[must_use]
    pub fn to_action(self) -> Action {
        Action {
            up: self.vertical == Vertical::Up,
            left: self.horizontal == Horizontal::Left,
            down: self.vertical == Vertical::Down,
            right: self.horizontal == Horizontal::Right,
            primary_fire: self.fire == Fire::Primary,
            secondary_fire: self.fire == Fire::Secondary,
        }
    }
}

/// Window layout of a [`SequenceGenome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceShape {
    pub windows: usize,
    pub frames_per_window: u64,
}

impl Default for SequenceShape {
    /// Ten seconds at 60 frames per second, in windows of ten frames.
    fn default() -> Self {
        Self {
            windows: 60,
            frames_per_window: 10,
        }
    }
}

impl SequenceShape {
    /// Number of frames the script covers.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.windows as u64 * self.frames_per_window
    }
}

/// Fixed action script, one [`ActionWindow`] per window of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceGenome {
    windows: Vec<ActionWindow>,
    frames_per_window: u64,
    stats: GenomeStats,
}

pub type SequenceRecord = GenomeRecord<Vec<ActionWindow>>;

impl SequenceGenome {
    /// A script repeating `window` for the whole shape.
    #[must_use]
    pub fn uniform(shape: &SequenceShape, window: ActionWindow) -> Self {
        Self {
            windows: vec![window; shape.windows],
            frames_per_window: shape.frames_per_window,
            stats: GenomeStats::default(),
        }
    }

    #[must_use]
    pub fn windows(&self) -> &[ActionWindow] {
        &self.windows
    }
}

impl ControllerSource for SequenceGenome {
    fn controller(&self) -> Box<dyn Controller + '_> {
        let actions = self.windows.iter().map(|w| w.to_action()).collect();
        Box::new(ScriptController::new(actions, self.frames_per_window))
    }
}

impl Genome for SequenceGenome {
    type Shape = SequenceShape;
    type Record = SequenceRecord;

    const KIND: &'static str = "sequence";

    fn random<R>(shape: &SequenceShape, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            windows: (0..shape.windows).map(|_| ActionWindow::random(rng)).collect(),
            frames_per_window: shape.frames_per_window,
            stats: GenomeStats::default(),
        }
    }

    fn shape(&self) -> SequenceShape {
        SequenceShape {
            windows: self.windows.len(),
            frames_per_window: self.frames_per_window,
        }
    }

    /// `rate` is the per-window probability; `strength` is unused by this encoding.
    fn mutate<R>(&mut self, rate: f32, _strength: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for window in &mut self.windows {
            if rng.random_bool(rate.into()) {
                window.mutate(rng);
            }
        }
    }

    /// Single-point crossover; the cut leaves at least one window from each parent.
    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.windows.len(), other.windows.len());
        let len = self.windows.len();
        let cut = if len >= 3 {
            rng.random_range(1..=len - 2)
        } else {
            len / 2
        };
        let windows = self.windows[..cut]
            .iter()
            .chain(&other.windows[cut..])
            .copied()
            .collect();
        Self {
            windows,
            frames_per_window: self.frames_per_window,
            stats: GenomeStats::default(),
        }
    }

    fn to_record(&self) -> SequenceRecord {
        GenomeRecord {
            genes: self.windows.clone(),
            stats: self.stats,
        }
    }

    fn from_record(record: SequenceRecord, shape: &SequenceShape) -> Result<Self, GenomeError> {
        if record.genes.is_empty() {
            return Err(GenomeError::EmptySequence);
        }
        Ok(Self {
            windows: record.genes,
            frames_per_window: shape.frames_per_window,
            stats: record.stats,
        })
    }

    fn check_shape(&self, shape: &SequenceShape) -> Result<(), GenomeError> {
        if self.windows.len() != shape.windows {
            return Err(GenomeError::WindowCountMismatch {
                expected: shape.windows,
                actual: self.windows.len(),
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
        let fire_windows = self
            .windows
            .iter()
            .filter(|w| w.fire != Fire::Hold)
            .count();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Sequence genome: {} windows x {} frames ({fire_windows} firing)",
            self.windows.len(),
            self.frames_per_window
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
