use serde::{Deserialize, Serialize};

/// Identifier of an agent inside one arena.
///
/// Ordering is meaningful: match runners assign side A to the lowest id and side B to
/// the next one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("agent#{_0}")]
pub struct AgentId(pub u32);

/// Horizontal direction an agent is facing.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// Returns `-1.0` for [`Facing::Left`] and `1.0` for [`Facing::Right`].
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Snapshot of one agent as reported by [`Arena::agent_states`](crate::Arena::agent_states).
///
/// Coordinates are screen coordinates: `y` grows downwards, so an agent standing on a
/// higher platform has a smaller `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub x: f32,
    pub y: f32,
    /// Remaining health in `0.0..=100.0`.
    pub health: f32,
    pub lives: u32,
    pub facing: Facing,
}

impl AgentState {
    pub const MAX_HEALTH: f32 = 100.0;

    /// Returns `true` once the agent has no lives left.
    #[must_use]
    pub const fn is_eliminated(&self) -> bool {
        self.lives == 0
    }

    /// Euclidean distance between two agents.
    #[must_use]
    pub fn distance_to(&self, other: &AgentState) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Manhattan distance between two agents.
    #[must_use]
    pub fn manhattan_distance_to(&self, other: &AgentState) -> f32 {
        (other.x - self.x).abs() + (other.y - self.y).abs()
    }
}
