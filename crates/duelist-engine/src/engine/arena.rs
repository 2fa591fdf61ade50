use std::{
    collections::BTreeMap,
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{
    SimulatorError,
    core::{Action, AgentId, AgentState},
};

use super::SimulatorConfig;

/// One running two-agent contest.
///
/// Implementations advance simulated time in fixed steps and report every agent's state.
/// An arena is used for exactly one match and then shut down.
pub trait Arena {
    /// Prepares the arena for a match.
    fn init(&mut self, label: &str) -> Result<(), SimulatorError>;

    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: f32) -> Result<(), SimulatorError>;

    /// Returns `false` once the simulator has stopped on its own (window closed, crash).
    fn is_running(&self) -> bool;

    /// Returns the current state of every agent, keyed by id.
    fn agent_states(&self) -> BTreeMap<AgentId, AgentState>;

    /// Sets the inputs held by `agent` until the next call.
    fn apply_action(&mut self, agent: AgentId, action: Action) -> Result<(), SimulatorError>;

    /// Releases the simulator instance. Must be idempotent.
    fn shutdown(&mut self);
}

/// Creates arena instances.
///
/// Shared between worker threads, so implementations must be [`Sync`].
pub trait ArenaFactory: Sync {
    fn create(&self, config: &SimulatorConfig) -> Result<Box<dyn Arena>, SimulatorError>;
}

/// An initialized arena that is shut down when dropped.
///
/// This is the only way match code obtains an arena, which guarantees that the simulator
/// instance is released on every exit path: normal completion, early knockout return,
/// step failure or panic unwinding.
pub struct ArenaLease {
    arena: Box<dyn Arena>,
}

impl fmt::Debug for ArenaLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaLease")
            .field("running", &self.arena.is_running())
            .finish_non_exhaustive()
    }
}

impl ArenaLease {
    /// Creates an arena through `factory` and initializes it with `config.label`.
    ///
    /// If initialization fails the freshly created arena is still shut down.
    pub fn acquire(
        factory: &dyn ArenaFactory,
        config: &SimulatorConfig,
    ) -> Result<Self, SimulatorError> {
        let arena = factory.create(config)?;
        let mut lease = Self { arena };
        lease.arena.init(&config.label)?;
        Ok(lease)
    }
}

impl Deref for ArenaLease {
    type Target = dyn Arena;

    fn deref(&self) -> &Self::Target {
        &*self.arena
    }
}

impl DerefMut for ArenaLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.arena
    }
}

impl Drop for ArenaLease {
    fn drop(&mut self) {
        self.arena.shutdown();
    }
}
