//! Simulator boundary for two-agent duels.
//!
//! The training engine treats the match simulator as an external collaborator. This crate
//! pins down the boundary it talks to and ships one small reference implementation:
//!
//! - [`Arena`] - One running contest: advance time, observe agents, apply actions
//! - [`ArenaFactory`] - Creates arena instances from an explicit [`SimulatorConfig`]
//! - [`ArenaLease`] - Scoped acquisition; the arena is shut down on every exit path
//! - [`DuelArena`] - Deterministic flat-stage duel used by the CLI and tests
//!
//! # Example
//!
//! ```
//! use duelist_engine::{Action, ArenaLease, DuelArenaFactory, SimulatorConfig};
//!
//! let factory = DuelArenaFactory::default();
//! let config = SimulatorConfig::default();
//! let mut arena = ArenaLease::acquire(&factory, &config).unwrap();
//!
//! let ids: Vec<_> = arena.agent_states().into_keys().collect();
//! arena.apply_action(ids[0], Action { right: true, ..Action::IDLE }).unwrap();
//! arena.step(config.dt).unwrap();
//! // the arena is shut down when `arena` goes out of scope
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Failure reported by a simulator instance.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SimulatorError {
    #[display("failed to initialize arena '{label}'")]
    InitFailed { label: String },
    #[display("arena has been shut down")]
    ShutDown,
    #[display("unknown agent {agent}")]
    UnknownAgent { agent: AgentId },
    #[display("simulator crashed: {reason}")]
    Crashed { reason: String },
    #[display("match exceeded its wall-clock limit of {limit:?}")]
    DeadlineExceeded { limit: std::time::Duration },
}
