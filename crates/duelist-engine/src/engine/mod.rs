//! Arena lifecycle and the reference simulator.
//!
//! - [`Arena`] / [`ArenaFactory`] - The boundary every simulator implements
//! - [`ArenaLease`] - Acquire, use for exactly one match, release on drop
//! - [`SimulatorConfig`] - Explicit simulator settings passed at construction
//! - [`DuelArena`] - Deterministic flat-stage duel
//!
//! # Lifecycle
//!
//! 1. [`ArenaLease::acquire`] creates an arena through the factory and calls [`Arena::init`]
//! 2. The match runner alternates [`Arena::agent_states`], [`Arena::apply_action`] and
//!    [`Arena::step`] until a knockout or the frame ceiling
//! 3. Dropping the lease calls [`Arena::shutdown`], including when `init` failed or a step
//!    returned an error

pub use self::{arena::*, duel_arena::*, simulator_config::*};

mod arena;
mod duel_arena;
mod simulator_config;
