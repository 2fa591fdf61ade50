//! Plain data exchanged across the simulator boundary.
//!
//! - [`AgentId`] - Identifier the arena assigns to each agent
//! - [`AgentState`] - Observed position, health, lives and facing of one agent
//! - [`Action`] - The six boolean inputs a controller presses for one frame

pub use self::{action::*, agent::*};

mod action;
mod agent;
