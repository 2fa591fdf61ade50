//! Controller traits.

use duelist_engine::{Action, AgentState};

/// Decides the inputs of one agent for one frame.
///
/// Controllers may keep per-match state (for example how long the jump button has been
/// held), so a fresh controller is created for every match.
pub trait Controller {
    /// Returns the action for `frame`.
    ///
    /// `me` is the controlled agent and `enemy` its opponent, both as observed at the
    /// start of the frame. Script-like controllers may ignore the states entirely.
    fn decide(&mut self, frame: u64, me: &AgentState, enemy: &AgentState) -> Action;
}

/// Anything that can produce a controller for a match.
///
/// Implemented by every genome type and by recorded trajectories. Sources are shared
/// between match workers, so they must be [`Sync`].
pub trait ControllerSource: Sync {
    fn controller(&self) -> Box<dyn Controller + '_>;
}

/// Controller that never presses anything.
#[derive(Default, Debug, Clone, Copy)]
pub struct IdleController;

impl Controller for IdleController {
    fn decide(&mut self, _frame: u64, _me: &AgentState, _enemy: &AgentState) -> Action {
        Action::IDLE
    }
}

impl ControllerSource for IdleController {
    fn controller(&self) -> Box<dyn Controller + '_> {
        Box::new(IdleController)
    }
}
