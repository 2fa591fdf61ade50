//! Frame-indexed action script.

use duelist_engine::{Action, AgentState};

use crate::controller::Controller;

/// Replays a fixed action per window of frames, ignoring observations.
///
/// Frame `f` uses window `f / frames_per_window`. Frames past the end of the script keep
/// the last window's action, so a script never runs out mid-match.
#[derive(Debug, Clone)]
pub struct ScriptController {
    windows: Vec<Action>,
    frames_per_window: u64,
}

impl ScriptController {
    /// Creates a script over `windows`.
    ///
    /// A `frames_per_window` of zero is treated as one.
    #[must_use]
    pub fn new(windows: Vec<Action>, frames_per_window: u64) -> Self {
        Self {
            windows,
            frames_per_window: frames_per_window.max(1),
        }
    }

    /// Action scheduled for `frame`, or [`Action::IDLE`] for an empty script.
    #[must_use]
    pub fn action_at(&self, frame: u64) -> Action {
        let index = usize::try_from(frame / self.frames_per_window).unwrap_or(usize::MAX);
        self.windows
            .get(index)
            .or(self.windows.last())
            .copied()
            .unwrap_or(Action::IDLE)
    }
}

impl Controller for ScriptController {
    fn decide(&mut self, frame: u64, _me: &AgentState, _enemy: &AgentState) -> Action {
        self.action_at(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Vec<Action> {
        vec![
            Action {
                right: true,
                ..Action::IDLE
            },
            Action {
                primary_fire: true,
                ..Action::IDLE
            },
        ]
    }

    #[test]
    fn test_window_indexing() {
        let controller = ScriptController::new(script(), 10);
        assert!(controller.action_at(0).right);
        assert!(controller.action_at(9).right);
        assert!(controller.action_at(10).primary_fire);
        assert!(controller.action_at(19).primary_fire);
    }

    #[test]
    fn test_holds_last_window() {
        let windows = script();
        let controller = ScriptController::new(windows.clone(), 10);
        assert_eq!(controller.action_at(5000), windows[1]);
    }

    #[test]
    fn test_empty_script_is_idle() {
        let controller = ScriptController::new(vec![], 10);
        assert_eq!(controller.action_at(3), Action::IDLE);
    }
}
