//! Scripted arenas for evaluator and trainer tests.

use std::collections::BTreeMap;

use duelist_engine::{
    Action, AgentId, AgentState, Arena, ArenaFactory, Facing, SimulatorConfig, SimulatorError,
};

/// Two motionless agents; agent 2 loses its last life once `knockout_frame` steps ran.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KnockoutArenaFactory {
    pub(crate) knockout_frame: u64,
}

struct KnockoutArena {
    knockout_frame: u64,
    steps: u64,
    running: bool,
}

impl Arena for KnockoutArena {
    fn init(&mut self, _label: &str) -> Result<(), SimulatorError> {
        self.running = true;
        Ok(())
    }

    fn step(&mut self, _dt: f32) -> Result<(), SimulatorError> {
        self.steps += 1;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn agent_states(&self) -> BTreeMap<AgentId, AgentState> {
        let a = AgentState {
            x: 200.0,
            y: 430.0,
            health: 100.0,
            lives: 3,
            facing: Facing::Right,
        };
        let knocked_out = self.steps >= self.knockout_frame;
        let b = AgentState {
            x: 800.0,
            health: if knocked_out { 0.0 } else { 100.0 },
            lives: if knocked_out { 0 } else { 3 },
            facing: Facing::Left,
            ..a
        };
        BTreeMap::from([(AgentId(1), a), (AgentId(2), b)])
    }

    fn apply_action(&mut self, _agent: AgentId, _action: Action) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
    }
}

impl ArenaFactory for KnockoutArenaFactory {
    fn create(&self, _config: &SimulatorConfig) -> Result<Box<dyn Arena>, SimulatorError> {
        Ok(Box::new(KnockoutArena {
            knockout_frame: self.knockout_frame,
            steps: 0,
            running: false,
        }))
    }
}

/// Every arena crashes on creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingFactory;

impl ArenaFactory for FailingFactory {
    fn create(&self, _config: &SimulatorConfig) -> Result<Box<dyn Arena>, SimulatorError> {
        Err(SimulatorError::Crashed {
            reason: "no simulator available".to_owned(),
        })
    }
}
