use std::{num::NonZeroUsize, path::PathBuf, thread};

use serde::{Deserialize, Serialize};

/// Physics step of a 60 FPS game loop.
pub const DEFAULT_DT: f32 = 0.0166;

/// Settings handed to an [`ArenaFactory`](crate::ArenaFactory) when creating arenas.
///
/// Everything a simulator needs to locate its assets is carried here explicitly; arenas
/// must not depend on the process working directory or other process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Window/instance label passed to [`Arena::init`](crate::Arena::init).
    pub label: String,
    /// Simulated seconds advanced per frame.
    pub dt: f32,
    /// Number of simulator instances that may run at the same time.
    pub instances: NonZeroUsize,
    /// Directory holding simulator assets, if the simulator needs any.
    pub asset_dir: Option<PathBuf>,
    /// Skip rendering.
    pub headless: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            label: "duelist".to_owned(),
            dt: DEFAULT_DT,
            instances: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            asset_dir: None,
            headless: true,
        }
    }
}
