//! Recorded trajectories used as a fixed opponent.
//!
//! A recording is a JSON array with one [`Action`] per frame:
//!
//! ```json
//! [
//!   { "up": false, "left": true, "down": false, "right": false, "primaryFire": true, "secondaryFire": false },
//!   ...
//! ]
//! ```

use std::{fs, io, path::Path};

use duelist_engine::{Action, AgentState};
use serde::{Deserialize, Serialize};

use crate::controller::{Controller, ControllerSource};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RecordingError {
    #[display("failed to read recording {path}")]
    Io { path: String, source: io::Error },
    #[display("failed to parse recording {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[display("recording is too short: expected at least {expected} frames, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// Per-frame action list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recording {
    frames: Vec<Action>,
}

impl Recording {
    #[must_use]
    pub fn new(frames: Vec<Action>) -> Self {
        Self { frames }
    }

    /// Loads a recording and checks that it covers at least `min_frames` frames.
    pub fn open<P>(path: P, min_frames: usize) -> Result<Self, RecordingError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = fs::read_to_string(path).map_err(|source| RecordingError::Io {
            path: display.clone(),
            source,
        })?;
        let recording: Self = serde_json::from_str(&json).map_err(|source| {
            RecordingError::Parse {
                path: display.clone(),
                source,
            }
        })?;
        if recording.len() < min_frames {
            return Err(RecordingError::TooShort {
                expected: min_frames,
                actual: recording.len(),
            });
        }
        log::info!("Loaded recording with {} frames from {display}", recording.len());
        Ok(recording)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frames(&self) -> &[Action] {
        &self.frames
    }
}

/// Replays a [`Recording`] frame by frame, idling once it runs out.
#[derive(Debug, Clone)]
pub struct ReplayController<'a> {
    frames: &'a [Action],
}

impl Controller for ReplayController<'_> {
    fn decide(&mut self, frame: u64, _me: &AgentState, _enemy: &AgentState) -> Action {
        usize::try_from(frame)
            .ok()
            .and_then(|i| self.frames.get(i))
            .copied()
            .unwrap_or(Action::IDLE)
    }
}

impl ControllerSource for Recording {
    fn controller(&self) -> Box<dyn Controller + '_> {
        Box::new(ReplayController {
            frames: &self.frames,
        })
    }
}
