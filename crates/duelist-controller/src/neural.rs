//! Fixed-topology feed-forward network controller.
//!
//! One hidden layer with `tanh` activation, sigmoid outputs thresholded at 0.5:
//!
//! ```text
//! features (12) ──W1,B1──▶ tanh (16) ──W2,B2──▶ sigmoid (6) ──▶ up left down right primary secondary
//! ```
//!
//! The flat weight vector is laid out as `W1 ‖ B1 ‖ W2 ‖ B2`, each matrix row-major with
//! one row per output neuron.

use duelist_engine::{Action, AgentState};
use serde::{Deserialize, Serialize};

use crate::{
    controller::Controller,
    observation::{self, FEATURE_COUNT},
};

/// Layer sizes of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{input}-{hidden}-{output}")]
pub struct Architecture {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input: FEATURE_COUNT,
            hidden: 16,
            output: 6,
        }
    }
}

impl Architecture {
    /// Number of scalars in a flat weight vector for this architecture.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.hidden * self.input + self.hidden + self.output * self.hidden + self.output
    }

    /// Sizes of the four weight blocks, in storage order.
    #[must_use]
    pub const fn blocks(&self) -> [usize; 4] {
        [
            self.hidden * self.input,
            self.hidden,
            self.output * self.hidden,
            self.output,
        ]
    }
}

const OUTPUT_THRESHOLD: f32 = 0.5;
const MAX_JUMP_HOLD: u32 = 20;
const JUMP_HOLD_DECAY: u32 = 2;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-50.0, 50.0)).exp())
}

/// Computes `act(W·x + b)` into `out`.
fn dense(weights: &[f32], bias: &[f32], x: &[f32], out: &mut [f32], act: fn(f32) -> f32) {
    for ((o, row), b) in out.iter_mut().zip(weights.chunks_exact(x.len())).zip(bias) {
        let sum: f32 = row.iter().zip(x).map(|(w, v)| w * v).sum();
        *o = act(sum + b);
    }
}

/// Network controller borrowing its weights.
#[derive(Debug, Clone)]
pub struct NeuralController<'a> {
    arch: Architecture,
    weights: &'a [f32],
    jump_hold: u32,
    hidden: Vec<f32>,
    output: Vec<f32>,
}

impl<'a> NeuralController<'a> {
    /// Creates a controller over `weights`.
    ///
    /// The weight vector must be exactly [`Architecture::total`] long; genome loading checks
    /// this before any controller is built.
    #[must_use]
    pub fn new(arch: Architecture, weights: &'a [f32]) -> Self {
        debug_assert_eq!(weights.len(), arch.total());
        Self {
            arch,
            weights,
            jump_hold: 0,
            hidden: vec![0.0; arch.hidden],
            output: vec![0.0; arch.output],
        }
    }

    /// Runs the forward pass and returns the raw output activations.
    pub fn forward(&mut self, input: &[f32]) -> &[f32] {
        let [w1, b1, w2, _] = self.arch.blocks();
        let (w1s, rest) = self.weights.split_at(w1);
        let (b1s, rest) = rest.split_at(b1);
        let (w2s, b2s) = rest.split_at(w2);
        dense(w1s, b1s, input, &mut self.hidden, f32::tanh);
        dense(w2s, b2s, &self.hidden, &mut self.output, sigmoid);
        &self.output
    }
}

impl Controller for NeuralController<'_> {
    fn decide(&mut self, _frame: u64, me: &AgentState, enemy: &AgentState) -> Action {
        let input = observation::features(me, enemy);
        let pressed: Vec<bool> = self
            .forward(&input[..self.arch.input.min(FEATURE_COUNT)])
            .iter()
            .map(|&o| o > OUTPUT_THRESHOLD)
            .collect();
        let button = |i: usize| pressed.get(i).copied().unwrap_or(false);

        if button(0) {
            self.jump_hold = (self.jump_hold + 1).min(MAX_JUMP_HOLD);
        } else {
            self.jump_hold = self.jump_hold.saturating_sub(JUMP_HOLD_DECAY);
        }

        Action {
            up: self.jump_hold > 0,
            left: button(1),
            down: button(2),
            right: button(3),
            primary_fire: button(4),
            secondary_fire: button(5),
        }
    }
}
