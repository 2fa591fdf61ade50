//! Controllers that turn observations into actions, and the match runner that pits two of
//! them against each other.
//!
//! This crate implements the layer between genomes and the simulator:
//!
//! 1. **Controllers** ([`controller`]) - Map `(frame, own state, enemy state)` to an
//!    [`Action`](duelist_engine::Action). Three kinds are driven by evolvable parameters:
//!    fuzzy rules ([`fuzzy`]), a fixed-topology network ([`neural`]) and a frame-indexed
//!    action script ([`script`]). A fourth replays a recorded trajectory ([`recording`]).
//!
//! 2. **Match runner** ([`match_runner`]) - Acquires an arena, drives both controllers
//!    frame by frame up to a hard frame ceiling, and reports a [`MatchOutcome`].
//!
//! # Architecture
//!
//! ```text
//! Fitness evaluation (duelist-training)
//!     ↓ uses
//! Match runner (one contest, side A vs side B)
//!     ↓ drives
//! Controllers (one per side)  +  Arena (duelist-engine)
//! ```
//!
//! [`MatchOutcome`]: match_runner::MatchOutcome

pub mod controller;
pub mod fuzzy;
pub mod match_runner;
pub mod neural;
pub mod observation;
pub mod recording;
pub mod script;
