//! Rule-Based Fallback System
//!
//! Provides a crude eye-state heuristic when no trained classifier is loaded.

mod rules;

pub use rules::{HeuristicVote, IntensityHeuristic, DEFAULT_OPEN_INTENSITY};
