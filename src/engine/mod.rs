// src/engine/mod.rs

//! The attempt engine: rule gates, question sampling, grading and scoring,
//! composed by the attempt lifecycle.

pub mod grading;
pub mod lifecycle;
pub mod rules;
pub mod sampler;
pub mod scoring;

pub use lifecycle::{start_attempt, submit_attempt};
