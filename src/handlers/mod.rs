// src/handlers/mod.rs

pub mod attempt;
pub mod quiz;
pub mod stats;
