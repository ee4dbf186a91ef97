//! Visit Sim: task-driven synthetic visit generation.

pub mod config;
pub mod engine;
pub mod error;
pub mod random;
pub mod tasks;
pub mod visit;
