// frostbot-core/src/tasks/mod.rs

pub mod code_sweep;
pub mod validation_sweep;
