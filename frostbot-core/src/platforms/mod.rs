// frostbot-core/src/platforms/mod.rs

pub mod aggregator;
pub mod wos;
