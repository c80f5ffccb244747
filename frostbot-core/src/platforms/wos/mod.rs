// frostbot-core/src/platforms/wos/mod.rs

pub mod client;

pub use client::{PlayerInfo, WosClient};
