// frostbot-core/src/repositories/sqlite/mod.rs

pub mod accounts;
pub mod claims;
pub mod codes;
