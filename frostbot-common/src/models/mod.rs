// File: frostbot-common/src/models/mod.rs
pub mod account;
pub mod claim;
pub mod code;
pub mod report;

pub use account::{Account, AllianceSettings};
pub use claim::{ClaimRecord, RedeemStatus};
pub use code::{CodeStatus, GiftCode};
pub use report::{RedeemReport, RedeemSummary};
