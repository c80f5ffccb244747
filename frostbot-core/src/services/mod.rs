// frostbot-core/src/services/mod.rs

pub mod redemption;
pub mod report;

pub use redemption::RedemptionService;
pub use report::{ChannelSink, ReportSink, TracingSink};
