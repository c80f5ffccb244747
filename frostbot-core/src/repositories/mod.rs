// frostbot-core/src/repositories/mod.rs

pub mod sqlite;

pub use frostbot_common::traits::repository_traits::{
    AccountRepository, ClaimRepository, CodeRepository,
};
pub use sqlite::accounts::SqliteAccountRepository;
pub use sqlite::claims::SqliteClaimRepository;
pub use sqlite::codes::SqliteCodeRepository;
