// src/lib.rs

pub mod captcha;
pub mod config;
pub mod db;
pub mod http;
pub mod logging;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;

pub use config::Config;
pub use db::Database;
pub use frostbot_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient};
