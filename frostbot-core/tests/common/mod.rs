// tests/common/mod.rs
//
// Shared fixtures: in-memory database, scripted HTTP client, scripted OCR
// engine, and a config with millisecond cooldowns so retry tests do not wait
// out real minutes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use frostbot_common::models::report::RedeemReport;
use frostbot_core::captcha::{CaptchaSolver, SavePolicy, TextRecognizer};
use frostbot_core::platforms::wos::WosClient;
use frostbot_core::repositories::{
    SqliteAccountRepository, SqliteClaimRepository, SqliteCodeRepository,
};
use frostbot_core::services::{ChannelSink, RedemptionService};
use frostbot_core::{Config, Database, Error, HttpClient};

pub async fn setup_test_db() -> Database {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db
}

pub fn test_config() -> Config {
    Config {
        api_base: "http://api.test/api".to_string(),
        api_secret: "test_secret".to_string(),
        max_captcha_attempts: 4,
        max_retry_cycles: 10,
        captcha_cycle_cooldown: Duration::from_millis(30),
        api_rate_limit_cooldown: Duration::from_millis(40),
        claim_delay: Duration::from_millis(1),
        progress_interval: Duration::from_millis(100),
        validation_pacing: Duration::from_millis(20),
        discovery_interval: Duration::from_secs(1800),
        captcha_save_policy: SavePolicy::None,
        captcha_save_dir: PathBuf::from("unused"),
        aggregator_base: Some("http://agg.test".to_string()),
    }
}

type Handler = Box<dyn Fn(&str, &str) -> Result<String, Error> + Send + Sync>;

/// Scripted HTTP client. The handler gets (url, body) and every call is
/// recorded for assertions.
pub struct MockHttp {
    handler: Handler,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockHttp {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&str, &str) -> Result<String, Error> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A client that fails the test if any network call happens.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|url, _| panic!("unexpected network call to {url}"))
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter(|(url, _)| url.contains(path))
            .collect()
    }

    fn record(&self, url: &str, body: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.to_string()));
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn post_form(&self, url: &str, body: String) -> Result<String, Error> {
        self.record(url, &body);
        (self.handler)(url, &body)
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<String, Error> {
        let body = body.to_string();
        self.record(url, &body);
        (self.handler)(url, &body)
    }

    async fn get(&self, url: &str) -> Result<String, Error> {
        self.record(url, "");
        (self.handler)(url, "")
    }
}

pub struct FixedRecognizer(pub &'static str);

impl TextRecognizer for FixedRecognizer {
    fn classify(&self, _image: &[u8]) -> Result<String, Error> {
        Ok(self.0.to_string())
    }
}

pub struct BrokenRecognizer;

impl TextRecognizer for BrokenRecognizer {
    fn classify(&self, _image: &[u8]) -> Result<String, Error> {
        Err(Error::Platform("engine not loaded".into()))
    }
}

pub fn working_solver() -> Arc<CaptchaSolver> {
    Arc::new(CaptchaSolver::new(
        Box::new(FixedRecognizer("AB34")),
        SavePolicy::None,
        PathBuf::from("unused"),
    ))
}

pub fn broken_solver() -> Arc<CaptchaSolver> {
    Arc::new(CaptchaSolver::new(
        Box::new(BrokenRecognizer),
        SavePolicy::None,
        PathBuf::from("unused"),
    ))
}

pub struct TestRig {
    pub db: Database,
    pub service: Arc<RedemptionService>,
    pub reports: UnboundedReceiver<RedeemReport>,
}

pub async fn build_service(
    db: Database,
    http: Arc<MockHttp>,
    solver: Arc<CaptchaSolver>,
    config: Config,
) -> TestRig {
    let codes = Arc::new(SqliteCodeRepository::new(db.pool().clone()));
    let claims = Arc::new(SqliteClaimRepository::new(db.pool().clone()));
    let accounts = Arc::new(SqliteAccountRepository::new(db.pool().clone()));
    let http: Arc<dyn HttpClient> = http;
    let client = Arc::new(WosClient::new(http, &config));
    let (sink, reports) = ChannelSink::new();

    let service = Arc::new(RedemptionService::new(
        codes,
        claims,
        accounts,
        client,
        solver,
        Arc::new(sink),
        config,
    ));

    TestRig { db, service, reports }
}

pub async fn seed_alliance(db: &Database, alliance_id: i64, auto_redeem: bool, fids: &[i64]) {
    sqlx::query("INSERT INTO alliances (alliance_id, name, auto_redeem, probe_fid) VALUES (?, ?, ?, ?)")
        .bind(alliance_id)
        .bind(format!("alliance-{alliance_id}"))
        .bind(auto_redeem)
        .bind(fids.first().copied())
        .execute(db.pool())
        .await
        .unwrap();

    for fid in fids {
        sqlx::query("INSERT INTO accounts (fid, nickname, alliance_id, level) VALUES (?, ?, ?, ?)")
            .bind(fid)
            .bind(format!("player-{fid}"))
            .bind(alliance_id)
            .bind(10)
            .execute(db.pool())
            .await
            .unwrap();
    }
}

pub fn fid_from_body(body: &str) -> i64 {
    body.split('&')
        .find_map(|kv| kv.strip_prefix("fid="))
        .and_then(|v| v.parse().ok())
        .expect("body carries a fid")
}

// Canned response bodies.

pub fn player_ok() -> String {
    serde_json::json!({
        "code": 0,
        "msg": "success",
        "data": { "nickname": "player", "stove_lv": 30 }
    })
    .to_string()
}

pub fn captcha_ok() -> String {
    // "hi" as a data-URI payload; the mock recognizer ignores the pixels.
    serde_json::json!({
        "code": 0,
        "msg": "SUCCESS",
        "data": { "img": "data:image/png;base64,aGk=" }
    })
    .to_string()
}

pub fn captcha_too_frequent() -> String {
    serde_json::json!({
        "code": 1,
        "msg": "CAPTCHA GET TOO FREQUENT.",
        "data": {}
    })
    .to_string()
}

pub fn redeem_response(msg: &str, err_code: i64) -> String {
    serde_json::json!({ "msg": msg, "err_code": err_code }).to_string()
}

pub fn redeem_success() -> String {
    serde_json::json!({ "msg": "SUCCESS", "err_code": "" }).to_string()
}
