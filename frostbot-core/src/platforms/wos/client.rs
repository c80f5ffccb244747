//! Signed claim protocol against the gift-code API.
//!
//! Three endpoints, all taking `application/x-www-form-urlencoded` bodies
//! signed the same way: keys sorted lexicographically, joined as `k=v` with
//! `&`, shared secret appended, MD5-hexed, and the hash prepended as
//! `sign=<hash>&<body>`. One *cycle* for an account is
//! LOGIN -> (CAPTCHA_FETCH -> CAPTCHA_SOLVE) x up-to-4 -> SUBMIT, and every
//! raw `(msg, err_code)` pair is mapped into the closed `RedeemStatus` set
//! right here; nothing stringly-typed escapes this module.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use frostbot_common::models::claim::RedeemStatus;

use crate::captcha::{CaptchaSolver, SolveResult};
use crate::config::Config;
use crate::http::HttpClient;
use crate::Error;

pub struct WosClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    secret: String,
    max_captcha_attempts: u32,
}

/// What the player endpoint tells us about an account.
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    pub nickname: String,
    pub stove_lv: i64,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<PlayerData>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerData {
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    stove_lv: i64,
}

#[derive(Debug, Deserialize)]
struct CaptchaResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<CaptchaData>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptchaData {
    #[serde(default)]
    img: String,
}

#[derive(Debug, Deserialize)]
struct RedeemResponse {
    #[serde(default)]
    msg: String,
    // The API is inconsistent here: sometimes a number, sometimes "" or a
    // numeric string.
    #[serde(default)]
    err_code: serde_json::Value,
}

enum CaptchaFetch {
    Image(Vec<u8>),
    TooFrequent,
    Failed(String),
}

impl WosClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &Config) -> Self {
        Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            secret: config.api_secret.clone(),
            max_captcha_attempts: config.max_captcha_attempts,
        }
    }

    /// Authenticate one account against the player endpoint. `Ok(None)`
    /// means the API rejected the login (terminal for this account on this
    /// code).
    pub async fn login(&self, fid: i64) -> Result<Option<PlayerInfo>, Error> {
        // Login signs a second-resolution timestamp; the other calls use ms.
        let body = sign_form(
            &[
                ("fid", fid.to_string()),
                ("time", Utc::now().timestamp().to_string()),
            ],
            &self.secret,
        );
        let text = self
            .http
            .post_form(&format!("{}/player", self.base_url), body)
            .await?;
        let resp: PlayerResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Platform(format!("player response parse: {e} => {text}")))?;

        if !normalize_msg(&resp.msg).eq_ignore_ascii_case("SUCCESS") {
            debug!("login rejected for fid={fid}: msg={}", resp.msg);
            return Ok(None);
        }
        let data = resp.data.unwrap_or_default();
        Ok(Some(PlayerInfo {
            nickname: data.nickname,
            stove_lv: data.stove_lv,
        }))
    }

    async fn fetch_captcha(&self, fid: i64) -> Result<CaptchaFetch, Error> {
        let body = sign_form(
            &[
                ("fid", fid.to_string()),
                ("time", Utc::now().timestamp_millis().to_string()),
                ("init", "0".to_string()),
            ],
            &self.secret,
        );
        let text = self
            .http
            .post_form(&format!("{}/captcha", self.base_url), body)
            .await?;
        let resp: CaptchaResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Platform(format!("captcha response parse: {e} => {text}")))?;

        let msg = normalize_msg(&resp.msg);
        if resp.code == Some(1) && msg.eq_ignore_ascii_case("CAPTCHA GET TOO FREQUENT") {
            return Ok(CaptchaFetch::TooFrequent);
        }

        let img = resp.data.map(|d| d.img).unwrap_or_default();
        if img.is_empty() {
            return Ok(CaptchaFetch::Failed(format!(
                "no image in captcha response (msg={msg})"
            )));
        }

        // The image arrives base64-encoded, optionally wrapped in a data URI.
        let b64 = match img.find("base64,") {
            Some(idx) => &img[idx + "base64,".len()..],
            None => img.as_str(),
        };
        match BASE64.decode(b64.trim()) {
            Ok(bytes) => Ok(CaptchaFetch::Image(bytes)),
            Err(e) => Ok(CaptchaFetch::Failed(format!("captcha image decode: {e}"))),
        }
    }

    async fn submit(
        &self,
        fid: i64,
        code: &str,
        captcha_code: &str,
    ) -> Result<RedeemStatus, Error> {
        let body = sign_form(
            &[
                ("fid", fid.to_string()),
                ("cdk", code.to_string()),
                ("captcha_code", captcha_code.to_string()),
                ("time", Utc::now().timestamp_millis().to_string()),
            ],
            &self.secret,
        );
        let text = self
            .http
            .post_form(&format!("{}/gift_code", self.base_url), body)
            .await?;
        let resp: RedeemResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Platform(format!("redeem response parse: {e} => {text}")))?;

        map_redeem_response(&resp.msg, err_code_as_i64(&resp.err_code))
    }

    /// One full claim cycle for one account against one code. Solver-side
    /// rejects retry with a *fresh* image (captchas are single-use
    /// challenges) up to the per-cycle budget; submit outcomes are returned
    /// to the orchestrator as-is. Only fatal configuration problems come
    /// back as `Err`.
    pub async fn claim_cycle(
        &self,
        fid: i64,
        code: &str,
        solver: &CaptchaSolver,
    ) -> Result<RedeemStatus, Error> {
        if !solver.is_ready() {
            return Ok(RedeemStatus::SolverError);
        }

        if self.login(fid).await?.is_none() {
            return Ok(RedeemStatus::LoginFailed);
        }

        for attempt in 1..=self.max_captcha_attempts {
            let image = match self.fetch_captcha(fid).await? {
                CaptchaFetch::Image(bytes) => bytes,
                CaptchaFetch::TooFrequent => return Ok(RedeemStatus::TimeoutRetry),
                CaptchaFetch::Failed(reason) => {
                    warn!("captcha fetch failed for fid={fid}: {reason}");
                    return Ok(RedeemStatus::CaptchaFetchError);
                }
            };

            let SolveResult { text, ok } = solver.solve(&image);
            let Some(text) = text.filter(|_| ok) else {
                debug!(
                    "captcha solve attempt {attempt}/{} rejected for fid={fid}",
                    self.max_captcha_attempts
                );
                continue;
            };

            let status = self.submit(fid, code, &text).await?;
            info!("redeem fid={fid} code={code} attempt={attempt} => {status}");
            return Ok(status);
        }

        Ok(RedeemStatus::MaxCaptchaAttempts)
    }
}

fn normalize_msg(msg: &str) -> &str {
    msg.trim().trim_end_matches('.')
}

fn err_code_as_i64(v: &serde_json::Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Decode a redeem response into the closed outcome set. `sign error` in any
/// casing is a fatal configuration problem: the shared secret or signing
/// algorithm is wrong for every account, so the whole batch must stop.
fn map_redeem_response(msg: &str, err_code: Option<i64>) -> Result<RedeemStatus, Error> {
    let norm = normalize_msg(msg).to_uppercase();

    if norm.contains("SIGN ERROR") {
        return Err(Error::SignatureMismatch(format!("remote API said: {msg}")));
    }

    let status = match (norm.as_str(), err_code) {
        ("SUCCESS", _) => RedeemStatus::Success,
        ("RECEIVED", _) | (_, Some(40008)) => RedeemStatus::Received,
        ("SAME TYPE EXCHANGE", _) | (_, Some(40011)) => RedeemStatus::SameTypeExchange,
        ("TIME ERROR", _) | (_, Some(40007)) => RedeemStatus::TimeError,
        ("CDK NOT FOUND", _) | (_, Some(40014)) => RedeemStatus::CdkNotFound,
        ("USED", _) | (_, Some(40005)) => RedeemStatus::UsageLimit,
        ("CAPTCHA CHECK ERROR", _) | (_, Some(40103)) => RedeemStatus::CaptchaInvalid,
        ("CAPTCHA CHECK TOO FREQUENT", _) | (_, Some(40101)) => RedeemStatus::TimeoutRetry,
        ("NOT LOGIN", _) => RedeemStatus::LoginExpired,
        _ => {
            warn!("unrecognized redeem response: msg={msg} err_code={err_code:?}");
            RedeemStatus::UnknownApiResponse
        }
    };
    Ok(status)
}

/// Sign a parameter set: sort keys, join `k=v` with `&`, append the secret,
/// MD5-hex. The returned body is `sign=<hash>&<urlencoded pairs>`.
pub fn sign_form(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let hash = format!("{:x}", md5::compute(format!("{joined}{secret}")));

    let encoded = sorted
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("sign={hash}&{encoded}")
}
