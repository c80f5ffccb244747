//! Captcha solving wrapper.
//!
//! The OCR engine itself is consumed as an opaque `TextRecognizer`; this
//! module owns everything around it: the startup self-test, the output
//! validity contract (exactly 4 characters from a fixed alphabet), and the
//! policy-driven persistence of source images for diagnostics. Image saving
//! must never block or fail the claim path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use tracing::{info, warn};

use crate::Error;

/// Characters the remote captcha can actually contain. Visually ambiguous
/// glyphs (0/O, 1/I) never appear, so any recognition containing one is a
/// misread by construction.
pub const CAPTCHA_ALPHABET: &str = "23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Every captcha is exactly this long.
pub const CAPTCHA_LENGTH: usize = 4;

/// 1x1 white PNG used for the startup self-test classification.
const SELF_TEST_IMAGE_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Opaque text-recognition engine. Production wires in an actual OCR model;
/// tests substitute a scripted implementation.
pub trait TextRecognizer: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<String, Error>;
}

/// Which captcha images get written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    None,
    FailuresOnly,
    SuccessesOnly,
    All,
}

impl SavePolicy {
    fn wants(&self, ok: bool) -> bool {
        match self {
            SavePolicy::None => false,
            SavePolicy::FailuresOnly => !ok,
            SavePolicy::SuccessesOnly => ok,
            SavePolicy::All => true,
        }
    }
}

impl fmt::Display for SavePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavePolicy::None => write!(f, "none"),
            SavePolicy::FailuresOnly => write!(f, "failures"),
            SavePolicy::SuccessesOnly => write!(f, "successes"),
            SavePolicy::All => write!(f, "all"),
        }
    }
}

impl FromStr for SavePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SavePolicy::None),
            "failures" | "failures_only" => Ok(SavePolicy::FailuresOnly),
            "successes" | "successes_only" => Ok(SavePolicy::SuccessesOnly),
            "all" => Ok(SavePolicy::All),
            _ => Err(format!("Invalid save policy: {}", s)),
        }
    }
}

/// Result of one solve attempt. `ok` is true only when the recognized text
/// satisfies the length/alphabet contract; callers must re-fetch a fresh
/// image before retrying, captchas are single-use.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub text: Option<String>,
    pub ok: bool,
}

pub struct CaptchaSolver {
    engine: Option<Box<dyn TextRecognizer>>,
    save_policy: SavePolicy,
    save_dir: PathBuf,
}

impl CaptchaSolver {
    /// Wraps `engine`, running a self-test classification against a blank
    /// image. If the self-test errors the solver reports not-ready and the
    /// orchestrator must treat every claim as a solver error without
    /// touching the network.
    pub fn new(
        engine: Box<dyn TextRecognizer>,
        save_policy: SavePolicy,
        save_dir: PathBuf,
    ) -> Self {
        let blank = BASE64
            .decode(SELF_TEST_IMAGE_B64)
            .expect("self-test image constant is valid base64");

        let engine = match engine.classify(&blank) {
            Ok(_) => {
                info!("captcha solver self-test passed");
                Some(engine)
            }
            Err(e) => {
                warn!("captcha solver self-test failed => solver disabled: {e}");
                None
            }
        };

        Self {
            engine,
            save_policy,
            save_dir,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Run the engine over `image` and validate the output. Image saving
    /// happens here per policy; save failures are logged and swallowed.
    pub fn solve(&self, image: &[u8]) -> SolveResult {
        let Some(engine) = &self.engine else {
            return SolveResult { text: None, ok: false };
        };

        let result = match engine.classify(image) {
            Ok(raw) => {
                let text = raw.trim().to_uppercase();
                let ok = is_valid_captcha_text(&text);
                SolveResult { text: Some(text), ok }
            }
            Err(e) => {
                warn!("captcha classification failed: {e}");
                SolveResult { text: None, ok: false }
            }
        };

        if self.save_policy.wants(result.ok) {
            let name = match (&result.text, result.ok) {
                (Some(text), true) => text.clone(),
                _ => format!("FAIL_{}", Utc::now().format("%Y%m%d%H%M%S%3f")),
            };
            if let Err(e) = self.save_image(image, &name) {
                warn!("failed to persist captcha image '{name}': {e}");
            }
        }

        result
    }

    fn save_image(&self, image: &[u8], name: &str) -> Result<(), Error> {
        std::fs::create_dir_all(&self.save_dir)?;
        let path = unique_path(&self.save_dir, name);
        std::fs::write(path, image)?;
        Ok(())
    }
}

/// True iff `text` meets the captcha output contract.
pub fn is_valid_captcha_text(text: &str) -> bool {
    text.chars().count() == CAPTCHA_LENGTH
        && text.chars().all(|c| CAPTCHA_ALPHABET.contains(c))
}

/// Pick `<name>.png`, or `<name>_1.png`, `<name>_2.png`... if taken.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(format!("{name}.png"));
    if !candidate.exists() {
        return candidate;
    }
    for n in 1.. {
        let candidate = dir.join(format!("{name}_{n}.png"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}
