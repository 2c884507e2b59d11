//! Short race-engineer critiques of a completed attempt.
//!
//! Feedback is strictly best effort: providers swallow their own failures and
//! answer `None`, and the engine only shows a reply that belongs to the most
//! recent request.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::rating::{rate, Rating};
use crate::records::format_seconds;
use crate::runtime::AppEvent;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
const GEMINI_TIMEOUT_SECS: u64 = 10;

/// Which provider the app should use
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackMode {
    /// Offline canned engineer notes
    Engineer,
    /// Google Gemini generateContent API
    Gemini,
    Off,
}

/// A feedback request issued when an attempt completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub seq: u64,
    pub last_time_ms: u64,
    /// Best before this attempt, or the attempt itself when there was none
    pub best_time_ms: u64,
    /// No best time existed before this attempt
    pub first_benchmark: bool,
}

/// Resolution of a [`FeedbackRequest`], tagged with its sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReply {
    pub seq: u64,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response contained no text")]
    EmptyResponse,
}

/// Produces a one-line critique. Must not panic; failures resolve to `None`.
/// Called from a background thread and may block.
pub trait FeedbackProvider: Send + Sync {
    fn request_feedback(&self, last_time_ms: u64, best_time_ms: u64) -> Option<String>;

    /// Entry point used by [`FeedbackWorker`]. Providers that care whether a
    /// best existed before this attempt override it.
    fn respond(&self, request: &FeedbackRequest) -> Option<String> {
        self.request_feedback(request.last_time_ms, request.best_time_ms)
    }
}

/// Never says anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackProvider for NoFeedback {
    fn request_feedback(&self, _last_time_ms: u64, _best_time_ms: u64) -> Option<String> {
        None
    }
}

/// Offline notes picked from a small phrase book per rating band
#[derive(Debug, Clone, Copy, Default)]
pub struct PitWallFeedback;

impl PitWallFeedback {
    fn phrases(rating: Rating) -> &'static [&'static str] {
        match rating {
            Rating::Insane => &[
                "Reaction is borderline telepathic, keep that clutch release exactly there.",
                "That launch would have you into turn one before the grid knows the lights are out.",
            ],
            Rating::Purple => &[
                "Purple on the launch, clean clutch bite and no hesitation.",
                "Strong getaway, that is a front-row reaction.",
            ],
            Rating::Good => &[
                "Good pace off the line, a touch more anticipation and you are purple.",
                "Solid launch, we are within a tenth of the sharp end.",
            ],
            Rating::Average => &[
                "Average getaway, you are losing positions into the first apex.",
                "Midfield reaction, focus on the lights, not the rhythm.",
            ],
            Rating::Slow => &[
                "Slow off the line, the pack is already past you.",
                "Too much hesitation at lights out, reset and go again.",
            ],
            Rating::Glacial => &[
                "Glacial. Were we waiting for the safety car?",
                "That is a pit-lane start reaction, wake up and go again.",
            ],
        }
    }

    fn delta_note(last_time_ms: u64, best_time_ms: u64) -> String {
        if last_time_ms < best_time_ms {
            format!(
                "New benchmark, {}s under the old best.",
                format_seconds(best_time_ms - last_time_ms)
            )
        } else if last_time_ms == best_time_ms {
            "Right on your best.".to_string()
        } else {
            format!(
                "Delta to best is +{}s.",
                format_seconds(last_time_ms - best_time_ms)
            )
        }
    }

    fn note(last_time_ms: u64, delta_note: String) -> Option<String> {
        let phrase = Self::phrases(rate(last_time_ms)).choose(&mut rand::thread_rng())?;
        Some(format!("{phrase} {delta_note}"))
    }
}

impl FeedbackProvider for PitWallFeedback {
    fn request_feedback(&self, last_time_ms: u64, best_time_ms: u64) -> Option<String> {
        Self::note(last_time_ms, Self::delta_note(last_time_ms, best_time_ms))
    }

    fn respond(&self, request: &FeedbackRequest) -> Option<String> {
        if request.first_benchmark {
            Self::note(
                request.last_time_ms,
                "First benchmark on the board.".to_string(),
            )
        } else {
            self.request_feedback(request.last_time_ms, request.best_time_ms)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini `generateContent` client using a blocking HTTP call
#[derive(Debug, Clone)]
pub struct GeminiFeedback {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiFeedback {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, FeedbackError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(GEMINI_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Key from `GEMINI_API_KEY`, falling back to `API_KEY`
    pub fn from_env(model: impl Into<String>) -> Result<Self, FeedbackError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok();
        Self::new(api_key, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn build_prompt(last_time_ms: u64, best_time_ms: u64) -> String {
        format!(
            "You are a cold, professional F1 race engineer. Analyze a reaction time of {last_time_ms}ms \
             (Best is {best_time_ms}ms). Provide a one-sentence critique or encouragement using motorsport \
             terminology like 'delta', 'apex', 'reaction', 'clutch', 'lights out'. Be concise."
        )
    }

    pub fn build_request_body(last_time_ms: u64, best_time_ms: u64) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": Self::build_prompt(last_time_ms, best_time_ms) }]
            }],
            "generationConfig": {
                "temperature": 0.8,
                "maxOutputTokens": 100
            }
        })
    }

    /// Text parts of the first candidate, joined and trimmed
    pub fn parse_response(body: &str) -> Result<String, FeedbackError> {
        let response: GenerateContentResponse =
            serde_json::from_str(body).map_err(|_| FeedbackError::EmptyResponse)?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            Err(FeedbackError::EmptyResponse)
        } else {
            Ok(text.to_string())
        }
    }

    fn try_request(&self, last_time_ms: u64, best_time_ms: u64) -> Result<String, FeedbackError> {
        let api_key = self.api_key.as_deref().ok_or(FeedbackError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request_body(last_time_ms, best_time_ms))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(FeedbackError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Self::parse_response(&body)
    }
}

impl FeedbackProvider for GeminiFeedback {
    fn request_feedback(&self, last_time_ms: u64, best_time_ms: u64) -> Option<String> {
        match self.try_request(last_time_ms, best_time_ms) {
            Ok(text) => Some(text),
            Err(FeedbackError::MissingApiKey) => {
                tracing::debug!("gemini feedback skipped, no API key");
                None
            }
            Err(e) => {
                tracing::warn!(%e, model = %self.model, "gemini feedback failed");
                None
            }
        }
    }
}

/// Build the provider for `mode`. Gemini falls back to no feedback when its
/// client cannot be constructed.
pub fn provider_for(mode: FeedbackMode, gemini_model: &str) -> Arc<dyn FeedbackProvider> {
    match mode {
        FeedbackMode::Engineer => Arc::new(PitWallFeedback),
        FeedbackMode::Off => Arc::new(NoFeedback),
        FeedbackMode::Gemini => match GeminiFeedback::from_env(gemini_model) {
            Ok(provider) => {
                if !provider.has_api_key() {
                    tracing::warn!("gemini feedback selected but no API key is set");
                }
                Arc::new(provider)
            }
            Err(e) => {
                tracing::warn!(%e, "could not build gemini client, feedback disabled");
                Arc::new(NoFeedback)
            }
        },
    }
}

/// Runs feedback requests on background threads and posts the replies back
/// into the app's event stream.
#[derive(Clone)]
pub struct FeedbackWorker {
    provider: Arc<dyn FeedbackProvider>,
    tx: Sender<AppEvent>,
}

impl FeedbackWorker {
    pub fn new(provider: Arc<dyn FeedbackProvider>, tx: Sender<AppEvent>) -> Self {
        Self { provider, tx }
    }

    /// Fire and forget. The reply arrives as [`AppEvent::Feedback`].
    pub fn dispatch(&self, request: FeedbackRequest) {
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("feedback-{}", request.seq))
            .spawn(move || {
                let text = provider
                    .respond(&request)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
                // receiver gone means the app is shutting down
                let _ = tx.send(AppEvent::Feedback(FeedbackReply {
                    seq: request.seq,
                    text,
                }));
            });

        if let Err(e) = spawned {
            tracing::warn!(%e, seq = request.seq, "failed to spawn feedback thread");
        }
    }
}
