//! Gemini vision fallback (uses the `generateContent` REST API).

use super::{RemoteDecoder, RemoteError};
use crate::frame::PixelFrame;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-pro-vision";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SCANNER_PROMPT: &str = "You are a highly specialized and accurate barcode and QR code scanner. \
Your sole purpose is to read the alphanumeric ID contained within the code in the image. \
You must return only the raw ID, with absolutely no other text, explanations, punctuation, or formatting. \
If the image contains a code, provide its ID. If no code is found, respond with nothing.";

/// Connection settings for the Gemini API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Usable key, if any. Blank keys count as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct GeminiDecoder {
    client: Client,
    config: GeminiConfig,
}

impl GeminiDecoder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(Self { client, config })
    }
}

// ── Gemini API request/response types ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentRequest {
    /// Fixed scanner prompt followed by the image.
    fn scan(jpeg_base64: String) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: SCANNER_PROMPT.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: jpeg_base64,
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// `candidates[0].content.parts[0].text`, or `None` if any step is missing.
fn first_candidate_text(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .as_deref()
}

/// Strip the formatting models tend to wrap around a bare ID.
///
/// Prose answers pass through untouched.
fn clean_identifier(text: &str) -> Option<String> {
    let cleaned = text
        .trim()
        .replace('`', "")
        .replace("json", "")
        .replace('\n', "");
    (!cleaned.is_empty()).then_some(cleaned)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ── Decoder implementation ──────────────────────────────────────────────────

#[async_trait::async_trait]
impl RemoteDecoder for GeminiDecoder {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn decode(&self, frame: &PixelFrame) -> Result<Vec<String>, RemoteError> {
        let api_key = self.config.api_key().ok_or(RemoteError::MissingCredential)?;

        let jpeg = frame.to_jpeg()?;
        let body = GenerateContentRequest::scan(BASE64.encode(&jpeg));

        info!(
            "GeminiDecoder: calling {} with {}x{} frame ({} byte JPEG)",
            self.config.model,
            frame.width(),
            frame.height(),
            jpeg.len()
        );

        let resp = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status,
                body: truncate(&text, 500),
            });
        }

        let raw_text = resp.text().await?;
        debug!(
            "GeminiDecoder: raw response ({} bytes): {}",
            raw_text.len(),
            truncate(&raw_text, 500)
        );
        let parsed: GenerateContentResponse = serde_json::from_str(&raw_text)?;

        Ok(first_candidate_text(&parsed)
            .and_then(clean_identifier)
            .into_iter()
            .collect())
    }
}
