mod gemini;
pub mod parse;
pub mod prompt;

pub use gemini::{GEMINI_BASE_URL, GeminiService};
pub use prompt::build_prompt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::LazyLock;

/// MIME type requested for every model response.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Finish reason reported by the model when output was withheld by safety filters.
pub const FINISH_REASON_SAFETY: &str = "SAFETY";

/// What the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Title, description, keywords and category for stock media sites.
    #[default]
    Metadata,
    /// A single descriptive caption.
    #[serde(rename = "prompt", alias = "caption")]
    Caption,
}

/// An image ready to be sent inline to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Image bytes encoded as standard base64.
    pub base64_data: String,
    /// e.g. `"image/jpeg"`.
    pub mime_type: String,
}

impl ImageData {
    pub fn new(base64_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        Self::new(encoded, mime_type)
    }
}

/// Stock metadata returned in [`Mode::Metadata`].
///
/// Missing fields in the model output deserialize to empty values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetadataResult {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub category: String,
}

/// Caption returned in [`Mode::Caption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptionResult {
    pub description: String,
}

/// The outcome of one generation, shaped by the [`Mode`] it was requested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Generated {
    Metadata(MetadataResult),
    Caption(CaptionResult),
}

impl Generated {
    pub fn description(&self) -> &str {
        match self {
            Self::Metadata(m) => &m.description,
            Self::Caption(c) => &c.description,
        }
    }
}

/// A single structured-output request to a content model.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    /// Model identifier, e.g. `"gemini-2.5-flash"`.
    pub model: &'a str,
    pub prompt: &'a str,
    pub image: &'a ImageData,
    /// Output schema the response must follow.
    pub schema: &'a Value,
    pub response_mime_type: &'a str,
}

/// What a content model answered with.
///
/// `text` is `None` when the model produced no text at all; `finish_reason`
/// then usually explains why (e.g. [`FINISH_REASON_SAFETY`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: Some("STOP".to_string()),
        }
    }

    pub fn is_safety_block(&self) -> bool {
        self.finish_reason.as_deref() == Some(FINISH_REASON_SAFETY)
    }
}

/// Trait for generative content models that accept an inline image.
///
/// The library ships with [`GeminiService`]. Implement this trait to plug in
/// another backend or a scripted model in tests.
///
/// # Example
///
/// ```rust,no_run
/// use stock_meta_ai::ai::{ContentModel, GeminiService, GenerateRequest, ImageData, Mode};
/// use stock_meta_ai::ai::{RESPONSE_MIME_TYPE, response_schema};
///
/// # async fn example() -> anyhow::Result<()> {
/// let service = GeminiService::new("AIza...".into());
/// let image = ImageData::new("base64data", "image/jpeg");
/// let response = service
///     .generate(&GenerateRequest {
///         model: "gemini-2.5-flash",
///         prompt: "Describe this image.",
///         image: &image,
///         schema: response_schema(Mode::Caption),
///         response_mime_type: RESPONSE_MIME_TYPE,
///     })
///     .await?;
/// println!("Text: {:?}", response.text);
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait ContentModel: Send + Sync {
    /// The display name of this model backend (e.g. "Gemini").
    fn name(&self) -> &str;
    /// Send one request and return the raw response text and finish reason.
    ///
    /// Transport and HTTP status failures are returned as errors.
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelResponse>;
}

static METADATA_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
            "category": { "type": "STRING" }
        },
        "required": ["title", "description", "keywords", "category"]
    })
});

static CAPTION_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": { "type": "STRING" }
        },
        "required": ["description"]
    })
});

/// The structured-output schema requested for `mode`.
pub fn response_schema(mode: Mode) -> &'static Value {
    match mode {
        Mode::Metadata => LazyLock::force(&METADATA_SCHEMA),
        Mode::Caption => LazyLock::force(&CAPTION_SCHEMA),
    }
}
