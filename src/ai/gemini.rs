use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ContentModel, FINISH_REASON_SAFETY, GenerateRequest, ModelResponse};

/// Public Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiService {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiService {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, or the reason none was produced.
    fn into_model_response(self) -> ModelResponse {
        let candidate = self.candidates.and_then(|c| c.into_iter().next());

        let (text, finish_reason) = match candidate {
            Some(candidate) => {
                let text: String = candidate
                    .content
                    .and_then(|c| c.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect();
                (text, candidate.finish_reason)
            }
            None => (String::new(), None),
        };

        // A blocked prompt yields no candidates at all, only prompt feedback.
        let blocked = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .is_some();
        let finish_reason = if blocked && finish_reason.is_none() {
            Some(FINISH_REASON_SAFETY.to_string())
        } else {
            finish_reason
        };

        ModelResponse {
            text: (!text.is_empty()).then_some(text),
            finish_reason,
        }
    }
}

#[async_trait::async_trait]
impl ContentModel for GeminiService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        let body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": request.prompt },
                        {
                            "inlineData": {
                                "mimeType": request.image.mime_type,
                                "data": request.image.base64_data
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "responseMimeType": request.response_mime_type,
                "responseSchema": request.schema
            }
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Gemini response")?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&text).context("Failed to parse Gemini response JSON")?;
        let response = parsed.into_model_response();
        if response.text.is_none() {
            log::debug!("Gemini returned no text: {text}");
        }
        Ok(response)
    }
}
