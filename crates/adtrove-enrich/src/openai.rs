//! OpenAI-compatible chat-completions client for image descriptions.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::describer::Describer;
use crate::error::EnrichError;
use crate::types::{Description, EnrichConfig};

const PROVIDER: &str = "openai";
const MAX_TOKENS: u32 = 300;

const DESCRIBE_PROMPT: &str = "Describe this advertisement image in two or three sentences. \
Mention the product, any visible text or offer, and the overall visual style.";

pub struct OpenAiDescriber {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiDescriber {
    /// # Errors
    ///
    /// Returns [`EnrichError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EnrichConfig) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn request_body(&self, image_ref: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": DESCRIBE_PROMPT },
                    { "type": "image_url", "image_url": { "url": image_ref } }
                ]
            }]
        })
    }
}

#[async_trait]
impl Describer for OpenAiDescriber {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn describe(&self, image_ref: &str) -> Result<Description, EnrichError> {
        tracing::debug!(model = %self.model, image_ref, "vision describe request");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(image_ref))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response.json().await?;
        let parsed: ChatResponse = serde_json::from_value(raw.clone())?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EnrichError::EmptyDescription {
                model: self.model.clone(),
            })?;

        Ok(Description {
            text,
            raw_response: Some(raw),
        })
    }
}
