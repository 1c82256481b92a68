use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use sous_core::gemini::{GenerateContentResponse, build_request, error_message, extract_text};
use sous_core::generation::{GenerationError, GenerationService, ResponseSchema};

pub struct GeminiService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiService {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "sous-cli/{} (recipe assistant)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerationService for GeminiService {
    async fn generate(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }
        let body = build_request(prompt, schema);
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.without_url().to_string()))?;

        let status = resp.status();
        debug!(status = status.as_u16(), schema = schema.name, "gemini responded");
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let data: GenerateContentResponse = resp.json().await.map_err(|e| {
            GenerationError::RequestFailed(format!("unreadable response body: {e}"))
        })?;
        extract_text(data)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
