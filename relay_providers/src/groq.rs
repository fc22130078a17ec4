use async_trait::async_trait;
use relay_core::{CompletionClient, CompletionRequest, LLMResponse, UpstreamError, Usage};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// OpenAI-compatible chat-completion client bound to a single API key.
#[derive(Clone)]
pub struct GroqProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GroqProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating GroqProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Pull `error.message` out of an API error body, falling back to the raw text.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string())
    }

    fn parse_response(response: &serde_json::Value) -> Result<LLMResponse, UpstreamError> {
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                UpstreamError::Other("Invalid response format: missing content".to_string())
            })?
            .to_string();

        let usage = response["usage"].as_object().map(|u| Usage {
            prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
            completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
                .unwrap_or(0),
            total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        });

        Ok(LLMResponse { content, usage })
    }
}

#[async_trait]
impl CompletionClient for GroqProvider {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<LLMResponse, UpstreamError> {
        debug!(
            "Sending request to Groq API: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::Other(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{status}: {}", Self::error_message(&body));
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                UpstreamError::Quota(message)
            } else {
                UpstreamError::Other(message)
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| UpstreamError::Other(format!("invalid response body: {e}")))?;

        Self::parse_response(&body)
    }
}
