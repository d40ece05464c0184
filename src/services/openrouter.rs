use std::time::Duration;
use reqwest::Client as HttpClient;
use serde_json::json;
use tracing::{error, info};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Thin OpenRouter chat-completions client. Failures are logged and
/// collapsed to `None`; callers degrade to a "no result" payload instead of
/// propagating.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
}

impl OpenRouterClient {

    pub fn new(api_key: String, model: String) -> Self {
        OpenRouterClient {
            http_client: HttpClient::new(),
            api_key,
            model,
        }
    }

    pub async fn generate_completion(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Option<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": max_tokens,
        });

        let response = match self
            .http_client
            .post(OPENROUTER_API_URL)
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("OpenRouter request failed: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            error!("OpenRouter HTTP error: {}", response.status());
            return None;
        }

        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(err) => {
                error!("OpenRouter returned invalid JSON: {err}");
                return None;
            }
        };

        match payload["choices"][0]["message"]["content"].as_str() {
            Some(content) => {
                info!("OpenRouter response received, {} chars", content.len());
                Some(content.to_string())
            }
            None => {
                error!("OpenRouter response had no content");
                None
            }
        }
    }
}
