use async_trait::async_trait;
use chatmind_core::{ChatMessage, GatewayError, LLMProvider, LLMResponse};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Map an HTTP error status to the gateway's error classes.
#[must_use]
pub fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let message = format!("{status}: {}", body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::RateLimited(message)
    } else if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::CONFLICT
    {
        GatewayError::Transient(message)
    } else {
        GatewayError::Fatal(message)
    }
}

fn classify_transport(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        GatewayError::Transient(err.to_string())
    } else {
        GatewayError::Fatal(err.to_string())
    }
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAIProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn try_send(&self, request: &serde_json::Value) -> Result<LLMResponse, GatewayError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| GatewayError::Transient(format!("unreadable response body: {e}")))?;

        parse_completion(&body)
    }
}

fn parse_completion(body: &serde_json::Value) -> Result<LLMResponse, GatewayError> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| GatewayError::Fatal("invalid response format: missing content".into()))?
        .to_string();

    let usage = body["usage"].as_object().map(|u| chatmind_core::Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
            .unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<LLMResponse, GatewayError> {
        let request = json!({
            "model": model,
            "messages": messages,
        });

        debug!("Sending request to chat completions API: model={model}");
        let response = self.try_send(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        Ok(response)
    }

    fn get_default_model(&self) -> &'static str {
        "gpt-4.1-mini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            GatewayError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            GatewayError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, ""),
            GatewayError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            GatewayError::Fatal(_)
        ));
    }

    #[test]
    fn parses_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": " hi there "}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });
        let response = parse_completion(&body).unwrap();
        assert_eq!(response.content, " hi there ");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn missing_content_is_fatal() {
        let body = json!({"choices": []});
        assert!(matches!(parse_completion(&body), Err(GatewayError::Fatal(_))));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let provider = OpenAIProvider::new("key".into()).with_base_url("http://localhost:8080/v1/".into());
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}
