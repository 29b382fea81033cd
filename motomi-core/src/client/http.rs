use super::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::config::ClientConfig;
use crate::error::{MotomiError, Result};
use crate::resilience::{retry_with_policy, ExponentialBackoffRetry};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-compatible chat-completions client (also speaks Azure AI inference)
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: ExponentialBackoffRetry,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: ExponentialBackoffRetry::default(),
        })
    }

    /// Build from config, reading the API key from the configured variable
    /// when the config doesn't carry one inline.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var(&config.api_key_env)
                .map_err(|_| MotomiError::MissingApiKey(config.api_key_env.clone()))?,
        };

        let client = Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(client.with_retry(ExponentialBackoffRetry::with_retries(config.max_retries)))
    }

    pub fn with_retry(mut self, retry: ExponentialBackoffRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MotomiError::Timeout(e.to_string())
                } else {
                    MotomiError::Network(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::OK => {
                let parsed: CompletionResponse = serde_json::from_str(&body)?;
                if parsed.choices.is_empty() {
                    return Err(MotomiError::EmptyCompletion);
                }
                Ok(parsed)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(MotomiError::RateLimitExceeded(body)),
            status => Err(MotomiError::Api {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[redacted]")
            .field("retry", &self.retry)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let response = retry_with_policy(&self.retry, || self.send(&request)).await?;
        debug!(usage = ?response.usage, "completion received");
        Ok(response)
    }
}
