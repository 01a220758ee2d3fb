use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CreatePipeRequest, CreatePipeResponse, Message, PipeRequest, PipeResponse};
use crate::config::{AssistantConfig, LangbaseConfig, RequestConfig};
use crate::error::{AppResult, LangbaseError, LangbaseResult};
use crate::model::{ChatTurn, CompletionModel};
use crate::prompts::{EMPTY_COMPLETION_TEXT, PIPE_DESCRIPTION};

/// Client for interacting with Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    pipe_name: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    /// Create a new Langbase client bound to one pipe
    pub fn new(
        config: &LangbaseConfig,
        pipe_name: impl Into<String>,
        request_config: RequestConfig,
    ) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pipe_name: pipe_name.into(),
            request_config,
        })
    }

    /// Call a Langbase pipe with the given request
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        self.api_key()?;
        let url = format!("{}/v1/pipes/run", self.base_url);
        let pipe_name = request.name.clone();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    pipe = %pipe_name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Langbase request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        pipe = %pipe_name,
                        latency_ms = start.elapsed().as_millis(),
                        "Langbase pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        pipe = %pipe_name,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Langbase pipe call failed"
                    );
                    // Client errors will not get better on retry
                    if matches!(e, LangbaseError::Api { status, .. } if (400..500).contains(&status) && status != 429)
                    {
                        return Err(e);
                    }
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        match last_error {
            // A single attempt reports its own error unchanged
            Some(e) if self.request_config.max_retries == 0 => Err(e),
            other => Err(LangbaseError::Unavailable {
                message: other
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
                retries: retries.saturating_sub(1),
            }),
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &PipeRequest,
    ) -> LangbaseResult<PipeResponse> {
        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            "Calling Langbase pipe"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key()?))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: PipeResponse =
            response
                .json()
                .await
                .map_err(|e| LangbaseError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if !pipe_response.success {
            return Err(LangbaseError::InvalidResponse {
                message: "Pipe reported success=false".to_string(),
            });
        }

        Ok(pipe_response)
    }

    fn api_key(&self) -> LangbaseResult<&str> {
        self.api_key.as_deref().ok_or(LangbaseError::MissingApiKey)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name of the pipe questions are sent to
    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }

    /// Create a new pipe
    pub async fn create_pipe(
        &self,
        request: CreatePipeRequest,
    ) -> LangbaseResult<CreatePipeResponse> {
        let url = format!("{}/v1/pipes", self.base_url);

        let api_key = self.api_key()?;
        info!(pipe = %request.name, "Creating Langbase pipe");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(LangbaseError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: CreatePipeResponse =
            response
                .json()
                .await
                .map_err(|e| LangbaseError::InvalidResponse {
                    message: format!("Failed to parse create pipe response: {}", e),
                })?;

        info!(
            pipe = %pipe_response.name,
            url = %pipe_response.url,
            "Pipe created successfully"
        );

        Ok(pipe_response)
    }

    /// Ensure the answering pipe exists, creating it if needed.
    ///
    /// The pipe's own system message is a placeholder; each run sends the
    /// assembled prompt with the current documents.
    pub async fn ensure_pipe(&self, assistant: &AssistantConfig) -> LangbaseResult<()> {
        let request = CreatePipeRequest::new(&self.pipe_name)
            .with_description(PIPE_DESCRIPTION)
            .with_model(&assistant.model)
            .with_upsert(true)
            .with_store(false)
            .with_temperature(assistant.temperature)
            .with_messages(vec![Message::system(PIPE_DESCRIPTION)]);

        match self.create_pipe(request).await {
            Ok(_) => {
                info!(pipe = %self.pipe_name, "Legal Q&A pipe ready");
                Ok(())
            }
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %self.pipe_name, "Pipe already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CompletionModel for LangbaseClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> AppResult<String> {
        let request = PipeRequest::for_question(&self.pipe_name, system_prompt, history, question);
        let response = self.call_pipe(request).await?;

        if response.completion.trim().is_empty() {
            warn!(pipe = %self.pipe_name, "Langbase returned an empty completion");
            return Ok(EMPTY_COMPLETION_TEXT.to_string());
        }

        Ok(response.completion)
    }
}
