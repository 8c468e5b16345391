//! Bedrock runtime `InvokeModel` over plain HTTPS.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::sigv4::{self, BedrockAuth, RequestParts};
use super::{GenerationParams, ModelFamily, ModelInvoker};
use crate::config::ModelSettings;
use crate::error::{Result, SvarError};

const SERVICE: &str = "bedrock";

#[derive(Serialize)]
struct LlamaRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_gen_len: u32,
}

#[derive(Serialize)]
struct MistralRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

/// Invokes a text-completion model hosted on AWS Bedrock.
pub struct BedrockInvoker {
    client: reqwest::Client,
    auth: BedrockAuth,
    family: ModelFamily,
    model_id: String,
    region: String,
    endpoint: String,
    timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl BedrockInvoker {
    pub fn new(settings: &ModelSettings, auth: BedrockAuth) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let endpoint = settings
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", settings.region));

        Ok(Self {
            client,
            auth,
            family: settings.family,
            model_id: settings.model_id.clone(),
            region: settings.region.clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
            max_attempts: settings.max_attempts.max(1),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        })
    }

    /// Build an invoker with credentials from the environment.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        Self::new(settings, BedrockAuth::from_env()?)
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint, sigv4::uri_encode(&self.model_id))
    }

    fn request_body(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<u8>> {
        let body = match self.family {
            ModelFamily::Llama => serde_json::to_vec(&LlamaRequest {
                prompt,
                temperature: params.temperature,
                max_gen_len: params.max_tokens,
            })?,
            ModelFamily::Mistral => serde_json::to_vec(&MistralRequest {
                prompt,
                temperature: params.temperature,
                max_tokens: params.max_tokens,
            })?,
        };
        Ok(body)
    }

    fn build_request(&self, url: &str, body: Vec<u8>) -> Result<reqwest::RequestBuilder> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        let request = match &self.auth {
            BedrockAuth::ApiKey(token) => request.bearer_auth(token),
            BedrockAuth::SigV4(credentials) => {
                let parsed = url::Url::parse(url).map_err(|e| SvarError::Config(format!("Invalid endpoint {}: {}", url, e)))?;
                let host = match (parsed.host_str(), parsed.port()) {
                    (Some(host), Some(port)) => format!("{}:{}", host, port),
                    (Some(host), None) => host.to_string(),
                    (None, _) => return Err(SvarError::Config(format!("Endpoint has no host: {}", url))),
                };
                let signed = sigv4::sign(
                    credentials,
                    &self.region,
                    SERVICE,
                    RequestParts {
                        method: "POST",
                        host: &host,
                        path: parsed.path(),
                        payload: &body,
                    },
                    Utc::now(),
                )?;

                let request = request
                    .header("x-amz-date", signed.amz_date)
                    .header(AUTHORIZATION, signed.authorization);
                match signed.security_token {
                    Some(token) => request.header("x-amz-security-token", token),
                    None => request,
                }
            }
        };

        Ok(request.body(body))
    }

    /// One round trip. `Ok(Err(..))` is a retryable failure: no connection,
    /// a timeout, a non-success status, or a body that is not JSON at all.
    async fn attempt(&self, url: &str, body: &[u8]) -> Result<std::result::Result<Value, String>> {
        let request = self.build_request(url, body.to_vec())?;

        let failure = match request.send().await {
            Ok(response) if response.status().is_success() => match response.bytes().await {
                Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                    Ok(value) => return Ok(Ok(value)),
                    Err(e) => format!(
                        "response body is not JSON ({}): {}",
                        e,
                        truncate(&String::from_utf8_lossy(&bytes), 200)
                    ),
                },
                Err(e) => format!("failed to read response body: {}", e),
            },
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                format!("HTTP {}: {}", status, truncate(&text, 300))
            }
            Err(e) if e.is_timeout() => format!("request timed out after {}s", self.timeout.as_secs()),
            Err(e) => format!("request failed: {}", e),
        };

        Ok(Err(failure))
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    #[instrument(skip(self, prompt, params), fields(model = %self.model_id, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = self.invoke_url();
        let body = self.request_body(prompt, params)?;
        debug!("Request body is {} bytes", body.len());

        let mut last_failure = String::new();
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_backoff * (attempt - 1)).await;
            }

            info!("Invoking {} (attempt {}/{})", self.model_id, attempt, self.max_attempts);
            match self.attempt(&url, &body).await? {
                Ok(value) => {
                    let generation = parse_generation(self.family, &value)?;
                    debug!("Received {} characters", generation.len());
                    return Ok(generation.trim_end().to_string());
                }
                Err(failure) => {
                    warn!("Model call attempt {} failed: {}", attempt, failure);
                    last_failure = failure;
                }
            }
        }

        Err(SvarError::ModelTransport {
            attempts: self.max_attempts,
            message: last_failure,
        })
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}

/// Pull the generated text out of a response body. Any other shape is a
/// malformed response.
fn parse_generation(family: ModelFamily, value: &Value) -> Result<String> {
    for key in ["generation", "completion"] {
        match value.get(key) {
            Some(Value::String(text)) => return Ok(text.clone()),
            Some(Value::Null) => return Ok(String::new()),
            _ => {}
        }
    }

    if family == ModelFamily::Mistral {
        if let Some(text) = value
            .get("outputs")
            .and_then(|o| o.get(0))
            .and_then(|o| o.get("text"))
            .and_then(Value::as_str)
        {
            return Ok(text.to_string());
        }
    }

    Err(SvarError::ModelResponse(truncate(&value.to_string(), 300)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
