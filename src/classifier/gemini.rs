use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use super::{ApiKey, Classifier, ExtractError, RelayError};
use crate::contract::{self, ExtractedTransaction};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

impl GenerateContentRequest {
    pub fn new(text: &str, system_prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_prompt,
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        }
    }

    pub fn user_text(&self) -> &str {
        self.contents
            .first()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
            .unwrap_or_default()
    }
}

/// Status and raw body of a `generateContent` call, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_success(self) -> Result<String, RelayError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(RelayError::Upstream {
                status: self.status,
                message: super::error::error_message(&self.body),
            })
        }
    }
}

/// The external classifier service.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Errors only on transport failures. Non-success statuses are returned as responses.
    async fn generate_content(
        &self,
        api_key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<UpstreamResponse>;
}

pub struct GeminiClient {
    http_client: reqwest::Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl Upstream for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<UpstreamResponse> {
        log::info!("Requesting classification from {}...", self.model);
        let response = self
            .http_client
            .post(format!("{}?key={}", self.endpoint(), api_key.expose()))
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::info!("Requesting classification from {}...done ({status})", self.model);
        Ok(UpstreamResponse { status, body })
    }
}

/// Attaches the extraction instructions to a text and makes exactly one upstream call.
/// Shared by the HTTP relay and the direct classifier.
pub struct GeminiRelay {
    api_key: Option<ApiKey>,
    upstream: Box<dyn Upstream>,
}

impl GeminiRelay {
    pub fn new(api_key: Option<ApiKey>, upstream: impl Upstream + 'static) -> Self {
        Self {
            api_key,
            upstream: Box::new(upstream),
        }
    }

    pub fn api_key(&self) -> Result<&ApiKey, RelayError> {
        self.api_key.as_ref().ok_or_else(|| {
            RelayError::Configuration("GEMINI_API_KEY is not set".to_string())
        })
    }

    /// Returns the upstream response for any status as long as its body is JSON. A failure
    /// status with a non-JSON body keeps its status as an `Upstream` error.
    pub async fn forward(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<UpstreamResponse, RelayError> {
        let api_key = self.api_key()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayError::Validation(
                "The `text` field is required".to_string(),
            ));
        }

        let request = GenerateContentRequest::new(text, contract::system_prompt(today));
        let response = self
            .upstream
            .generate_content(api_key, &request)
            .await
            .map_err(|err| RelayError::Upstream {
                status: 502,
                message: format!("Could not reach the classifier: {err:#}"),
            })?;
        if let Err(err) = serde_json::from_str::<serde_json::Value>(&response.body) {
            if !response.is_success() {
                return Err(RelayError::Upstream {
                    status: response.status,
                    message: super::error::error_message(&response.body),
                });
            }
            return Err(RelayError::UpstreamFormat(format!(
                "status {}, body is not JSON: {err}",
                response.status
            )));
        }
        Ok(response)
    }
}

/// Calls Gemini from this process, without going through a relay server.
pub struct GeminiClassifier {
    relay: GeminiRelay,
}

impl GeminiClassifier {
    pub fn new(relay: GeminiRelay) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<Vec<ExtractedTransaction>, ExtractError> {
        let body = self.relay.forward(text, today).await?.into_success()?;
        contract::decode_response(&body, today)
    }
}
