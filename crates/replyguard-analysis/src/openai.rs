//! OpenAI-compatible chat completions client implementing [`Classifier`] and
//! [`ResponseDrafter`].

use std::time::Duration;

use async_trait::async_trait;
use replyguard_core::{
    AnalysisResult, AppConfig, AspectResult, Classifier, ExternalError, Item, ResponseDrafter,
    Sentiment,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::prompts;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_INPUT_CHARS: usize = 8_000;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// `None` when no API key is configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(Self {
            api_key,
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentimentPayload {
    sentiment: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    explanation: String,
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    completions_url: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the HTTP client cannot be built, or
    /// [`AnalysisError::InvalidBaseUrl`] if the base URL is not http(s).
    pub fn new(config: OpenAiConfig) -> Result<Self, AnalysisError> {
        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim()
        };
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(AnalysisError::InvalidBaseUrl(base.to_string()));
        }
        let completions_url = format!("{}/chat/completions", base.trim_end_matches('/'));

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            config,
            completions_url,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        json_mode: bool,
    ) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }

    async fn classify(
        &self,
        system: &str,
        user: &str,
        context: &str,
    ) -> Result<SentimentPayload, AnalysisError> {
        let content = self.complete(system, user, 0.0, true).await?;
        parse_sentiment_payload(&content, context)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_INPUT_CHARS).collect()
}

fn parse_sentiment_payload(
    content: &str,
    context: &str,
) -> Result<SentimentPayload, AnalysisError> {
    let payload: SentimentPayload = serde_json::from_str(strip_code_fence(content)).map_err(
        |e| AnalysisError::InvalidOutput {
            context: context.to_string(),
            reason: e.to_string(),
        },
    )?;
    if payload.sentiment.parse::<Sentiment>().is_err() {
        return Err(AnalysisError::InvalidOutput {
            context: context.to_string(),
            reason: format!("unknown sentiment label {:?}", payload.sentiment),
        });
    }
    Ok(payload)
}

/// Models occasionally wrap JSON in a markdown fence despite `json_object` mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn sentiment_of(payload: &SentimentPayload) -> Sentiment {
    payload.sentiment.parse().unwrap_or(Sentiment::Neutral)
}

#[async_trait]
impl Classifier for OpenAiClient {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, ExternalError> {
        if text.trim().is_empty() {
            return Ok(AnalysisResult::empty_text());
        }

        let payload = self
            .classify(prompts::SENTIMENT_SYSTEM, &truncate(text), "sentiment")
            .await?;
        let result = AnalysisResult::new(
            sentiment_of(&payload),
            payload.confidence,
            payload.explanation,
        );

        tracing::debug!(
            model = %self.config.model,
            sentiment = %result.sentiment,
            confidence = result.confidence,
            "classified text"
        );
        Ok(result)
    }

    async fn analyze_aspect(
        &self,
        text: &str,
        aspect: &str,
    ) -> Result<AspectResult, ExternalError> {
        if text.trim().is_empty() {
            return Ok(AspectResult::new(
                aspect,
                Sentiment::Neutral,
                0.0,
                "Empty or invalid text",
            ));
        }

        let payload = self
            .classify(
                prompts::ASPECT_SYSTEM,
                &prompts::aspect_user(&truncate(text), aspect),
                aspect,
            )
            .await?;
        Ok(AspectResult::new(
            aspect,
            sentiment_of(&payload),
            payload.confidence,
            payload.explanation,
        ))
    }
}

#[async_trait]
impl ResponseDrafter for OpenAiClient {
    async fn draft(&self, item: &Item) -> Result<String, ExternalError> {
        let user = prompts::draft_user(&item.source, &item.author, &truncate(&item.body));
        let draft = self.complete(prompts::DRAFT_SYSTEM, &user, 0.7, false).await?;
        tracing::debug!(natural_id = %item.natural_id, chars = draft.len(), "drafted reply");
        Ok(draft)
    }
}
