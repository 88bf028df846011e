use std::time::Duration;

use axum::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::VisionConfig;

use super::{extract_nutrition, validate_image, IdentifyError, NutritionRecord};

/// Instruction fixed by the service; not user-configurable.
const SYSTEM_PROMPT: &str = "You are a food identification expert. Analyze food images and return ONLY a JSON object with: dish_name (string), confidence (0-1), estimated_calories (number), protein_g (number), carbs_g (number), fat_g (number). Be accurate and concise.";

const USER_PROMPT: &str =
    "Identify this dish and estimate its nutritional content. Return ONLY valid JSON.";

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Turns a meal photo into a validated [`NutritionRecord`]. One upstream
/// request per call, no internal retry; the caller decides what to do with
/// a retryable error. Implementations must not mutate any state.
#[async_trait]
pub trait DishIdentifier: Send + Sync {
    async fn identify(
        &self,
        image: Bytes,
        media_type: &str,
    ) -> Result<NutritionRecord, IdentifyError>;
}

/// [`DishIdentifier`] backed by an OpenAI-compatible vision endpoint.
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl VisionClient {
    pub fn new(cfg: &VisionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl DishIdentifier for VisionClient {
    async fn identify(
        &self,
        image: Bytes,
        media_type: &str,
    ) -> Result<NutritionRecord, IdentifyError> {
        validate_image(&image, media_type)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text: USER_PROMPT },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: data_url(media_type, &image),
                            },
                        },
                    ]),
                },
            ],
        };

        debug!(model = %self.model, image_bytes = image.len(), "identifying dish");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "vision request failed to send");
                IdentifyError::Upstream(format!("failed to reach AI service: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "vision response body unreadable");
            IdentifyError::Upstream(format!("failed to read AI response: {e}"))
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body.chars().take(200).collect::<String>(), "vision upstream error");
            return Err(classify_status(status.as_u16()));
        }

        let content = message_content(&body)?;
        debug!(content_len = content.len(), "vision response received");
        extract_nutrition(&content)
    }
}

/// Self-describing binary payload the chat API expects for images.
fn data_url(media_type: &str, image: &[u8]) -> String {
    format!("data:{media_type};base64,{}", BASE64.encode(image))
}

fn classify_status(status: u16) -> IdentifyError {
    match status {
        429 => IdentifyError::RateLimited,
        402 => IdentifyError::QuotaExhausted,
        _ => IdentifyError::Upstream(format!("AI service returned status {status}")),
    }
}

/// First choice's message content from a chat-completions envelope.
fn message_content(body: &str) -> Result<String, IdentifyError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| IdentifyError::Upstream(format!("unexpected AI response shape: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(IdentifyError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> VisionClient {
        VisionClient::new(&VisionConfig {
            base_url: "http://localhost:9".into(),
            api_key: "test-key".into(),
            model: "test-model".into(),
            request_timeout_secs: 1,
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn identify_rejects_empty_payload_before_any_request() {
        let err = test_client()
            .identify(Bytes::new(), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentifyError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn identify_rejects_non_image_media_type_before_any_request() {
        let err = test_client()
            .identify(Bytes::from_static(b"bytes"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentifyError::InvalidImage(_)));
    }

    #[test]
    fn classify_throttling_and_quota_statuses() {
        assert!(matches!(classify_status(429), IdentifyError::RateLimited));
        assert!(matches!(classify_status(402), IdentifyError::QuotaExhausted));
        assert!(matches!(classify_status(500), IdentifyError::Upstream(_)));
        assert!(matches!(classify_status(404), IdentifyError::Upstream(_)));
    }

    #[test]
    fn data_url_is_self_describing() {
        let url = data_url("image/png", b"abc");
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with(&BASE64.encode(b"abc")));
    }

    #[test]
    fn message_content_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"{\"dish_name\":\"Salad\"}"}}]}"#;
        assert_eq!(
            message_content(body).unwrap(),
            r#"{"dish_name":"Salad"}"#
        );
    }

    #[test]
    fn missing_choices_is_empty_response() {
        assert!(matches!(
            message_content(r#"{"choices":[]}"#),
            Err(IdentifyError::EmptyResponse)
        ));
        assert!(matches!(
            message_content(r#"{}"#),
            Err(IdentifyError::EmptyResponse)
        ));
    }

    #[test]
    fn null_or_blank_content_is_empty_response() {
        assert!(matches!(
            message_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(IdentifyError::EmptyResponse)
        ));
        assert!(matches!(
            message_content(r#"{"choices":[{"message":{"content":"   "}}]}"#),
            Err(IdentifyError::EmptyResponse)
        ));
    }

    #[test]
    fn garbage_envelope_is_upstream_error() {
        assert!(matches!(
            message_content("<html>bad gateway</html>"),
            Err(IdentifyError::Upstream(_))
        ));
    }
}
