// Generative media client: synchronous image generation and long-running
// video operations with caller-side polling

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::app_config::MediaGenConfig;
use crate::utils::ServiceError;

#[derive(Error, Debug)]
pub enum MediaGenError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream blocked the prompt: {0}")]
    Blocked(String),

    #[error("Operation did not complete within the poll timeout")]
    Timeout,

    #[error("Unexpected upstream response: {0}")]
    Malformed(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<MediaGenError> for ServiceError {
    fn from(e: MediaGenError) -> Self {
        match e {
            MediaGenError::Blocked(reason) => ServiceError::UpstreamBlocked(reason),
            MediaGenError::Timeout => ServiceError::UpstreamTimeout,
            MediaGenError::Http(e) => ServiceError::UpstreamFailure(e.to_string()),
            MediaGenError::Malformed(m) | MediaGenError::Upstream(m) => {
                ServiceError::UpstreamFailure(m)
            },
        }
    }
}

/// Decoded media returned to the caller
#[derive(Debug, Clone)]
pub struct GeneratedMedia {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// Request/response shapes for the generateContent image endpoint

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// Long-running video operation shapes

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InputImage>,
}

/// Source frame for image-to-video generation, base64 bytes plus mime type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputImage {
    pub image_bytes: String,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: VideoRef,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

/// HTTP client for the generative media API
#[derive(Debug, Clone)]
pub struct MediaGenClient {
    http: reqwest::Client,
    config: MediaGenConfig,
}

impl MediaGenClient {
    pub fn new(config: MediaGenConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(MediaGenClient { http, config })
    }

    /// Generate one image. The endpoint is synchronous; a single request
    /// either returns inline base64 image data or a refusal.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedMedia, MediaGenError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.image_model
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MediaGenError::Upstream(format!("{}: {}", status, text)));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_image(parsed)
    }

    /// Generate one video, optionally animating a source image. Submits a
    /// long-running operation, then polls it at a fixed interval until
    /// done, erroring out at the poll timeout.
    pub async fn generate_video(
        &self,
        prompt: &str,
        image: Option<InputImage>,
    ) -> Result<GeneratedMedia, MediaGenError> {
        let op = self.submit_video(prompt, image).await?;
        let uri = self.poll_video(&op.name).await?;
        self.fetch_video(&uri).await
    }

    async fn submit_video(
        &self,
        prompt: &str,
        image: Option<InputImage>,
    ) -> Result<Operation, MediaGenError> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.config.base_url, self.config.video_model
        );

        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
                image,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MediaGenError::Upstream(format!("{}: {}", status, text)));
        }

        Ok(response.json::<Operation>().await?)
    }

    /// Poll until the operation completes. Elapsed time is checked before
    /// each sleep so the timeout is honored even with a long interval.
    async fn poll_video(&self, operation_name: &str) -> Result<String, MediaGenError> {
        let url = format!("{}/{}", self.config.base_url, operation_name);
        let deadline = Instant::now() + Duration::from_secs(self.config.poll_timeout_secs);
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            let response = self
                .http
                .get(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(MediaGenError::Upstream(format!("{}: {}", status, text)));
            }

            let op: Operation = response.json().await?;
            if op.done {
                return extract_video_uri(op);
            }

            if Instant::now() + interval > deadline {
                tracing::warn!(operation = operation_name, "Video poll timed out");
                return Err(MediaGenError::Timeout);
            }
            sleep(interval).await;
        }
    }

    async fn fetch_video(&self, uri: &str) -> Result<GeneratedMedia, MediaGenError> {
        let response = self
            .http
            .get(uri)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaGenError::Upstream(format!(
                "video download failed: {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(GeneratedMedia {
            mime_type: "video/mp4".to_string(),
            bytes,
        })
    }
}

/// Pull the inline image out of a generateContent response, distinguishing
/// a safety refusal from a malformed payload.
fn extract_image(parsed: GenerateContentResponse) -> Result<GeneratedMedia, MediaGenError> {
    if let Some(feedback) = &parsed.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(MediaGenError::Blocked(reason.clone()));
        }
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| MediaGenError::Malformed("no candidates".to_string()))?;

    // SAFETY / PROHIBITED_CONTENT finishes carry no content parts
    if candidate.content.is_none() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(MediaGenError::Blocked(reason));
    }

    let inline = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or_else(|| MediaGenError::Malformed("no inline image data".to_string()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| MediaGenError::Malformed(format!("invalid base64: {}", e)))?;

    Ok(GeneratedMedia {
        mime_type: inline.mime_type,
        bytes,
    })
}

fn extract_video_uri(op: Operation) -> Result<String, MediaGenError> {
    if let Some(err) = op.error {
        return Err(MediaGenError::Upstream(err.message));
    }

    let video_response = op
        .response
        .and_then(|r| r.generate_video_response)
        .ok_or_else(|| MediaGenError::Malformed("operation done without response".to_string()))?;

    if let Some(sample) = video_response.generated_samples.into_iter().next() {
        return Ok(sample.video.uri);
    }

    // No samples: filtered output if the API says so, malformed otherwise
    if let Some(reason) = video_response.rai_media_filtered_reasons.into_iter().next() {
        return Err(MediaGenError::Blocked(reason));
    }
    Err(MediaGenError::Malformed(
        "operation done without samples".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_image_success() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your image"},
                        {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let media = extract_image(parsed).unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.bytes, b"hello");
    }

    #[test]
    fn test_extract_image_blocked_by_prompt_feedback() {
        let raw = serde_json::json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        match extract_image(parsed) {
            Err(MediaGenError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_image_blocked_by_finish_reason() {
        let raw = serde_json::json!({
            "candidates": [{"finishReason": "PROHIBITED_CONTENT"}]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        match extract_image(parsed) {
            Err(MediaGenError::Blocked(reason)) => assert_eq!(reason, "PROHIBITED_CONTENT"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_image_malformed() {
        let raw = serde_json::json!({"candidates": []});
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            extract_image(parsed),
            Err(MediaGenError::Malformed(_))
        ));
    }

    #[test]
    fn test_extract_video_uri_success() {
        let raw = serde_json::json!({
            "name": "operations/abc123",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://example.com/v.mp4"}}
                    ]
                }
            }
        });
        let op: Operation = serde_json::from_value(raw).unwrap();
        assert_eq!(extract_video_uri(op).unwrap(), "https://example.com/v.mp4");
    }

    #[test]
    fn test_extract_video_filtered() {
        let raw = serde_json::json!({
            "name": "operations/abc123",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [],
                    "raiMediaFilteredReasons": ["violence"]
                }
            }
        });
        let op: Operation = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            extract_video_uri(op),
            Err(MediaGenError::Blocked(_))
        ));
    }

    #[test]
    fn test_extract_video_operation_error() {
        let raw = serde_json::json!({
            "name": "operations/abc123",
            "done": true,
            "error": {"message": "internal"}
        });
        let op: Operation = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            extract_video_uri(op),
            Err(MediaGenError::Upstream(_))
        ));
    }

    #[test]
    fn test_predict_instance_with_image() {
        let instance = PredictInstance {
            prompt: "make it move".to_string(),
            image: Some(InputImage {
                image_bytes: "aGVsbG8=".to_string(),
                mime_type: "image/png".to_string(),
            }),
        };
        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["image"]["imageBytes"], "aGVsbG8=");
        assert_eq!(value["image"]["mimeType"], "image/png");
    }

    #[test]
    fn test_predict_instance_text_only_omits_image() {
        let instance = PredictInstance {
            prompt: "a storm".to_string(),
            image: None,
        };
        let value = serde_json::to_value(&instance).unwrap();
        assert!(value.get("image").is_none());
    }

    #[test]
    fn test_error_maps_to_service_error() {
        let e: ServiceError = MediaGenError::Timeout.into();
        assert!(matches!(e, ServiceError::UpstreamTimeout));
        let e: ServiceError = MediaGenError::Blocked("SAFETY".into()).into();
        assert!(matches!(e, ServiceError::UpstreamBlocked(_)));
    }
}
