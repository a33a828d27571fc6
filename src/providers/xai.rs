//! xAI provider: Grok Imagine image and video generation.

use crate::capabilities::{DurationRange, ProviderCapabilities};
use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::NormalizedRequest;
use crate::provider::{CallShape, Provider, ProviderId, RawMedia};
use crate::providers::{download_bytes, decode_base64, vendor_error};
use crate::request::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IMAGES_URL: &str = "https://api.x.ai/v1/images/generations";
const EDITS_URL: &str = "https://api.x.ai/v1/images/edits";
const VIDEOS_URL: &str = "https://api.x.ai/v1/videos/generations";
const VIDEO_STATUS_BASE: &str = "https://api.x.ai/v1/videos";

const DEFAULT_IMAGE_MODEL: &str = "grok-2-image";
const DEFAULT_VIDEO_MODEL: &str = "grok-imagine-video";

const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(2);
const VIDEO_POLL_ATTEMPTS: u32 = 150;

static CAPS: ProviderCapabilities = ProviderCapabilities {
    max_input_images: 1,
    // No declared ratio set and no free-form support: requests fall back to
    // the literal W:H shape check.
    aspect_ratios: None,
    custom_aspect_ratios: false,
    video_interpolation: false,
    video_durations: Some(DurationRange::new(1, 15)),
    image_editing: true,
};

/// xAI (Grok Imagine) media provider.
///
/// The image API is a synchronous batch endpoint; the video API submits a
/// job whose status endpoint answers 202 while rendering.
pub struct XaiProvider {
    client: reqwest::Client,
}

impl XaiProvider {
    /// Creates the provider with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn generate_images(
        &self,
        request: &NormalizedRequest,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let model = request.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL);
        let editing = !request.input_images.is_empty();
        let url = if editing { EDITS_URL } else { IMAGES_URL };

        let body = GrokImageRequest {
            model,
            prompt: &request.prompt,
            n: request.count,
            response_format: "b64_json",
            image_url: request.input_images.first().map(String::as_str),
            aspect_ratio: if editing {
                // The edit endpoint rejects aspect_ratio.
                None
            } else {
                request.aspect_ratio.as_deref()
            },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let parsed: GrokImageResponse = response.json().await?;
        let total = parsed.data.len();
        let mut items = Vec::with_capacity(total);
        for (index, item) in parsed.data.into_iter().enumerate() {
            let (bytes, source_url, mime) = if let Some(b64) = item.b64_json {
                (decode_base64(&b64)?, None, None)
            } else if let Some(url) = item.url {
                let (bytes, mime) = download_bytes(&self.client, &url).await?;
                (bytes, Some(url), mime)
            } else {
                tracing::warn!(index, "batch item carried neither bytes nor URL, skipping");
                continue;
            };
            items.push(RawMedia {
                kind: MediaKind::Image,
                provider: ProviderId::Xai,
                model: model.to_string(),
                index: items.len(),
                source_url,
                bytes,
                mime_type: mime,
            });
        }

        if items.is_empty() {
            return Err(MediaGenError::EmptyResult(format!(
                "no decodable items among {total} returned"
            )));
        }
        Ok(items)
    }

    async fn generate_videos(
        &self,
        request: &NormalizedRequest,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let model = request.model.as_deref().unwrap_or(DEFAULT_VIDEO_MODEL);
        let body = GrokVideoRequest {
            model,
            prompt: &request.prompt,
            duration_secs: request.duration_secs,
            aspect_ratio: request.aspect_ratio.as_deref(),
            image_url: request.start_frame.as_deref(),
        };

        let response = self
            .client
            .post(VIDEOS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let submitted: GrokVideoSubmitResponse = response.json().await?;
        let request_id = submitted.request_id;
        tracing::debug!(request_id = %request_id, model, "submitted Grok video generation");

        let video_url = self.poll_until_ready(&request_id, api_key).await?;
        let (bytes, mime) = download_bytes(&self.client, &video_url).await?;

        Ok(vec![RawMedia {
            kind: MediaKind::Video,
            provider: ProviderId::Xai,
            model: model.to_string(),
            index: 0,
            source_url: Some(video_url),
            bytes,
            mime_type: mime.or_else(|| Some("video/mp4".to_string())),
        }])
    }

    /// Polls the status endpoint; 202 means the job is still rendering.
    async fn poll_until_ready(&self, request_id: &str, api_key: &str) -> Result<String> {
        let url = format!("{VIDEO_STATUS_BASE}/{request_id}");

        for attempt in 0..VIDEO_POLL_ATTEMPTS {
            let response = self.client.get(&url).bearer_auth(api_key).send().await?;
            let status = response.status();

            if status.as_u16() == 202 {
                tracing::debug!(request_id, attempt, "Grok video still rendering");
                tokio::time::sleep(VIDEO_POLL_INTERVAL).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(vendor_error(status.as_u16(), &text));
            }

            let result: GrokVideoResultResponse = response.json().await?;
            return result.video.and_then(|v| v.url).ok_or_else(|| {
                MediaGenError::EmptyResult(format!(
                    "Grok video job {request_id} completed without a video URL"
                ))
            });
        }

        Err(MediaGenError::Timeout {
            provider: ProviderId::Xai.to_string(),
            job_id: request_id.to_string(),
            attempts: VIDEO_POLL_ATTEMPTS,
        })
    }
}

impl Default for XaiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for XaiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Xai
    }

    fn kinds(&self) -> &'static [MediaKind] {
        &[MediaKind::Image, MediaKind::Video]
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &CAPS
    }

    fn shape(&self, kind: MediaKind) -> Option<CallShape> {
        match kind {
            MediaKind::Image => Some(CallShape::SyncBatch),
            MediaKind::Video => Some(CallShape::PollingJob),
        }
    }

    async fn generate(
        &self,
        request: &NormalizedRequest,
        credentials: &Credentials,
    ) -> Result<Vec<RawMedia>> {
        let api_key = credentials.key_for(self.id()).ok_or_else(|| {
            MediaGenError::ProviderUnavailable {
                provider: self.id().to_string(),
                env_vars: crate::credentials::env_vars_for(self.id()).join(", "),
            }
        })?;
        match request.kind {
            MediaKind::Image => self.generate_images(request, api_key).await,
            MediaKind::Video => self.generate_videos(request, api_key).await,
        }
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct GrokImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GrokImageResponse {
    #[serde(default)]
    data: Vec<GrokImageItem>,
}

#[derive(Debug, Deserialize)]
struct GrokImageItem {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct GrokVideoRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GrokVideoSubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct GrokVideoResultResponse {
    #[serde(default)]
    video: Option<GrokVideo>,
}

#[derive(Debug, Deserialize)]
struct GrokVideo {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_request_serialization() {
        let body = GrokImageRequest {
            model: "grok-2-image",
            prompt: "a fox",
            n: 4,
            response_format: "b64_json",
            image_url: None,
            aspect_ratio: Some("16:9"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["n"], 4);
        assert_eq!(json["aspect_ratio"], "16:9");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_video_submit_response() {
        let resp: GrokVideoSubmitResponse =
            serde_json::from_str(r#"{"request_id": "req-42"}"#).unwrap();
        assert_eq!(resp.request_id, "req-42");
    }

    #[test]
    fn test_video_result_without_url() {
        let resp: GrokVideoResultResponse = serde_json::from_str(r#"{"video": {}}"#).unwrap();
        assert!(resp.video.unwrap().url.is_none());
    }

    #[test]
    fn test_caps_reject_interpolation() {
        let caps = XaiProvider::new().capabilities().clone();
        assert!(!caps.video_interpolation);
        assert_eq!(caps.max_input_images, 1);
        assert_eq!(caps.video_durations.unwrap().max, 15);
    }

    #[test]
    fn test_shapes() {
        let provider = XaiProvider::new();
        assert_eq!(provider.shape(MediaKind::Image), Some(CallShape::SyncBatch));
        assert_eq!(provider.shape(MediaKind::Video), Some(CallShape::PollingJob));
    }
}
