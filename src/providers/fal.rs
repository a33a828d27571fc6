//! fal.ai provider: queue API for both image and video generation.
//!
//! fal hosts many models behind one queue protocol; the endpoint path is the
//! model id itself, so "which endpoint" is a function of the model and of
//! which frames the request carries.

use crate::capabilities::{DurationRange, ProviderCapabilities};
use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::NormalizedRequest;
use crate::provider::{CallShape, Provider, ProviderId, RawMedia};
use crate::providers::{download_bytes, vendor_error};
use crate::request::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const QUEUE_BASE: &str = "https://queue.fal.run";

const DEFAULT_IMAGE_MODEL: &str = "fal-ai/flux/schnell";
const DEFAULT_IMAGE_EDIT_MODEL: &str = "fal-ai/flux/dev/image-to-image";
const DEFAULT_TEXT_TO_VIDEO_MODEL: &str = "fal-ai/kling-video/v2.1/standard/text-to-video";
const DEFAULT_IMAGE_TO_VIDEO_MODEL: &str = "fal-ai/kling-video/v2.1/standard/image-to-video";

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_ATTEMPTS: u32 = 150;

static CAPS: ProviderCapabilities = ProviderCapabilities {
    max_input_images: 4,
    aspect_ratios: None,
    custom_aspect_ratios: true,
    video_interpolation: true,
    video_durations: Some(DurationRange::new(2, 10)),
    image_editing: true,
};

/// fal.ai media provider.
pub struct FalProvider {
    client: reqwest::Client,
}

impl FalProvider {
    /// Creates the provider with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Picks the queue endpoint (model id) for a request.
    fn resolve_model(request: &NormalizedRequest) -> String {
        if let Some(model) = &request.model {
            return model.clone();
        }
        match request.kind {
            MediaKind::Image if request.input_images.is_empty() => DEFAULT_IMAGE_MODEL.into(),
            MediaKind::Image => DEFAULT_IMAGE_EDIT_MODEL.into(),
            MediaKind::Video if request.start_frame.is_some() => {
                DEFAULT_IMAGE_TO_VIDEO_MODEL.into()
            }
            MediaKind::Video => DEFAULT_TEXT_TO_VIDEO_MODEL.into(),
        }
    }

    async fn submit(
        &self,
        model: &str,
        request: &NormalizedRequest,
        api_key: &str,
    ) -> Result<QueueSubmitResponse> {
        if request.input_images.len() > 1 {
            // The fal endpoints consume a single reference image.
            tracing::warn!(
                ignored = request.input_images.len() - 1,
                "fal endpoint uses only the first input image; ignoring the rest"
            );
        }

        let body = FalRequest {
            prompt: &request.prompt,
            num_images: match request.kind {
                MediaKind::Image => Some(request.count),
                MediaKind::Video => None,
            },
            aspect_ratio: request.aspect_ratio.as_deref(),
            image_url: match request.kind {
                MediaKind::Image => request.input_images.first().map(String::as_str),
                MediaKind::Video => request.start_frame.as_deref(),
            },
            tail_image_url: request.end_frame.as_deref(),
            duration: request.duration_secs,
        };

        let url = format!("{QUEUE_BASE}/{model}");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {api_key}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }
        Ok(response.json().await?)
    }

    async fn poll(&self, submitted: &QueueSubmitResponse, api_key: &str) -> Result<()> {
        for attempt in 0..POLL_ATTEMPTS {
            let response = self
                .client
                .get(&submitted.status_url)
                .header("Authorization", format!("Key {api_key}"))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(vendor_error(status.as_u16(), &text));
            }

            let parsed: QueueStatus = response.json().await?;
            match parsed.status.as_str() {
                "COMPLETED" => return Ok(()),
                "IN_QUEUE" | "IN_PROGRESS" => {
                    tracing::debug!(
                        request_id = %submitted.request_id,
                        attempt,
                        status = %parsed.status,
                        "fal job pending"
                    );
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                other => {
                    return Err(vendor_error(
                        500,
                        &format!("fal job {} reported status {other}", submitted.request_id),
                    ));
                }
            }
        }

        Err(MediaGenError::Timeout {
            provider: ProviderId::Fal.to_string(),
            job_id: submitted.request_id.clone(),
            attempts: POLL_ATTEMPTS,
        })
    }

    async fn collect(
        &self,
        submitted: &QueueSubmitResponse,
        model: &str,
        kind: MediaKind,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let response = self
            .client
            .get(&submitted.response_url)
            .header("Authorization", format!("Key {api_key}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let result: FalResult = response.json().await?;
        let files: Vec<FalFile> = match kind {
            MediaKind::Image => result.images,
            MediaKind::Video => result.video.into_iter().collect(),
        };

        if files.is_empty() {
            return Err(MediaGenError::EmptyResult(format!(
                "fal job {} completed without media output",
                submitted.request_id
            )));
        }

        let mut items = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let url = file.url.ok_or_else(|| {
                MediaGenError::EmptyResult(format!("fal result item {index} carried no URL"))
            })?;
            let (bytes, header_mime) = download_bytes(&self.client, &url).await?;
            items.push(RawMedia {
                kind,
                provider: ProviderId::Fal,
                model: model.to_string(),
                index,
                source_url: Some(url),
                bytes,
                mime_type: file.content_type.or(header_mime),
            });
        }
        Ok(items)
    }
}

impl Default for FalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Fal
    }

    fn kinds(&self) -> &'static [MediaKind] {
        &[MediaKind::Image, MediaKind::Video]
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &CAPS
    }

    fn shape(&self, _kind: MediaKind) -> Option<CallShape> {
        // Every fal model runs through the same queue protocol.
        Some(CallShape::PollingJob)
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

        let model = Self::resolve_model(request);
        let submitted = self.submit(&model, request, api_key).await?;
        tracing::debug!(request_id = %submitted.request_id, model = %model, "submitted fal job");
        self.poll(&submitted, api_key).await?;
        self.collect(&submitted, &model, request.kind, api_key).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct FalRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_images: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tail_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct QueueSubmitResponse {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct FalResult {
    #[serde(default)]
    images: Vec<FalFile>,
    #[serde(default)]
    video: Option<FalFile>,
}

#[derive(Debug, Deserialize)]
struct FalFile {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::OutputFormat;
    use std::path::PathBuf;

    fn request(kind: MediaKind) -> NormalizedRequest {
        NormalizedRequest {
            prompt: "a boat".into(),
            model: None,
            count: 1,
            aspect_ratio: None,
            kind,
            format: OutputFormat::Png,
            output_path: None,
            output_dir: PathBuf::from("/tmp"),
            name_base: "a-boat".into(),
            timestamp: "20260101-120000".into(),
            input_images: Vec::new(),
            start_frame: None,
            end_frame: None,
            duration_secs: None,
        }
    }

    #[test]
    fn test_model_resolution_by_inputs() {
        assert_eq!(
            FalProvider::resolve_model(&request(MediaKind::Image)),
            DEFAULT_IMAGE_MODEL
        );

        let mut edit = request(MediaKind::Image);
        edit.input_images.push("data:image/png;base64,AA".into());
        assert_eq!(FalProvider::resolve_model(&edit), DEFAULT_IMAGE_EDIT_MODEL);

        assert_eq!(
            FalProvider::resolve_model(&request(MediaKind::Video)),
            DEFAULT_TEXT_TO_VIDEO_MODEL
        );

        let mut i2v = request(MediaKind::Video);
        i2v.start_frame = Some("data:image/png;base64,AA".into());
        assert_eq!(FalProvider::resolve_model(&i2v), DEFAULT_IMAGE_TO_VIDEO_MODEL);

        let mut explicit = request(MediaKind::Image);
        explicit.model = Some("fal-ai/recraft-v3".into());
        assert_eq!(FalProvider::resolve_model(&explicit), "fal-ai/recraft-v3");
    }

    #[test]
    fn test_queue_submit_response_deserialization() {
        let resp: QueueSubmitResponse = serde_json::from_str(
            r#"{
                "request_id": "abc",
                "status_url": "https://queue.fal.run/fal-ai/flux/requests/abc/status",
                "response_url": "https://queue.fal.run/fal-ai/flux/requests/abc"
            }"#,
        )
        .unwrap();
        assert_eq!(resp.request_id, "abc");
        assert!(resp.status_url.ends_with("/status"));
    }

    #[test]
    fn test_result_shapes() {
        let images: FalResult = serde_json::from_str(
            r#"{"images": [{"url": "https://x/img.png", "content_type": "image/png"}]}"#,
        )
        .unwrap();
        assert_eq!(images.images.len(), 1);

        let video: FalResult =
            serde_json::from_str(r#"{"video": {"url": "https://x/v.mp4"}}"#).unwrap();
        assert!(video.video.is_some());
        assert!(video.images.is_empty());
    }

    #[test]
    fn test_single_polling_shape() {
        let provider = FalProvider::new();
        assert_eq!(provider.shape(MediaKind::Image), Some(CallShape::PollingJob));
        assert_eq!(provider.shape(MediaKind::Video), Some(CallShape::PollingJob));
    }
}
