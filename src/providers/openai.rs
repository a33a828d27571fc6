//! OpenAI provider: gpt-image generation/edits and Sora video generation.

use crate::capabilities::{DurationRange, ProviderCapabilities};
use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::NormalizedRequest;
use crate::provider::{CallShape, Provider, ProviderId, RawMedia};
use crate::providers::{download_bytes, decode_base64, ref_to_bytes, vendor_error};
use crate::request::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const EDITS_URL: &str = "https://api.openai.com/v1/images/edits";
const VIDEOS_URL: &str = "https://api.openai.com/v1/videos";

const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_VIDEO_MODEL: &str = "sora-2";

const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);
const VIDEO_POLL_ATTEMPTS: u32 = 120;

static CAPS: ProviderCapabilities = ProviderCapabilities {
    max_input_images: 16,
    aspect_ratios: Some(&["1:1", "3:2", "2:3", "16:9", "9:16"]),
    custom_aspect_ratios: false,
    video_interpolation: false,
    video_durations: Some(DurationRange::new(4, 12)),
    image_editing: true,
};

/// OpenAI media provider.
///
/// The images API returns the whole batch from one call (`n` parameter,
/// inline base64 by default). Video goes through the Sora jobs API and is
/// polled until terminal.
pub struct OpenAiProvider {
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates the provider with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Maps an aspect ratio onto the size grid the image model supports.
    fn image_size(ratio: Option<&str>) -> Option<&'static str> {
        let normalized: String = ratio?.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.as_str() {
            "1:1" => Some("1024x1024"),
            "3:2" | "16:9" => Some("1536x1024"),
            "2:3" | "9:16" => Some("1024x1536"),
            _ => None,
        }
    }

    /// Sora accepts pixel dimensions rather than ratio strings.
    fn video_size(ratio: Option<&str>) -> Option<&'static str> {
        let normalized: String = ratio?.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.as_str() {
            "16:9" => Some("1280x720"),
            "9:16" => Some("720x1280"),
            "1:1" => Some("720x720"),
            _ => None,
        }
    }

    async fn generate_images(
        &self,
        request: &NormalizedRequest,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let model = request.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL);

        let response = if request.input_images.is_empty() {
            let body = ImagesRequest {
                model,
                prompt: &request.prompt,
                n: request.count,
                size: Self::image_size(request.aspect_ratio.as_deref()),
            };
            self.client
                .post(IMAGES_URL)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?
        } else {
            // Edits take the input images as multipart file parts.
            let mut form = reqwest::multipart::Form::new()
                .text("model", model.to_string())
                .text("prompt", request.prompt.clone())
                .text("n", request.count.to_string());
            if let Some(size) = Self::image_size(request.aspect_ratio.as_deref()) {
                form = form.text("size", size);
            }
            for (i, reference) in request.input_images.iter().enumerate() {
                let (bytes, mime) = ref_to_bytes(&self.client, reference).await?;
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(format!("input-{i}.png"))
                    .mime_str(&mime)?;
                form = form.part("image[]", part);
            }
            self.client
                .post(EDITS_URL)
                .bearer_auth(api_key)
                .multipart(form)
                .send()
                .await?
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let parsed: ImagesResponse = response.json().await?;
        self.decode_batch(parsed, model).await
    }

    /// Decodes a sync-batch response; a malformed item is skipped with a
    /// warning rather than aborting its siblings.
    async fn decode_batch(&self, parsed: ImagesResponse, model: &str) -> Result<Vec<RawMedia>> {
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
                provider: ProviderId::OpenAi,
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

        if request.start_frame.is_some() {
            // Sora reference input needs a separate upload flow this adapter
            // does not implement; degrade softly instead of failing.
            tracing::warn!("Sora adapter ignores the start frame; generating from prompt only");
        }

        let body = VideoCreateRequest {
            model,
            prompt: &request.prompt,
            seconds: request.duration_secs.map(|d| d.to_string()),
            size: Self::video_size(request.aspect_ratio.as_deref()),
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

        let job: VideoJob = response.json().await?;
        let job_id = job.id.clone();
        tracing::debug!(job_id = %job_id, model, "submitted Sora generation");

        self.poll_video(&job_id, api_key).await?;

        let content_url = format!("{VIDEOS_URL}/{job_id}/content");
        let response = self
            .client
            .get(&content_url)
            .bearer_auth(api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }
        let bytes = response.bytes().await?.to_vec();

        Ok(vec![RawMedia {
            kind: MediaKind::Video,
            provider: ProviderId::OpenAi,
            model: model.to_string(),
            index: 0,
            source_url: Some(content_url),
            bytes,
            mime_type: Some("video/mp4".to_string()),
        }])
    }

    async fn poll_video(&self, job_id: &str, api_key: &str) -> Result<()> {
        let url = format!("{VIDEOS_URL}/{job_id}");

        for attempt in 0..VIDEO_POLL_ATTEMPTS {
            let response = self.client.get(&url).bearer_auth(api_key).send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(vendor_error(status.as_u16(), &text));
            }

            let job: VideoJob = response.json().await?;
            match job.status.as_str() {
                "completed" => return Ok(()),
                "failed" => {
                    let message = job
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "Sora job failed".into());
                    return Err(vendor_error(500, &message));
                }
                _ => {
                    tracing::debug!(job_id, attempt, status = %job.status, "Sora job pending");
                    tokio::time::sleep(VIDEO_POLL_INTERVAL).await;
                }
            }
        }

        Err(MediaGenError::Timeout {
            provider: ProviderId::OpenAi.to_string(),
            job_id: job_id.to_string(),
            attempts: VIDEO_POLL_ATTEMPTS,
        })
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
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
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct VideoCreateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seconds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<VideoJobError>,
}

#[derive(Debug, Deserialize)]
struct VideoJobError {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_mapping() {
        assert_eq!(OpenAiProvider::image_size(Some("1:1")), Some("1024x1024"));
        assert_eq!(OpenAiProvider::image_size(Some("16:9")), Some("1536x1024"));
        assert_eq!(OpenAiProvider::image_size(Some("9:16")), Some("1024x1536"));
        assert_eq!(OpenAiProvider::image_size(Some("16 : 9")), Some("1536x1024"));
        assert_eq!(OpenAiProvider::image_size(Some("7:5")), None);
        assert_eq!(OpenAiProvider::image_size(None), None);
    }

    #[test]
    fn test_video_size_mapping() {
        assert_eq!(OpenAiProvider::video_size(Some("16:9")), Some("1280x720"));
        assert_eq!(OpenAiProvider::video_size(Some("9:16")), Some("720x1280"));
        assert_eq!(OpenAiProvider::video_size(Some("21:9")), None);
    }

    #[test]
    fn test_images_request_serialization() {
        let body = ImagesRequest {
            model: "gpt-image-1",
            prompt: "a cat",
            n: 3,
            size: Some("1024x1024"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["n"], 3);
        assert_eq!(json["size"], "1024x1024");

        let no_size = ImagesRequest {
            model: "gpt-image-1",
            prompt: "a cat",
            n: 1,
            size: None,
        };
        let json = serde_json::to_value(&no_size).unwrap();
        assert!(json.get("size").is_none());
    }

    #[tokio::test]
    async fn test_decode_batch_skips_malformed_items() {
        let provider = OpenAiProvider::new();
        let parsed: ImagesResponse = serde_json::from_str(
            r#"{"data": [{"b64_json": "aGk="}, {}, {"b64_json": "eW8="}]}"#,
        )
        .unwrap();
        let items = provider.decode_batch(parsed, "gpt-image-1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].bytes, b"hi");
        assert_eq!(items[1].bytes, b"yo");
        assert_eq!(items[1].index, 1);
    }

    #[tokio::test]
    async fn test_decode_batch_all_malformed_is_empty_result() {
        let provider = OpenAiProvider::new();
        let parsed: ImagesResponse = serde_json::from_str(r#"{"data": [{}, {}]}"#).unwrap();
        assert!(matches!(
            provider.decode_batch(parsed, "m").await.unwrap_err(),
            MediaGenError::EmptyResult(_)
        ));
    }

    #[test]
    fn test_video_job_deserialization() {
        let job: VideoJob = serde_json::from_str(
            r#"{"id": "video_123", "status": "failed", "error": {"message": "moderation_blocked"}}"#,
        )
        .unwrap();
        assert_eq!(job.id, "video_123");
        assert_eq!(job.status, "failed");
        assert_eq!(
            job.error.unwrap().message.as_deref(),
            Some("moderation_blocked")
        );
    }

    #[test]
    fn test_shapes() {
        let provider = OpenAiProvider::new();
        assert_eq!(provider.shape(MediaKind::Image), Some(CallShape::SyncBatch));
        assert_eq!(provider.shape(MediaKind::Video), Some(CallShape::PollingJob));
    }
}
