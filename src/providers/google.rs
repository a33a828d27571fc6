//! Google provider: Gemini image generation and Veo video generation.

use crate::capabilities::{DurationRange, ProviderCapabilities};
use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::NormalizedRequest;
use crate::provider::{CallShape, Provider, ProviderId, RawMedia};
use crate::providers::{download_bytes, decode_base64, split_data_uri, vendor_error};
use crate::request::MediaKind;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-generate-preview";

const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(10);
const VIDEO_POLL_ATTEMPTS: u32 = 60;

static CAPS: ProviderCapabilities = ProviderCapabilities {
    max_input_images: 3,
    aspect_ratios: Some(&["1:1", "2:3", "3:2", "3:4", "4:3", "9:16", "16:9", "21:9"]),
    custom_aspect_ratios: false,
    video_interpolation: true,
    video_durations: Some(DurationRange::new(4, 8)),
    image_editing: true,
};

/// Google media provider.
///
/// Images go through the Gemini `generateContent` endpoint, which returns one
/// image per call, so batches loop. Videos go through the Veo
/// `predictLongRunning` endpoint and are polled as long-running operations.
pub struct GoogleProvider {
    client: reqwest::Client,
}

impl GoogleProvider {
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
        let url = format!("{API_BASE}/models/{model}:generateContent");
        let body = GeminiRequest::build(request, &self.client).await?;

        let mut items = Vec::with_capacity(request.count as usize);
        // Gemini returns a single image per call; the batch is N independent
        // calls and the first failure aborts the remainder.
        for index in 0..request.count as usize {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(vendor_error(status.as_u16(), &text));
            }

            let parsed: GeminiResponse = response.json().await?;
            let inline = parsed.into_inline_data()?;
            let bytes = decode_base64(&inline.data)?;

            tracing::debug!(model, index, size = bytes.len(), "decoded Gemini image");
            items.push(RawMedia {
                kind: MediaKind::Image,
                provider: ProviderId::Google,
                model: model.to_string(),
                index,
                source_url: None,
                bytes,
                mime_type: Some(inline.mime_type),
            });
        }
        Ok(items)
    }

    async fn generate_videos(
        &self,
        request: &NormalizedRequest,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let model = request.model.as_deref().unwrap_or(DEFAULT_VIDEO_MODEL);
        let url = format!("{API_BASE}/models/{model}:predictLongRunning");
        let body = VeoRequest::build(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let submitted: VeoOperation = response.json().await?;
        let op_name = submitted.name.clone();
        tracing::debug!(operation = %op_name, model, "submitted Veo generation");

        let done = self.poll_operation(&op_name, api_key).await?;
        self.collect_videos(done, &op_name, model, api_key).await
    }

    async fn poll_operation(&self, op_name: &str, api_key: &str) -> Result<VeoOperation> {
        let url = format!("{API_BASE}/{op_name}");

        for attempt in 0..VIDEO_POLL_ATTEMPTS {
            let response = self
                .client
                .get(&url)
                .header("x-goog-api-key", api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(vendor_error(status.as_u16(), &text));
            }

            let op: VeoOperation = response.json().await?;
            if let Some(error) = op.error {
                return Err(MediaGenError::Api {
                    status: error.code.unwrap_or(500) as u16,
                    message: error.message.unwrap_or_else(|| "Veo job failed".into()),
                });
            }
            if op.done {
                return Ok(op);
            }

            tracing::debug!(operation = %op_name, attempt, "Veo generation pending");
            tokio::time::sleep(VIDEO_POLL_INTERVAL).await;
        }

        Err(MediaGenError::Timeout {
            provider: ProviderId::Google.to_string(),
            job_id: op_name.to_string(),
            attempts: VIDEO_POLL_ATTEMPTS,
        })
    }

    async fn collect_videos(
        &self,
        op: VeoOperation,
        op_name: &str,
        model: &str,
        api_key: &str,
    ) -> Result<Vec<RawMedia>> {
        let body = op.response.unwrap_or_default();
        let inner = body.generate_video_response.unwrap_or_default();

        if inner.generated_samples.is_empty() {
            if inner.rai_media_filtered_count.unwrap_or(0) > 0 {
                let reason = inner
                    .rai_media_filtered_reasons
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Veo safety filter removed all outputs".into());
                return Err(MediaGenError::ModerationBlocked(reason));
            }
            return Err(MediaGenError::EmptyResult(format!(
                "Veo operation {op_name} completed without video output"
            )));
        }

        let mut items = Vec::with_capacity(inner.generated_samples.len());
        for (index, sample) in inner.generated_samples.into_iter().enumerate() {
            let uri = sample.video.and_then(|v| v.uri).ok_or_else(|| {
                MediaGenError::EmptyResult(format!("Veo sample {index} carried no video URI"))
            })?;
            let download_url = veo_download_url(&uri, api_key)?;
            let (bytes, mime) = download_bytes(&self.client, &download_url).await?;
            items.push(RawMedia {
                kind: MediaKind::Video,
                provider: ProviderId::Google,
                model: model.to_string(),
                index,
                source_url: Some(uri),
                bytes,
                mime_type: mime.or_else(|| Some("video/mp4".to_string())),
            });
        }
        Ok(items)
    }
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn kinds(&self) -> &'static [MediaKind] {
        &[MediaKind::Image, MediaKind::Video]
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &CAPS
    }

    fn shape(&self, kind: MediaKind) -> Option<CallShape> {
        match kind {
            MediaKind::Image => Some(CallShape::PerItemCall),
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

// Gemini wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    async fn build(request: &NormalizedRequest, client: &reqwest::Client) -> Result<Self> {
        let mut parts = Vec::new();

        // Input images precede the prompt text, matching the edit ordering
        // the API expects.
        for reference in &request.input_images {
            parts.push(GeminiPart::InlineData {
                inline_data: inline_data_from_ref(client, reference).await?,
            });
        }
        parts.push(GeminiPart::Text {
            text: request.prompt.clone(),
        });

        Ok(Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: request
                    .aspect_ratio
                    .as_ref()
                    .map(|r| GeminiImageConfig {
                        aspect_ratio: r.clone(),
                    }),
            },
        })
    }
}

/// Converts a transport-ready reference into Gemini inline data. Data URIs
/// are split apart directly; remote URLs are fetched and re-encoded since
/// the endpoint only accepts inline bytes.
async fn inline_data_from_ref(
    client: &reqwest::Client,
    reference: &str,
) -> Result<GeminiInlineData> {
    if let Some((mime, payload)) = split_data_uri(reference) {
        return Ok(GeminiInlineData {
            mime_type: mime.to_string(),
            data: payload.to_string(),
        });
    }
    let (bytes, mime) = download_bytes(client, reference).await?;
    Ok(GeminiInlineData {
        mime_type: mime.unwrap_or_else(|| "image/png".to_string()),
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    #[serde(default)]
    inline_data: Option<GeminiResponseInline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponseInline {
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    /// Extracts the generated image, mapping block signals to
    /// [`MediaGenError::ModerationBlocked`]. Blocks arrive as HTTP 200.
    fn into_inline_data(self) -> Result<GeminiResponseInline> {
        if let Some(feedback) = &self.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("prompt blocked: {reason}"));
                return Err(MediaGenError::ModerationBlocked(msg));
            }
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            MediaGenError::EmptyResult("no candidates in Gemini response".into())
        })?;

        if let Some(reason) = &candidate.finish_reason {
            if matches!(
                reason.as_str(),
                "SAFETY"
                    | "IMAGE_SAFETY"
                    | "IMAGE_PROHIBITED_CONTENT"
                    | "RECITATION"
                    | "IMAGE_RECITATION"
                    | "PROHIBITED_CONTENT"
                    | "BLOCKLIST"
            ) {
                return Err(MediaGenError::ModerationBlocked(format!(
                    "blocked by Gemini safety filter: {reason}"
                )));
            }
        }

        candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| MediaGenError::EmptyResult("no image data in Gemini response".into()))
    }
}

// Veo wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VeoImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<VeoImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_base64_encoded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gcs_uri: Option<String>,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    sample_count: u32,
}

impl VeoRequest {
    fn build(request: &NormalizedRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: request.prompt.clone(),
                image: request.start_frame.as_deref().map(veo_image_from_ref),
                last_frame: request.end_frame.as_deref().map(veo_image_from_ref),
            }],
            parameters: VeoParameters {
                aspect_ratio: request.aspect_ratio.clone(),
                duration_seconds: request.duration_secs,
                sample_count: request.count,
            },
        }
    }
}

/// The file endpoint requires the API key as a query parameter; sample URIs
/// sometimes already carry a query string. Cloud Storage URIs cannot be
/// fetched over plain HTTP at all.
fn veo_download_url(uri: &str, api_key: &str) -> Result<String> {
    if uri.starts_with("gs://") {
        return Err(MediaGenError::EmptyResult(format!(
            "Veo returned Cloud Storage URI {uri}; fetch it with gsutil or re-run without a storage destination"
        )));
    }
    let separator = if uri.contains('?') { '&' } else { '?' };
    Ok(format!("{uri}{separator}key={api_key}"))
}

fn veo_image_from_ref(reference: &str) -> VeoImage {
    match split_data_uri(reference) {
        Some((mime, payload)) => VeoImage {
            bytes_base64_encoded: Some(payload.to_string()),
            gcs_uri: None,
            mime_type: mime.to_string(),
        },
        None => VeoImage {
            bytes_base64_encoded: None,
            gcs_uri: Some(reference.to_string()),
            mime_type: "image/png".to_string(),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<VeoError>,
    #[serde(default)]
    response: Option<VeoResponseBody>,
}

#[derive(Debug, Deserialize)]
struct VeoError {
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoResponseBody {
    #[serde(default)]
    generate_video_response: Option<VeoVideoResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generated_samples: Vec<VeoSample>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VeoSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}
