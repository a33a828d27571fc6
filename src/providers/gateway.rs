//! Multi-vendor gateway provider.
//!
//! Speaks the OpenAI-compatible images wire format against a gateway that
//! routes to the underlying vendor by model id prefix (`google/...`,
//! `openai/...`). Text-to-image only.

use crate::capabilities::ProviderCapabilities;
use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::NormalizedRequest;
use crate::provider::{CallShape, Provider, ProviderId, RawMedia};
use crate::providers::{download_bytes, decode_base64, vendor_error};
use crate::request::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://ai-gateway.vercel.sh/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image";

static CAPS: ProviderCapabilities = ProviderCapabilities {
    max_input_images: 0,
    aspect_ratios: None,
    custom_aspect_ratios: true,
    video_interpolation: false,
    video_durations: None,
    image_editing: false,
};

/// Multi-vendor gateway provider.
pub struct GatewayProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayProvider {
    /// Creates the provider against the default gateway endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates the provider against a custom gateway endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GatewayProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for GatewayProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gateway
    }

    fn kinds(&self) -> &'static [MediaKind] {
        &[MediaKind::Image]
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &CAPS
    }

    fn shape(&self, kind: MediaKind) -> Option<CallShape> {
        match kind {
            MediaKind::Image => Some(CallShape::SyncBatch),
            MediaKind::Video => None,
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
        let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let body = GatewayImageRequest {
            model,
            prompt: &request.prompt,
            n: request.count,
            response_format: "b64_json",
            aspect_ratio: request.aspect_ratio.as_deref(),
        };

        let url = format!("{}/images/generations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error(status.as_u16(), &text));
        }

        let parsed: GatewayImageResponse = response.json().await?;
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
                provider: ProviderId::Gateway,
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
}

// Wire types

#[derive(Debug, Serialize)]
struct GatewayImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GatewayImageResponse {
    #[serde(default)]
    data: Vec<GatewayImageItem>,
}

#[derive(Debug, Deserialize)]
struct GatewayImageItem {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
