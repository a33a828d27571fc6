//! Orchestration: normalize, select, validate, dispatch, persist.

use crate::credentials::Credentials;
use crate::error::{MediaGenError, Result};
use crate::normalize::{normalize, NormalizedRequest};
use crate::provider::{Provider, RawMedia};
use crate::registry::Registry;
use crate::request::{GenerateOptions, MediaKind, OutputFormat};
use crate::validate::validate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// A generated media item written to disk; the terminal, caller-visible
/// result. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct PersistedMedia {
    /// Media kind.
    pub kind: MediaKind,
    /// Provider that generated the item.
    pub provider: String,
    /// Vendor model id actually used.
    pub model: String,
    /// Ordinal position within the batch.
    pub index: usize,
    /// Source URL the bytes came from, if the vendor returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Size of the written file in bytes.
    pub byte_length: usize,
    /// MIME type of the written bytes: vendor-declared, falling back to the
    /// requested format's type.
    pub mime_type: String,
    /// Absolute path of the written file.
    pub file_path: PathBuf,
}

/// Entry point for generation calls.
///
/// One router serves the whole process; each call resolves credentials
/// fresh, runs the sequential pipeline, and owns its request exclusively.
pub struct Router {
    registry: Registry,
}

impl Router {
    /// Creates a router over the built-in providers.
    pub fn new() -> Self {
        Self {
            registry: Registry::with_default_providers(),
        }
    }

    /// Creates a router over an explicit registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// Generates media for a prompt, reading credentials from the process
    /// environment, and writes each item to disk.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Vec<PersistedMedia>> {
        let credentials = Credentials::from_env();
        self.generate_with_credentials(prompt, options, &credentials)
            .await
    }

    /// Generates media with explicit credentials.
    pub async fn generate_with_credentials(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        credentials: &Credentials,
    ) -> Result<Vec<PersistedMedia>> {
        let request = normalize(prompt, options).await?;
        let provider = self.registry.select(options.provider, credentials)?;

        if !provider.kinds().contains(&request.kind) {
            return Err(MediaGenError::UnsupportedKind {
                provider: provider.id().to_string(),
                kind: request.kind.to_string(),
            });
        }

        validate(&request, provider.capabilities())?;

        tracing::debug!(
            provider = %provider.id(),
            kind = %request.kind,
            count = request.count,
            shape = ?provider.shape(request.kind),
            "dispatching generation request"
        );

        let items = provider.generate(&request, credentials).await?;
        if items.is_empty() {
            return Err(MediaGenError::EmptyResult(format!(
                "provider {} returned no media",
                provider.id()
            )));
        }

        self.persist(&request, items).await
    }

    /// Returns the registered providers, for listings.
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        self.registry.providers()
    }

    async fn persist(
        &self,
        request: &NormalizedRequest,
        items: Vec<RawMedia>,
    ) -> Result<Vec<PersistedMedia>> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (position, item) in items.into_iter().enumerate() {
            let path = output_path(request, &item, position, total);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &item.bytes).await?;
            tracing::debug!(path = %path.display(), bytes = item.bytes.len(), "wrote media file");

            results.push(PersistedMedia {
                kind: item.kind,
                provider: item.provider.to_string(),
                model: item.model,
                index: item.index,
                source_url: item.source_url,
                byte_length: item.bytes.len(),
                mime_type: item
                    .mime_type
                    .unwrap_or_else(|| request.format.mime_type().to_string()),
                file_path: path,
            });
        }
        Ok(results)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the output path for one batch item.
///
/// An explicit output path is honored verbatim only for single-item batches;
/// everything else lands in the output directory under
/// `<name>-<timestamp>[-NN].<ext>`, with the 1-based zero-padded index
/// omitted when the batch produced exactly one item.
fn output_path(
    request: &NormalizedRequest,
    item: &RawMedia,
    position: usize,
    total: usize,
) -> PathBuf {
    if total == 1 {
        if let Some(explicit) = &request.output_path {
            return explicit.clone();
        }
    }

    let ext = extension_for(item.mime_type.as_deref(), request.format);
    let name = if total == 1 {
        format!("{}-{}.{}", request.name_base, request.timestamp, ext)
    } else {
        format!(
            "{}-{}-{:02}.{}",
            request.name_base,
            request.timestamp,
            position + 1,
            ext
        )
    };
    request.output_dir.join(name)
}

/// Picks the file extension from the vendor's declared MIME type, falling
/// back to the requested format. Vendors sometimes return JPEG when PNG was
/// asked for; the extension must describe the actual bytes.
fn extension_for(mime: Option<&str>, requested: OutputFormat) -> &'static str {
    match mime {
        Some("image/png") => "png",
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("video/mp4") => "mp4",
        Some("video/webm") => "webm",
        _ => requested.extension(),
    }
}
