//! Caller-facing request types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of media to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    #[default]
    Image,
    /// Video clip.
    Video,
}

impl MediaKind {
    /// Returns the kind name used in CLI flags and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Default output format for this kind.
    pub fn default_format(&self) -> OutputFormat {
        match self {
            Self::Image => OutputFormat::Png,
            Self::Video => OutputFormat::Mp4,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested output format for generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG image (lossless).
    Png,
    /// JPEG image (lossy).
    Jpg,
    /// WebP image.
    WebP,
    /// Animated GIF.
    Gif,
    /// MP4 video.
    Mp4,
    /// WebM video.
    WebM,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
            Self::WebM => "video/webm",
        }
    }
}

/// Provider selection: a concrete vendor or credential-based auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSelector {
    /// First provider with credentials, in priority order.
    #[default]
    Auto,
    /// Google (Gemini image, Veo video).
    Google,
    /// OpenAI (gpt-image, Sora).
    OpenAi,
    /// xAI (Grok Imagine).
    Xai,
    /// fal.ai queue API.
    Fal,
    /// Multi-vendor gateway.
    Gateway,
}

/// Options for a single generation call. All fields are optional; the prompt
/// is passed separately to [`crate::Router::generate`].
///
/// Constructed once per call and treated as immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Provider to use (default: auto-detect from credentials).
    pub provider: ProviderSelector,
    /// Vendor model id override.
    pub model: Option<String>,
    /// Number of items to generate, clamped to 1-10 during normalization.
    pub count: Option<u32>,
    /// Aspect ratio as a `"W:H"` string.
    pub aspect_ratio: Option<String>,
    /// Media kind (default: image).
    pub kind: Option<MediaKind>,
    /// Output format (default: png for images, mp4 for videos).
    pub format: Option<OutputFormat>,
    /// Explicit output file path, used verbatim when the batch has one item.
    pub output_path: Option<PathBuf>,
    /// Output directory for generated files (default: current directory).
    pub output_dir: Option<PathBuf>,
    /// Filename base override; defaults to a slug of the prompt.
    pub name: Option<String>,
    /// Reference/edit input images: local paths, URLs, or data URIs.
    pub input_images: Vec<String>,
    /// Start frame for image-to-video generation.
    pub start_frame: Option<String>,
    /// End frame for video interpolation.
    pub end_frame: Option<String>,
    /// Video duration in seconds.
    pub duration_secs: Option<u32>,
}

impl GenerateOptions {
    /// Creates options with every field defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a provider.
    pub fn with_provider(mut self, provider: ProviderSelector) -> Self {
        self.provider = provider;
        self
    }

    /// Sets the vendor model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the number of items to generate.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the aspect ratio (e.g. `"16:9"`).
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Sets the media kind.
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets an explicit output file path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Overrides the filename base.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a reference/edit input image (path, URL, or data URI).
    pub fn with_input_image(mut self, image: impl Into<String>) -> Self {
        self.input_images.push(image.into());
        self
    }

    /// Sets the start frame for image-to-video generation.
    pub fn with_start_frame(mut self, frame: impl Into<String>) -> Self {
        self.start_frame = Some(frame.into());
        self
    }

    /// Sets the end frame for interpolation.
    pub fn with_end_frame(mut self, frame: impl Into<String>) -> Self {
        self.end_frame = Some(frame.into());
        self
    }

    /// Sets the video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_per_kind() {
        assert_eq!(MediaKind::Image.default_format(), OutputFormat::Png);
        assert_eq!(MediaKind::Video.default_format(), OutputFormat::Mp4);
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(OutputFormat::Jpg.extension(), "jpg");
        assert_eq!(OutputFormat::Mp4.extension(), "mp4");
        assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
    }

    #[test]
    fn test_builder_chain() {
        let opts = GenerateOptions::new()
            .with_provider(ProviderSelector::Xai)
            .with_count(3)
            .with_aspect_ratio("16:9")
            .with_kind(MediaKind::Video)
            .with_duration(6)
            .with_input_image("frame.png");

        assert_eq!(opts.provider, ProviderSelector::Xai);
        assert_eq!(opts.count, Some(3));
        assert_eq!(opts.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(opts.kind, Some(MediaKind::Video));
        assert_eq!(opts.duration_secs, Some(6));
        assert_eq!(opts.input_images, vec!["frame.png"]);
    }

    #[test]
    fn test_selector_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProviderSelector::OpenAi).unwrap(),
            "\"openai\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderSelector::Auto).unwrap(),
            "\"auto\""
        );
    }
}
