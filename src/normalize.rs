//! Request normalization: turns loosely-specified [`GenerateOptions`] into a
//! fully-resolved [`NormalizedRequest`].
//!
//! After normalization no further filesystem or environment access is needed
//! to validate the request or drive any provider adapter: local image files
//! are already inlined as data URIs, the output directory is absolute, and
//! every default is filled in.

use crate::error::{MediaGenError, Result};
use crate::request::{GenerateOptions, MediaKind, OutputFormat};
use base64::Engine;
use std::path::{Path, PathBuf};

/// Hard limit on items per batch.
pub const MAX_COUNT: u32 = 10;

/// Maximum length of a slugified name base.
const MAX_SLUG_LEN: usize = 60;

/// Name base used when slugification produces nothing usable.
const FALLBACK_NAME: &str = "generation";

/// A fully-resolved, validated-input generation request.
///
/// Owned by exactly one call to [`crate::Router::generate`]; never shared
/// across concurrent calls.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    /// The text prompt.
    pub prompt: String,
    /// Vendor model id override, if any.
    pub model: Option<String>,
    /// Number of items to generate, in 1..=10.
    pub count: u32,
    /// Aspect ratio string, if requested.
    pub aspect_ratio: Option<String>,
    /// Media kind.
    pub kind: MediaKind,
    /// Requested output format.
    pub format: OutputFormat,
    /// Explicit output path, honored verbatim for single-item batches.
    pub output_path: Option<PathBuf>,
    /// Absolute output directory.
    pub output_dir: PathBuf,
    /// Filename base.
    pub name_base: String,
    /// Timestamp shared by every output file of this batch.
    pub timestamp: String,
    /// Transport-ready input image references (URLs or data URIs).
    pub input_images: Vec<String>,
    /// Transport-ready start frame reference.
    pub start_frame: Option<String>,
    /// Transport-ready end frame reference.
    pub end_frame: Option<String>,
    /// Video duration in seconds, if requested.
    pub duration_secs: Option<u32>,
}

/// Resolves options into a [`NormalizedRequest`].
///
/// Fails only on unreadable local input files ([`MediaGenError::Io`]) or
/// unsupported local file extensions ([`MediaGenError::UnsupportedFileFormat`]).
pub async fn normalize(prompt: &str, options: &GenerateOptions) -> Result<NormalizedRequest> {
    let kind = options.kind.unwrap_or_default();
    let format = options.format.unwrap_or_else(|| kind.default_format());
    let count = options.count.unwrap_or(1).clamp(1, MAX_COUNT);

    let output_dir = resolve_output_dir(options.output_dir.as_deref())?;

    let name_base = match &options.name {
        Some(name) => slugify(name),
        None => slugify(prompt),
    };

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();

    // Inputs are independent pure reads; resolve them all in parallel.
    let inputs = futures::future::try_join_all(options.input_images.iter().map(|r| resolve_ref(r)));
    let start = resolve_opt_ref(options.start_frame.as_deref());
    let end = resolve_opt_ref(options.end_frame.as_deref());
    let (input_images, start_frame, end_frame) = futures::try_join!(inputs, start, end)?;

    Ok(NormalizedRequest {
        prompt: prompt.to_string(),
        model: options.model.clone(),
        count,
        aspect_ratio: options.aspect_ratio.clone(),
        kind,
        format,
        output_path: options.output_path.clone(),
        output_dir,
        name_base,
        timestamp,
        input_images,
        start_frame,
        end_frame,
        duration_secs: options.duration_secs,
    })
}

fn resolve_output_dir(dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match dir {
        Some(d) if d.is_absolute() => d.to_path_buf(),
        Some(d) => cwd.join(d),
        None => cwd,
    })
}

/// Converts free text into a filename-safe slug.
///
/// Lowercases, strips quote characters, collapses runs of any other
/// non-alphanumeric characters into single hyphens, trims hyphens, and caps
/// the result at 60 characters. Idempotent.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_LEN));
    let mut pending_hyphen = false;

    for c in text.chars() {
        if matches!(c, '\'' | '"' | '`' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}') {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        slug
    }
}

async fn resolve_opt_ref(reference: Option<&str>) -> Result<Option<String>> {
    match reference {
        Some(r) => Ok(Some(resolve_ref(r).await?)),
        None => Ok(None),
    }
}

/// Resolves one image reference into transport-ready form.
///
/// Remote URLs and data URIs pass through verbatim; local paths are read
/// fully and re-encoded as base64 data URIs.
async fn resolve_ref(reference: &str) -> Result<String> {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
    {
        return Ok(reference.to_string());
    }

    let path = Path::new(reference);
    let mime = mime_for_local_image(path)?;
    let bytes = tokio::fs::read(path).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

/// MIME type for a local image file, inferred from its extension.
fn mime_for_local_image(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "avif" => Ok("image/avif"),
        "heif" => Ok("image/heif"),
        "heic" => Ok("image/heic"),
        _ => Err(MediaGenError::UnsupportedFileFormat(
            path.display().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ProviderSelector;
    use base64::Engine;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("A cat on the moon"), "a-cat-on-the-moon");
    }

    #[test]
    fn test_slugify_strips_quotes() {
        assert_eq!(slugify("a \"brave\" dog's day"), "a-brave-dogs-day");
    }

    #[test]
    fn test_slugify_collapses_runs_and_trims() {
        assert_eq!(slugify("  hello --- world!!! "), "hello-world");
    }

    #[test]
    fn test_slugify_caps_length() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= 60);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify("!!!"), "generation");
        assert_eq!(slugify(""), "generation");
    }

    #[test]
    fn test_slugify_idempotent() {
        for input in ["A cat!", "  --x-- ", "word ", "日本語のみ", "MiXeD CaSe 42"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
        }
    }

    #[tokio::test]
    async fn test_normalize_defaults() {
        let opts = GenerateOptions::new();
        let req = normalize("A cat", &opts).await.unwrap();

        assert_eq!(req.count, 1);
        assert_eq!(req.kind, MediaKind::Image);
        assert_eq!(req.format, OutputFormat::Png);
        assert_eq!(req.name_base, "a-cat");
        assert!(req.output_dir.is_absolute());
        assert_eq!(req.timestamp.len(), "YYYYMMDD-HHMMSS".len());
    }

    #[tokio::test]
    async fn test_normalize_clamps_count() {
        let req = normalize("x", &GenerateOptions::new().with_count(99))
            .await
            .unwrap();
        assert_eq!(req.count, 10);

        let req = normalize("x", &GenerateOptions::new().with_count(0))
            .await
            .unwrap();
        assert_eq!(req.count, 1);
    }

    #[tokio::test]
    async fn test_normalize_video_defaults_mp4() {
        let req = normalize("x", &GenerateOptions::new().with_kind(MediaKind::Video))
            .await
            .unwrap();
        assert_eq!(req.format, OutputFormat::Mp4);
    }

    #[tokio::test]
    async fn test_urls_and_data_uris_pass_through() {
        let opts = GenerateOptions::new()
            .with_input_image("https://example.com/a.png")
            .with_input_image("data:image/png;base64,AAAA");
        let req = normalize("x", &opts).await.unwrap();
        assert_eq!(
            req.input_images,
            vec!["https://example.com/a.png", "data:image/png;base64,AAAA"]
        );
    }

    #[tokio::test]
    async fn test_local_file_round_trips_as_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let bytes: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
        std::fs::write(&path, bytes).unwrap();

        let opts = GenerateOptions::new().with_input_image(path.display().to_string());
        let req = normalize("x", &opts).await.unwrap();

        let uri = &req.input_images[0];
        assert!(uri.starts_with("data:image/png;base64,"));
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(uri.strip_prefix("data:image/png;base64,").unwrap())
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hi").unwrap();

        let opts = GenerateOptions::new().with_start_frame(path.display().to_string());
        let err = normalize("x", &opts).await.unwrap_err();
        assert!(matches!(err, MediaGenError::UnsupportedFileFormat(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let opts = GenerateOptions::new().with_input_image("/nonexistent/x.png");
        let err = normalize("x", &opts).await.unwrap_err();
        assert!(matches!(err, MediaGenError::Io(_)));
    }

    #[tokio::test]
    async fn test_name_override_is_slugified() {
        let opts = GenerateOptions::new()
            .with_provider(ProviderSelector::Auto)
            .with_name("My Custom Name!");
        let req = normalize("ignored prompt", &opts).await.unwrap();
        assert_eq!(req.name_base, "my-custom-name");
    }
}
