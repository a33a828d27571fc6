//! Error types for media generation.

/// Maximum length of a vendor error body surfaced to the caller.
const MAX_ERROR_BODY: usize = 500;

/// A capability rule violated by a request, checked before dispatch.
///
/// Each variant maps to one rule in [`crate::validate::validate`] so callers
/// can distinguish failures programmatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityViolation {
    /// More input images supplied than the provider accepts.
    #[error("too many input images: got {got}, provider accepts at most {max}")]
    TooManyInputImages {
        /// Number of input images in the request.
        got: usize,
        /// Provider's declared maximum.
        max: usize,
    },

    /// Aspect ratio not accepted by the provider.
    #[error("unsupported aspect ratio: {0:?}")]
    UnsupportedAspectRatio(String),

    /// End frame given but the provider cannot interpolate between frames.
    #[error("provider accepts a start frame only, not start+end interpolation")]
    InterpolationNotSupported,

    /// Video duration outside the provider's supported range.
    #[error("duration {got}s outside supported range {min}-{max}s")]
    DurationOutOfRange {
        /// Requested duration in seconds.
        got: u32,
        /// Minimum supported duration.
        min: u32,
        /// Maximum supported duration.
        max: u32,
    },

    /// Input images given for an image request the provider cannot edit.
    #[error("provider does not support image editing with input images")]
    EditingNotSupported,
}

/// Errors that can occur during media generation.
#[derive(Debug, thiserror::Error)]
pub enum MediaGenError {
    /// Provider id not registered.
    #[error("unknown provider: {0:?}")]
    UnknownProvider(String),

    /// Provider exists but its credential environment variables are unset.
    #[error("provider {provider} unavailable: set one of {env_vars}")]
    ProviderUnavailable {
        /// Provider id.
        provider: String,
        /// Comma-separated accepted environment variable names.
        env_vars: String,
    },

    /// Auto-selection found no provider with credentials.
    #[error("no provider available: no API key environment variables are set")]
    NoProviderAvailable,

    /// Provider does not generate the requested media kind.
    #[error("provider {provider} does not support {kind} generation")]
    UnsupportedKind {
        /// Provider id.
        provider: String,
        /// Requested media kind.
        kind: String,
    },

    /// Request violates the selected provider's capabilities.
    #[error("capability violation: {0}")]
    Capability(#[from] CapabilityViolation),

    /// Local input file has an extension outside the supported image set.
    #[error(
        "unsupported input file format: {0:?} (expected png, jpg, webp, gif, avif, heif or heic)"
    )]
    UnsupportedFileFormat(String),

    /// I/O error reading an input file or writing an output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to decode inline base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Vendor returned a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Truncated vendor error body.
        message: String,
    },

    /// Vendor reported success but returned no usable media.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// Polling budget exhausted before the job finished.
    #[error("{provider} job {job_id} timed out after {attempts} poll attempts")]
    Timeout {
        /// Provider id.
        provider: String,
        /// Vendor job identifier, for operator follow-up.
        job_id: String,
        /// Number of poll attempts made.
        attempts: u32,
    },

    /// Vendor explicitly rejected the content.
    #[error("content blocked: {0}")]
    ModerationBlocked(String),
}

/// Truncates a vendor error body to a bounded length before surfacing it.
///
/// Vendors occasionally return whole HTML pages on errors; the caller only
/// needs enough to identify the problem.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Result type alias for media generation operations.
pub type Result<T> = std::result::Result<T, MediaGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_short_message_passes_through() {
        assert_eq!(sanitize_error_message("  bad key "), "bad key");
    }

    #[test]
    fn test_sanitize_truncates_long_body() {
        let body = "x".repeat(10_000);
        let out = sanitize_error_message(&body);
        assert_eq!(out.len(), MAX_ERROR_BODY + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let out = sanitize_error_message(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= MAX_ERROR_BODY + 3);
    }

    #[test]
    fn test_capability_violation_display() {
        let err = MediaGenError::from(CapabilityViolation::TooManyInputImages { got: 5, max: 3 });
        assert_eq!(
            err.to_string(),
            "capability violation: too many input images: got 5, provider accepts at most 3"
        );
    }

    #[test]
    fn test_timeout_display_names_job() {
        let err = MediaGenError::Timeout {
            provider: "xai".into(),
            job_id: "req-123".into(),
            attempts: 150,
        };
        assert_eq!(
            err.to_string(),
            "xai job req-123 timed out after 150 poll attempts"
        );
    }
}
