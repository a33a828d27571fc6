//! Vendor provider adapters.

mod fal;
mod gateway;
mod google;
mod openai;
mod xai;

pub use fal::FalProvider;
pub use gateway::GatewayProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use xai::XaiProvider;

use crate::error::{sanitize_error_message, MediaGenError, Result};
use base64::Engine;

/// Downloads media bytes from a URL, returning the bytes and the
/// content-type the server declared, if any.
pub(crate) async fn download_bytes(
    client: &reqwest::Client,
    url: &str,
) -> Result<(Vec<u8>, Option<String>)> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MediaGenError::Api {
            status: status.as_u16(),
            message: format!("failed to download media from {url}"),
        });
    }
    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
    let bytes = response.bytes().await?.to_vec();
    Ok((bytes, mime))
}

/// Decodes a standard base64 payload.
pub(crate) fn decode_base64(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| MediaGenError::Decode(e.to_string()))
}

/// Splits a `data:<mime>;base64,<payload>` URI into (mime, payload).
pub(crate) fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}

/// Materializes a transport-ready reference (data URI or URL) into raw bytes
/// plus a MIME type, downloading when necessary.
pub(crate) async fn ref_to_bytes(
    client: &reqwest::Client,
    reference: &str,
) -> Result<(Vec<u8>, String)> {
    if let Some((mime, payload)) = split_data_uri(reference) {
        return Ok((decode_base64(payload)?, mime.to_string()));
    }
    let (bytes, mime) = download_bytes(client, reference).await?;
    Ok((bytes, mime.unwrap_or_else(|| "image/png".to_string())))
}

/// Builds an error from a vendor's non-success response, sniffing the body
/// for explicit moderation rejections so they surface as recoverable.
pub(crate) fn vendor_error(status: u16, body: &str) -> MediaGenError {
    let message = sanitize_error_message(body);
    let lower = message.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("moderat")
        || lower.contains("prohibited")
    {
        return MediaGenError::ModerationBlocked(message);
    }
    MediaGenError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_uri() {
        let (mime, payload) = split_data_uri("data:image/png;base64,AAAA").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(payload, "AAAA");

        assert!(split_data_uri("https://example.com/a.png").is_none());
        assert!(split_data_uri("data:image/png,plain").is_none());
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(decode_base64("not base64 at all!").is_err());
        assert_eq!(decode_base64("aGk=").unwrap(), b"hi");
    }

    #[test]
    fn test_vendor_error_detects_moderation() {
        let err = vendor_error(400, "request rejected: content moderated");
        assert!(matches!(err, MediaGenError::ModerationBlocked(_)));

        let err = vendor_error(500, "internal error");
        assert!(matches!(err, MediaGenError::Api { status: 500, .. }));
    }

    #[test]
    fn test_vendor_error_truncates_body() {
        let err = vendor_error(500, &"x".repeat(5000));
        if let MediaGenError::Api { message, .. } = err {
            assert!(message.len() < 600);
        } else {
            panic!("expected Api error");
        }
    }
}
