//! Pre-dispatch capability validation.
//!
//! Centralizing these checks lets every adapter assume a pre-validated
//! request instead of duplicating range and format logic per vendor.

use crate::capabilities::ProviderCapabilities;
use crate::error::{CapabilityViolation, Result};
use crate::normalize::NormalizedRequest;
use crate::request::MediaKind;

/// Checks a normalized request against one provider's capabilities.
///
/// Pure; no side effects. Rules run in a fixed order and the first violation
/// wins, so a given (request, capabilities) pair always fails the same way.
pub fn validate(request: &NormalizedRequest, caps: &ProviderCapabilities) -> Result<()> {
    if request.input_images.len() > caps.max_input_images {
        return Err(CapabilityViolation::TooManyInputImages {
            got: request.input_images.len(),
            max: caps.max_input_images,
        }
        .into());
    }

    if let Some(ratio) = &request.aspect_ratio {
        if !ratio_accepted(ratio, caps) {
            return Err(CapabilityViolation::UnsupportedAspectRatio(ratio.clone()).into());
        }
    }

    if request.end_frame.is_some() && !caps.video_interpolation {
        return Err(CapabilityViolation::InterpolationNotSupported.into());
    }

    if let (Some(secs), MediaKind::Video, Some(range)) =
        (request.duration_secs, request.kind, caps.video_durations)
    {
        if !range.contains(secs) {
            return Err(CapabilityViolation::DurationOutOfRange {
                got: secs,
                min: range.min,
                max: range.max,
            }
            .into());
        }
    }

    if request.kind == MediaKind::Image && !request.input_images.is_empty() && !caps.image_editing {
        return Err(CapabilityViolation::EditingNotSupported.into());
    }

    Ok(())
}

fn ratio_accepted(ratio: &str, caps: &ProviderCapabilities) -> bool {
    if caps.custom_aspect_ratios {
        return true;
    }
    let normalized: String = ratio.chars().filter(|c| !c.is_whitespace()).collect();
    match caps.aspect_ratios {
        Some(allowed) => allowed.contains(&normalized.as_str()),
        None => is_ratio_shape(&normalized),
    }
}

/// Accepts only the literal `integer:integer` shape.
fn is_ratio_shape(s: &str) -> bool {
    match s.split_once(':') {
        Some((w, h)) => {
            !w.is_empty()
                && !h.is_empty()
                && w.bytes().all(|b| b.is_ascii_digit())
                && h.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::DurationRange;
    use crate::request::OutputFormat;
    use std::path::PathBuf;

    fn request() -> NormalizedRequest {
        NormalizedRequest {
            prompt: "a cat".into(),
            model: None,
            count: 1,
            aspect_ratio: None,
            kind: MediaKind::Image,
            format: OutputFormat::Png,
            output_path: None,
            output_dir: PathBuf::from("/tmp"),
            name_base: "a-cat".into(),
            timestamp: "20260101-120000".into(),
            input_images: Vec::new(),
            start_frame: None,
            end_frame: None,
            duration_secs: None,
        }
    }

    fn caps() -> ProviderCapabilities {
        ProviderCapabilities {
            max_input_images: 2,
            aspect_ratios: Some(&["4:3", "16:9"]),
            custom_aspect_ratios: false,
            video_interpolation: false,
            video_durations: Some(DurationRange::new(2, 8)),
            image_editing: true,
        }
    }

    #[test]
    fn test_input_image_count_boundary() {
        let mut req = request();
        req.input_images = vec!["data:a".into(), "data:b".into()];
        assert!(validate(&req, &caps()).is_ok());

        req.input_images.push("data:c".into());
        let err = validate(&req, &caps()).unwrap_err();
        assert!(matches!(
            err,
            crate::MediaGenError::Capability(CapabilityViolation::TooManyInputImages {
                got: 3,
                max: 2
            })
        ));
    }

    #[test]
    fn test_aspect_ratio_allow_list() {
        let mut req = request();
        req.aspect_ratio = Some("4:3".into());
        assert!(validate(&req, &caps()).is_ok());

        req.aspect_ratio = Some("4 : 3".into());
        assert!(validate(&req, &caps()).is_ok(), "whitespace is normalized");

        req.aspect_ratio = Some("5:7".into());
        let err = validate(&req, &caps()).unwrap_err();
        assert!(matches!(
            err,
            crate::MediaGenError::Capability(CapabilityViolation::UnsupportedAspectRatio(_))
        ));
    }

    #[test]
    fn test_custom_ratio_accepts_anything() {
        let mut custom = caps();
        custom.custom_aspect_ratios = true;
        let mut req = request();
        req.aspect_ratio = Some("1234:7".into());
        assert!(validate(&req, &custom).is_ok());
    }

    #[test]
    fn test_no_allow_list_requires_literal_shape() {
        let mut open = caps();
        open.aspect_ratios = None;
        let mut req = request();

        for ok in ["16:9", "1:1", " 21 : 9 "] {
            req.aspect_ratio = Some(ok.into());
            assert!(validate(&req, &open).is_ok(), "{ok:?} should pass");
        }
        for bad in ["wide", "16:", ":9", "16:9:2", "1.5:1", "-1:2"] {
            req.aspect_ratio = Some(bad.into());
            assert!(validate(&req, &open).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_end_frame_needs_interpolation() {
        let mut req = request();
        req.kind = MediaKind::Video;
        req.end_frame = Some("data:x".into());
        let err = validate(&req, &caps()).unwrap_err();
        assert!(matches!(
            err,
            crate::MediaGenError::Capability(CapabilityViolation::InterpolationNotSupported)
        ));

        let mut interp = caps();
        interp.video_interpolation = true;
        assert!(validate(&req, &interp).is_ok());
    }

    #[test]
    fn test_duration_boundaries() {
        let mut req = request();
        req.kind = MediaKind::Video;

        for ok in [2, 8] {
            req.duration_secs = Some(ok);
            assert!(validate(&req, &caps()).is_ok(), "{ok}s should pass");
        }
        for bad in [1, 9] {
            req.duration_secs = Some(bad);
            let err = validate(&req, &caps()).unwrap_err();
            assert!(
                matches!(
                    err,
                    crate::MediaGenError::Capability(CapabilityViolation::DurationOutOfRange {
                        min: 2,
                        max: 8,
                        ..
                    })
                ),
                "{bad}s should fail the range check"
            );
        }
    }

    #[test]
    fn test_duration_ignored_for_images() {
        let mut req = request();
        req.duration_secs = Some(999);
        assert!(validate(&req, &caps()).is_ok());
    }

    #[test]
    fn test_editing_unsupported() {
        let mut no_edit = caps();
        no_edit.image_editing = false;
        let mut req = request();
        req.input_images = vec!["data:a".into()];
        let err = validate(&req, &no_edit).unwrap_err();
        assert!(matches!(
            err,
            crate::MediaGenError::Capability(CapabilityViolation::EditingNotSupported)
        ));
    }

    #[test]
    fn test_deterministic_first_violation() {
        // Both the count rule and the ratio rule are violated; the count rule
        // runs first and must win every time.
        let mut req = request();
        req.input_images = vec!["a".into(), "b".into(), "c".into()];
        req.aspect_ratio = Some("5:7".into());
        for _ in 0..3 {
            let err = validate(&req, &caps()).unwrap_err();
            assert!(matches!(
                err,
                crate::MediaGenError::Capability(CapabilityViolation::TooManyInputImages { .. })
            ));
        }
    }
}
