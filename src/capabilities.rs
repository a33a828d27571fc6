//! Static per-provider capability descriptors.

use serde::Serialize;

/// Inclusive video duration bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationRange {
    /// Minimum supported duration.
    pub min: u32,
    /// Maximum supported duration.
    pub max: u32,
}

impl DurationRange {
    /// Creates a new inclusive range.
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Returns true if `secs` falls within the range.
    pub fn contains(&self, secs: u32) -> bool {
        self.min <= secs && secs <= self.max
    }
}

/// What one provider supports, declared statically and never mutated.
///
/// Absent `aspect_ratios` with `custom_aspect_ratios` false means no
/// allow-list pre-validation beyond the literal `W:H` shape. Absent
/// `video_durations` means the provider does not generate video.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCapabilities {
    /// Maximum number of input images accepted.
    pub max_input_images: usize,
    /// Allow-list of supported aspect ratios, if the vendor has a fixed set.
    pub aspect_ratios: Option<&'static [&'static str]>,
    /// Whether arbitrary `W:H` ratios are accepted.
    pub custom_aspect_ratios: bool,
    /// Whether start+end frame video interpolation is supported.
    pub video_interpolation: bool,
    /// Supported video duration bounds; `None` means video is unsupported.
    pub video_durations: Option<DurationRange>,
    /// Whether image editing (prompt + input image) is supported.
    pub image_editing: bool,
}

impl ProviderCapabilities {
    /// A text-to-image-only capability set; the starting point most
    /// provider declarations adjust from.
    pub const fn image_only() -> Self {
        Self {
            max_input_images: 0,
            aspect_ratios: None,
            custom_aspect_ratios: false,
            video_interpolation: false,
            video_durations: None,
            image_editing: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_range_inclusive() {
        let range = DurationRange::new(2, 8);
        assert!(range.contains(2));
        assert!(range.contains(8));
        assert!(!range.contains(1));
        assert!(!range.contains(9));
    }

    #[test]
    fn test_image_only_baseline() {
        let caps = ProviderCapabilities::image_only();
        assert_eq!(caps.max_input_images, 0);
        assert!(caps.video_durations.is_none());
        assert!(!caps.image_editing);
    }
}
