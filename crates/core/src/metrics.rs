//! Approximate text dimensions for replacement layout

use crate::config::EditorConfig;
use crate::formatting::FormattingProfile;

/// Estimates the size of a single-line text run in a given style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDimensionEstimator {
    char_width_ratio: f32,
    line_height_factor: f32,
}

impl Default for TextDimensionEstimator {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl TextDimensionEstimator {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            char_width_ratio: config.char_width_ratio,
            line_height_factor: config.line_height_factor,
        }
    }

    /// Average advance of one glyph at the profile's font size
    pub fn avg_char_width(&self, profile: &FormattingProfile) -> f32 {
        profile.font_size * self.char_width_ratio
    }

    /// Estimated `(width, height)` of `text` drawn in `profile`
    ///
    /// Negative character spacing is clamped at one average glyph width so
    /// appending a character never shrinks the estimate.
    pub fn estimate(&self, text: &str, profile: &FormattingProfile) -> (f32, f32) {
        let avg = self.avg_char_width(profile);
        let n = text.chars().count();
        let spacing = profile.char_spacing.max(-avg);

        let width = n as f32 * avg + n.saturating_sub(1) as f32 * spacing;
        let height = if profile.line_height > 0.0 {
            profile.line_height
        } else {
            profile.font_size * self.line_height_factor
        };
        (width, height)
    }
}

/// [`TextDimensionEstimator::estimate`] with the default ratios
pub fn estimate(text: &str, profile: &FormattingProfile) -> (f32, f32) {
    TextDimensionEstimator::default().estimate(text, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_estimate_baseline() {
        let profile = FormattingProfile::default();
        let (width, height) = estimate("Facture", &profile);
        assert!((width - 50.4).abs() < 1e-4);
        assert_eq!(height, 14.0);
    }

    #[test]
    fn test_estimate_with_spacing() {
        let profile = FormattingProfile {
            char_spacing: 1.0,
            ..FormattingProfile::default()
        };
        let (width, _) = estimate("abc", &profile);
        assert!((width - (3.0 * 7.2 + 2.0)).abs() < 1e-4);
    }

    #[test]
    fn test_estimate_empty_and_fallback_height() {
        let profile = FormattingProfile {
            line_height: 0.0,
            font_size: 10.0,
            ..FormattingProfile::default()
        };
        let (width, height) = estimate("", &profile);
        assert_eq!(width, 0.0);
        assert!((height - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_large_negative_spacing_is_clamped() {
        let profile = FormattingProfile {
            char_spacing: -100.0,
            ..FormattingProfile::default()
        };
        let (one, _) = estimate("a", &profile);
        let (two, _) = estimate("ab", &profile);
        assert!(two >= one);
    }

    proptest! {
        #[test]
        fn prop_width_is_monotonic(
            text in "[a-zA-Z ]{0,40}",
            font_size in 1.0f32..72.0,
            char_spacing in -50.0f32..50.0,
        ) {
            let profile = FormattingProfile {
                font_size,
                char_spacing,
                ..FormattingProfile::default()
            };
            let estimator = TextDimensionEstimator::default();
            let (shorter, _) = estimator.estimate(&text, &profile);
            let longer_text = format!("{text}x");
            let (longer, _) = estimator.estimate(&longer_text, &profile);
            prop_assert!(longer + 1e-3 >= shorter);
        }
    }
}
