//! Masked-overwrite editing of page regions
//!
//! An edit never rewrites content streams. The original glyphs are painted
//! over with an opaque white mask, new glyphs are drawn on top in a style
//! that approximates the original, and the mask is registered so hit-testing
//! and extraction ignore what lies underneath.
//!
//! Engine failures are reported as-is. A mask painted before a failing
//! insertion stays on the page.

use crate::config::EditorConfig;
use crate::engine::{AnnotationHandle, DocumentEngine, FreeTextStyle};
use crate::error::{CoreError, CoreResult};
use crate::formatting::{self, FormattingProfile};
use crate::geometry::{Point, Rect};
use crate::metrics::TextDimensionEstimator;
use crate::registry::RegionRegistry;
use crate::text::Rgb;
use serde::{Deserialize, Serialize};

/// Baseline offset of an inserted glyph run, as a fraction of the font size
const BASELINE_RATIO: f32 = 0.8;

/// Inset of an inserted glyph run from the left edge of its box
const TEXT_INSET: f32 = 2.0;

/// Growth of the mask beyond the original and adjusted rectangles
const MASK_MARGIN: f32 = 1.0;

/// How replacement text is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionStrategy {
    /// Positioned glyph run over a white background rectangle
    GlyphRun,
    /// Wrapped free-text box with white fill and border
    FreeText,
}

/// Result of a committed replacement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub mask_rect: Rect,
    pub adjusted_rect: Rect,
    pub formatting: FormattingProfile,
    pub strategy: InsertionStrategy,
}

/// User overrides applied on top of an analyzed style
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverrides {
    pub font_size: Option<f32>,
    pub color: Option<Rgb>,
}

impl StyleOverrides {
    fn apply(&self, profile: &mut FormattingProfile) {
        if let Some(size) = self.font_size {
            // Keep the line height proportional to the new size
            if profile.font_size > 0.0 {
                profile.line_height *= size / profile.font_size;
            }
            profile.font_size = size;
        }
        if let Some(color) = self.color {
            profile.color = color;
        }
    }
}

/// Fail with [`CoreError::InvalidRegion`] unless `page` exists
pub fn check_page<E: DocumentEngine>(engine: &E, page: u16) -> CoreResult<()> {
    let page_count = engine.page_count();
    if page >= page_count {
        return Err(CoreError::InvalidRegion { page, page_count });
    }
    Ok(())
}

/// Applies region edits to a document and keeps the registry in sync
#[derive(Debug, Clone, Default)]
pub struct RegionEditor {
    config: EditorConfig,
    estimator: TextDimensionEstimator,
}

impl RegionEditor {
    pub fn new(config: EditorConfig) -> Self {
        let estimator = TextDimensionEstimator::from_config(&config);
        Self { config, estimator }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Box needed to draw `text` in `profile` starting at `original`'s origin
    ///
    /// Overflow past the right page edge shifts the box left (never past 0)
    /// and overflow past the bottom edge truncates it.
    pub fn adjust_rect_for_text(
        &self,
        original: &Rect,
        text: &str,
        profile: &FormattingProfile,
        page_bounds: &Rect,
    ) -> Rect {
        let (width, height) = self.estimator.estimate(text, profile);
        let mut x0 = original.x0;
        let y0 = original.y0;
        let mut x1 = original.x0 + width + self.config.padding_x;
        let mut y1 = original.y0 + height + self.config.padding_y;

        if x1 > page_bounds.x1 {
            let overflow = x1 - page_bounds.x1;
            x0 = (x0 - overflow).max(0.0);
            x1 = page_bounds.x1;
        }
        if y1 > page_bounds.y1 {
            y1 = page_bounds.y1.max(y0);
        }

        Rect { x0, y0, x1: x1.max(x0), y1 }
    }

    /// True when `text` needs a free-text box instead of a glyph run
    pub fn is_long_text(&self, text: &str) -> bool {
        text.contains('\n') || text.chars().count() > self.config.long_text_threshold
    }

    /// Replace the content of `original` with `new_text` in the original style
    pub fn replace_text_area<E: DocumentEngine>(
        &self,
        engine: &mut E,
        registry: &mut RegionRegistry,
        page: u16,
        original: &Rect,
        new_text: &str,
    ) -> CoreResult<EditOutcome> {
        check_page(engine, page)?;
        let profile = formatting::FormattingAnalyzer::analyze(engine, page, original)?;
        self.replace_with_profile(engine, registry, page, original, new_text, profile)
    }

    /// Redraw `text` over `rect` with the analyzed style plus `overrides`
    pub fn restyle_text_area<E: DocumentEngine>(
        &self,
        engine: &mut E,
        registry: &mut RegionRegistry,
        page: u16,
        rect: &Rect,
        text: &str,
        overrides: StyleOverrides,
    ) -> CoreResult<EditOutcome> {
        check_page(engine, page)?;
        let mut profile = formatting::FormattingAnalyzer::analyze(engine, page, rect)?;
        overrides.apply(&mut profile);
        self.replace_with_profile(engine, registry, page, rect, text, profile)
    }

    fn replace_with_profile<E: DocumentEngine>(
        &self,
        engine: &mut E,
        registry: &mut RegionRegistry,
        page: u16,
        original: &Rect,
        new_text: &str,
        profile: FormattingProfile,
    ) -> CoreResult<EditOutcome> {
        let bounds = engine.page_bounds(page)?;
        let adjusted = self.adjust_rect_for_text(original, new_text, &profile, &bounds);

        let mask = original.union(&adjusted).expand(MASK_MARGIN);
        engine.draw_filled_rect(page, &mask, Rgb::WHITE)?;
        registry.mark_hidden(page, mask);

        let font = profile.builtin_font();
        let strategy = if self.is_long_text(new_text) {
            let style = FreeTextStyle {
                font,
                font_size: profile.font_size,
                text_color: profile.color,
                fill_color: Rgb::WHITE,
                border_color: Rgb::WHITE,
            };
            engine.insert_free_text(page, &adjusted, new_text, &style)?;
            InsertionStrategy::FreeText
        } else {
            engine.draw_filled_rect(page, &adjusted, Rgb::WHITE)?;
            let origin = Point::new(
                adjusted.x0 + TEXT_INSET,
                adjusted.y0 + profile.font_size * BASELINE_RATIO,
            );
            engine.insert_text(page, origin, new_text, font, profile.font_size, profile.color)?;
            InsertionStrategy::GlyphRun
        };

        registry.record_replacement(page, *original, new_text, adjusted, profile.clone());
        log::info!(
            "page {page}: replaced {original:?} with {} chars ({strategy:?}, {})",
            new_text.chars().count(),
            font.postscript_name()
        );

        Ok(EditOutcome {
            mask_rect: mask,
            adjusted_rect: adjusted,
            formatting: profile,
            strategy,
        })
    }

    /// Mask `rect` without drawing replacement text
    pub fn hide_text_area<E: DocumentEngine>(
        &self,
        engine: &mut E,
        registry: &mut RegionRegistry,
        page: u16,
        rect: &Rect,
    ) -> CoreResult<AnnotationHandle> {
        check_page(engine, page)?;
        let profile = formatting::FormattingAnalyzer::analyze(engine, page, rect)?;

        let handle = engine.draw_filled_rect(page, rect, Rgb::WHITE)?;
        registry.mark_hidden(page, *rect);
        registry.record_replacement(page, *rect, "", *rect, profile);

        log::info!("page {page}: hid {rect:?}");
        Ok(handle)
    }

    /// Erase every edit on `page`
    ///
    /// Clears the registry entry and deletes every overlay and annotation the
    /// engine lists for the page, including ones that came with the file.
    /// Returns the number of deleted annotations.
    pub fn undo_page<E: DocumentEngine>(
        &self,
        engine: &mut E,
        registry: &mut RegionRegistry,
        page: u16,
    ) -> CoreResult<usize> {
        check_page(engine, page)?;
        registry.clear_page(page);

        let handles = engine.list_annotations(page)?;
        for handle in &handles {
            engine.delete_annotation(page, *handle)?;
        }

        log::info!("page {page}: undo removed {} annotations", handles.len());
        Ok(handles.len())
    }

    /// Highlight `rect`, in the configured color unless one is given
    pub fn highlight_area<E: DocumentEngine>(
        &self,
        engine: &mut E,
        page: u16,
        rect: &Rect,
        color: Option<Rgb>,
    ) -> CoreResult<AnnotationHandle> {
        check_page(engine, page)?;
        let color = color.unwrap_or(self.config.highlight_color);
        let handle = engine.add_highlight(page, rect, color)?;
        log::info!("page {page}: highlighted {rect:?}");
        Ok(handle)
    }

    pub fn add_note<E: DocumentEngine>(
        &self,
        engine: &mut E,
        page: u16,
        anchor: Point,
        content: &str,
    ) -> CoreResult<AnnotationHandle> {
        check_page(engine, page)?;
        if content.trim().is_empty() {
            return Err(CoreError::MalformedInput("empty note".to_string()));
        }
        let handle = engine.add_note(page, anchor, content)?;
        log::info!("page {page}: added note at ({}, {})", anchor.x, anchor.y);
        Ok(handle)
    }

    /// Draw new text with its baseline at `origin` in the default font
    pub fn insert_text_at<E: DocumentEngine>(
        &self,
        engine: &mut E,
        page: u16,
        origin: Point,
        text: &str,
        font_size: Option<f32>,
        color: Rgb,
    ) -> CoreResult<AnnotationHandle> {
        check_page(engine, page)?;
        if text.trim().is_empty() {
            return Err(CoreError::MalformedInput("empty text".to_string()));
        }
        let size = font_size.unwrap_or(self.config.default_font_size);
        let font = FormattingProfile::default().builtin_font();
        let handle = engine.insert_text(page, origin, text, font, size, color)?;
        log::info!("page {page}: inserted text at ({}, {})", origin.x, origin.y);
        Ok(handle)
    }
}
