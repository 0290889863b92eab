//! Deterministic in-memory document engine
//!
//! Pages are plain data (size, text lines, image boxes) and overlays are kept
//! as a list per page. Inserted text shows up in text extraction the same way
//! it does with a real PDF backend, and masking never removes the glyphs
//! underneath. Documents persist as JSON.

use super::{
    AnnotationHandle, BuiltinFont, DocumentEngine, EngineError, EngineResult, FreeTextStyle,
};
use crate::geometry::{Point, Rect};
use crate::text::{Glyph, Rgb, StyleFlags, TextBlock, TextLine, TextSpan, Word};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Glyph advance as a fraction of the font size
const GLYPH_ADVANCE_RATIO: f32 = 0.5;

/// Line box height as a multiple of the font size
const LINE_HEIGHT_RATIO: f32 = 1.2;

/// Baseline offset from the top of the line box, as a fraction of font size
const ASCENT_RATIO: f32 = 0.8;

/// Overlay painted on top of the page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayKind {
    FilledRect {
        rect: Rect,
        color: Rgb,
    },
    Text {
        origin: Point,
        text: String,
        font: BuiltinFont,
        font_size: f32,
        color: Rgb,
    },
    FreeText {
        rect: Rect,
        text: String,
        font: BuiltinFont,
        font_size: f32,
        text_color: Rgb,
        fill_color: Rgb,
    },
    Highlight {
        rect: Rect,
        color: Rgb,
    },
    Note {
        anchor: Point,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub handle: AnnotationHandle,
    pub kind: OverlayKind,
}

/// One page of an in-memory document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl MemoryPage {
    /// Create an empty page of the given size in points
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            blocks: Vec::new(),
            overlays: Vec::new(),
        }
    }

    /// US Letter page
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// Add a one-line text block whose line box starts at `(x, y)`
    pub fn with_line(self, x: f32, y: f32, text: &str, font: &str, size: f32, color: Rgb) -> Self {
        self.with_styled_line(x, y, &[(text, font, size, color)])
    }

    /// Add a one-line text block made of several differently styled spans
    pub fn with_styled_line(mut self, x: f32, y: f32, runs: &[(&str, &str, f32, Rgb)]) -> Self {
        let mut cursor = x;
        let mut spans = Vec::with_capacity(runs.len());
        for (text, font, size, color) in runs {
            let span = layout_span(cursor, y, text, font, *size, *color);
            cursor = span.bbox.x1;
            spans.push(span);
        }
        if spans.is_empty() {
            return self;
        }
        let bbox = spans
            .iter()
            .skip(1)
            .fold(spans[0].bbox, |acc, s| acc.union(&s.bbox));
        self.blocks.push(TextBlock::Text {
            bbox,
            lines: vec![TextLine { bbox, spans }],
        });
        self
    }

    /// Add an image block
    pub fn with_image(mut self, bbox: Rect) -> Self {
        self.blocks.push(TextBlock::Image { bbox });
        self
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Page blocks followed by the text overlays, in insertion order
    fn all_blocks(&self) -> Vec<TextBlock> {
        let mut blocks = self.blocks.clone();
        blocks.extend(self.overlays.iter().filter_map(|o| overlay_block(&o.kind)));
        blocks
    }

    fn all_words(&self) -> Vec<Word> {
        words_of(&self.all_blocks())
    }
}

/// Text block drawn by a text-bearing overlay
fn overlay_block(kind: &OverlayKind) -> Option<TextBlock> {
    match kind {
        OverlayKind::Text {
            origin,
            text,
            font,
            font_size,
            color,
        } => {
            let top = origin.y - font_size * ASCENT_RATIO;
            let span = layout_span(origin.x, top, text, font.postscript_name(), *font_size, *color);
            Some(TextBlock::Text {
                bbox: span.bbox,
                lines: vec![TextLine {
                    bbox: span.bbox,
                    spans: vec![span],
                }],
            })
        }
        OverlayKind::FreeText {
            rect,
            text,
            font,
            font_size,
            text_color,
            ..
        } => {
            let lines: Vec<TextLine> = text
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    let span = layout_span(
                        rect.x0,
                        rect.y0 + i as f32 * font_size * LINE_HEIGHT_RATIO,
                        line,
                        font.postscript_name(),
                        *font_size,
                        *text_color,
                    );
                    TextLine {
                        bbox: span.bbox,
                        spans: vec![span],
                    }
                })
                .collect();
            (!lines.is_empty()).then(|| TextBlock::Text { bbox: *rect, lines })
        }
        _ => None,
    }
}

fn words_of(blocks: &[TextBlock]) -> Vec<Word> {
    let mut words = Vec::new();
    for block in blocks {
        for line in block.lines() {
            for span in &line.spans {
                split_words(span, &mut words);
            }
        }
    }
    words
}

/// Lay out a span with fixed-advance glyphs
fn layout_span(x: f32, y: f32, text: &str, font: &str, size: f32, color: Rgb) -> TextSpan {
    let advance = size * GLYPH_ADVANCE_RATIO;
    let chars: Vec<Glyph> = text.chars().map(|_| Glyph { width: advance }).collect();
    let width = advance * chars.len() as f32;
    TextSpan {
        bbox: Rect::new(x, y, x + width, y + size * LINE_HEIGHT_RATIO),
        text: text.to_string(),
        font: font.to_string(),
        size,
        flags: StyleFlags::from_font_name(font),
        color,
        chars,
    }
}

/// Split a fixed-advance span on whitespace into positioned words
fn split_words(span: &TextSpan, out: &mut Vec<Word>) {
    let advance = if span.chars.is_empty() {
        0.0
    } else {
        span.bbox.width() / span.chars.len() as f32
    };
    let mut start: Option<usize> = None;
    let mut current = String::new();
    for (i, c) in span.text.chars().enumerate() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push(word_at(span, s, i, advance, std::mem::take(&mut current)));
            }
        } else {
            start.get_or_insert(i);
            current.push(c);
        }
    }
    if let Some(s) = start {
        let end = span.text.chars().count();
        out.push(word_at(span, s, end, advance, current));
    }
}

fn word_at(span: &TextSpan, start: usize, end: usize, advance: f32, text: String) -> Word {
    let x0 = span.bbox.x0 + start as f32 * advance;
    let x1 = span.bbox.x0 + end as f32 * advance;
    Word::new(Rect::new(x0, span.bbox.y0, x1, span.bbox.y1), text)
}

/// Document engine backed by plain data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryEngine {
    pages: Vec<MemoryPage>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Borrow a page model, e.g. to inspect overlays
    pub fn page(&self, page: u16) -> EngineResult<&MemoryPage> {
        let page_count = self.page_count();
        self.pages
            .get(page as usize)
            .ok_or(EngineError::PageOutOfRange { page, page_count })
    }

    fn page_mut(&mut self, page: u16) -> EngineResult<&mut MemoryPage> {
        let page_count = self.page_count();
        self.pages
            .get_mut(page as usize)
            .ok_or(EngineError::PageOutOfRange { page, page_count })
    }

    fn push_overlay(&mut self, page: u16, kind: OverlayKind) -> EngineResult<AnnotationHandle> {
        let handle = AnnotationHandle::new();
        self.page_mut(page)?.overlays.push(Overlay { handle, kind });
        Ok(handle)
    }
}

impl DocumentEngine for InMemoryEngine {
    fn open(path: &Path) -> EngineResult<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| EngineError::Open(e.to_string()))
    }

    fn page_count(&self) -> u16 {
        self.pages.len() as u16
    }

    fn page_bounds(&self, page: u16) -> EngineResult<Rect> {
        Ok(self.page(page)?.bounds())
    }

    fn text_structure(&self, page: u16) -> EngineResult<Vec<TextBlock>> {
        Ok(self.page(page)?.all_blocks())
    }

    fn words(&self, page: u16) -> EngineResult<Vec<Word>> {
        Ok(self.page(page)?.all_words())
    }

    fn textbox(&self, page: u16, rect: &Rect) -> EngineResult<String> {
        let mut parts = Vec::new();
        for word in self.page(page)?.all_words() {
            let count = word.text.chars().count();
            if count == 0 {
                continue;
            }
            let advance = word.rect.width() / count as f32;
            let center_y = (word.rect.y0 + word.rect.y1) / 2.0;
            let inside: String = word
                .text
                .chars()
                .enumerate()
                .filter(|(i, _)| {
                    let center_x = word.rect.x0 + (*i as f32 + 0.5) * advance;
                    rect.contains_point(&Point::new(center_x, center_y))
                })
                .map(|(_, c)| c)
                .collect();
            if !inside.is_empty() {
                parts.push(inside);
            }
        }
        Ok(parts.join(" "))
    }

    fn render(&self, page: u16, scale: f32) -> EngineResult<RgbaImage> {
        let model = self.page(page)?;
        if scale <= 0.0 {
            return Err(EngineError::Render {
                page,
                message: format!("invalid scale {scale}"),
            });
        }

        let width = (model.width * scale).round().max(1.0) as u32;
        let height = (model.height * scale).round().max(1.0) as u32;
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        for word in words_of(&model.blocks) {
            fill(&mut image, &word.rect, scale, Rgb::BLACK, 255);
        }
        for overlay in &model.overlays {
            match &overlay.kind {
                OverlayKind::FilledRect { rect, color } => fill(&mut image, rect, scale, *color, 255),
                OverlayKind::Highlight { rect, color } => fill(&mut image, rect, scale, *color, 96),
                OverlayKind::FreeText {
                    rect, fill_color, ..
                } => fill(&mut image, rect, scale, *fill_color, 255),
                _ => {}
            }
        }
        // Glyph boxes of drawn text go on top of every fill
        for overlay in &model.overlays {
            let color = match &overlay.kind {
                OverlayKind::Text { color, .. } => *color,
                OverlayKind::FreeText { text_color, .. } => *text_color,
                _ => continue,
            };
            if let Some(block) = overlay_block(&overlay.kind) {
                for word in words_of(std::slice::from_ref(&block)) {
                    fill(&mut image, &word.rect, scale, color, 255);
                }
            }
        }

        Ok(image)
    }

    fn insert_text(
        &mut self,
        page: u16,
        origin: Point,
        text: &str,
        font: BuiltinFont,
        font_size: f32,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle> {
        self.push_overlay(
            page,
            OverlayKind::Text {
                origin,
                text: text.to_string(),
                font,
                font_size,
                color,
            },
        )
    }

    fn insert_free_text(
        &mut self,
        page: u16,
        rect: &Rect,
        text: &str,
        style: &FreeTextStyle,
    ) -> EngineResult<AnnotationHandle> {
        self.push_overlay(
            page,
            OverlayKind::FreeText {
                rect: *rect,
                text: text.to_string(),
                font: style.font,
                font_size: style.font_size,
                text_color: style.text_color,
                fill_color: style.fill_color,
            },
        )
    }

    fn draw_filled_rect(
        &mut self,
        page: u16,
        rect: &Rect,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle> {
        self.push_overlay(page, OverlayKind::FilledRect { rect: *rect, color })
    }

    fn add_highlight(
        &mut self,
        page: u16,
        rect: &Rect,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle> {
        self.push_overlay(page, OverlayKind::Highlight { rect: *rect, color })
    }

    fn add_note(
        &mut self,
        page: u16,
        anchor: Point,
        content: &str,
    ) -> EngineResult<AnnotationHandle> {
        self.push_overlay(
            page,
            OverlayKind::Note {
                anchor,
                content: content.to_string(),
            },
        )
    }

    fn list_annotations(&self, page: u16) -> EngineResult<Vec<AnnotationHandle>> {
        Ok(self.page(page)?.overlays.iter().map(|o| o.handle).collect())
    }

    fn delete_annotation(&mut self, page: u16, handle: AnnotationHandle) -> EngineResult<()> {
        let overlays = &mut self.page_mut(page)?.overlays;
        let index = overlays
            .iter()
            .position(|o| o.handle == handle)
            .ok_or(EngineError::AnnotationNotFound(handle))?;
        overlays.remove(index);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| EngineError::Save(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Paint `rect` (document space) into the image, blending with `alpha`
fn fill(image: &mut RgbaImage, rect: &Rect, scale: f32, color: Rgb, alpha: u8) {
    let (r, g, b) = color.to_u8();
    let x0 = (rect.x0 * scale).floor().max(0.0) as u32;
    let y0 = (rect.y0 * scale).floor().max(0.0) as u32;
    let x1 = ((rect.x1 * scale).ceil().max(0.0) as u32).min(image.width());
    let y1 = ((rect.y1 * scale).ceil().max(0.0) as u32).min(image.height());
    let a = alpha as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            let px = image.get_pixel_mut(x, y);
            let blend = |src: u8, dst: u8| ((src as u32 * a + dst as u32 * (255 - a)) / 255) as u8;
            *px = Rgba([blend(r, px[0]), blend(g, px[1]), blend(b, px[2]), 255]);
        }
    }
}
