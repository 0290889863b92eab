//! Per-page bookkeeping of masked and replaced regions
//!
//! Masking only paints over glyphs; the engine still reports them. Every
//! query that feeds hit-testing or extraction goes through this registry so
//! masked content stays invisible to the rest of the editor.

use crate::formatting::FormattingProfile;
use crate::geometry::{Point, Rect};
use crate::text::{TextBlock, TextLine, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record of a committed replacement edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementRecord {
    pub original_rect: Rect,
    pub new_text: String,
    pub adjusted_rect: Rect,
    pub formatting: FormattingProfile,
}

/// Edits applied to a single page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRegions {
    pub hidden: Vec<Rect>,
    pub replaced: Vec<ReplacementRecord>,
}

/// Something to test against the hidden regions of a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    /// Hidden if any region contains the point (edges included)
    Point(Point),
    /// Hidden if any region overlaps the rectangle
    Rect(Rect),
}

impl From<Point> for HitTarget {
    fn from(point: Point) -> Self {
        HitTarget::Point(point)
    }
}

impl From<Rect> for HitTarget {
    fn from(rect: Rect) -> Self {
        HitTarget::Rect(rect)
    }
}

/// Hidden and replaced regions for every edited page of one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionRegistry {
    pages: HashMap<u16, PageRegions>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a rectangle as hidden. Duplicates are kept.
    pub fn mark_hidden(&mut self, page: u16, rect: Rect) {
        log::debug!("page {page}: hiding {rect:?}");
        self.pages.entry(page).or_default().hidden.push(rect);
    }

    pub fn record_replacement(
        &mut self,
        page: u16,
        original_rect: Rect,
        new_text: impl Into<String>,
        adjusted_rect: Rect,
        formatting: FormattingProfile,
    ) {
        self.pages
            .entry(page)
            .or_default()
            .replaced
            .push(ReplacementRecord {
                original_rect,
                new_text: new_text.into(),
                adjusted_rect,
                formatting,
            });
    }

    pub fn is_hidden(&self, page: u16, target: impl Into<HitTarget>) -> bool {
        let Some(regions) = self.pages.get(&page) else {
            return false;
        };
        match target.into() {
            HitTarget::Point(point) => regions.hidden.iter().any(|r| r.contains_point(&point)),
            HitTarget::Rect(rect) => regions.hidden.iter().any(|r| r.intersects(&rect)),
        }
    }

    pub fn is_point_hidden(&self, page: u16, point: Point) -> bool {
        self.is_hidden(page, HitTarget::Point(point))
    }

    pub fn is_rect_hidden(&self, page: u16, rect: &Rect) -> bool {
        self.is_hidden(page, HitTarget::Rect(*rect))
    }

    /// Drop hidden content from a page's text structure
    ///
    /// A span is dropped when its box touches a hidden region; a line survives
    /// while it keeps a span and a text block while it keeps a line. Image
    /// blocks are passed through untouched.
    pub fn filtered_text_blocks(&self, page: u16, blocks: Vec<TextBlock>) -> Vec<TextBlock> {
        if self.is_page_clean(page) {
            return blocks;
        }

        blocks
            .into_iter()
            .filter_map(|block| match block {
                TextBlock::Image { .. } => Some(block),
                TextBlock::Text { bbox, lines } => {
                    if self.is_rect_hidden(page, &bbox) {
                        return None;
                    }
                    let lines: Vec<TextLine> = lines
                        .into_iter()
                        .filter(|line| !self.is_rect_hidden(page, &line.bbox))
                        .filter_map(|mut line| {
                            line.spans.retain(|span| !self.is_rect_hidden(page, &span.bbox));
                            (!line.spans.is_empty()).then_some(line)
                        })
                        .collect();
                    (!lines.is_empty()).then_some(TextBlock::Text { bbox, lines })
                }
            })
            .collect()
    }

    /// Drop words whose box touches a hidden region
    pub fn filtered_words(&self, page: u16, words: Vec<Word>) -> Vec<Word> {
        if self.is_page_clean(page) {
            return words;
        }
        words
            .into_iter()
            .filter(|word| !self.is_rect_hidden(page, &word.rect))
            .collect()
    }

    pub fn clear_page(&mut self, page: u16) {
        if self.pages.remove(&page).is_some() {
            log::debug!("page {page}: cleared region registry");
        }
    }

    pub fn clear_all(&mut self) {
        self.pages.clear();
    }

    pub fn hidden_regions(&self, page: u16) -> &[Rect] {
        self.pages
            .get(&page)
            .map(|r| r.hidden.as_slice())
            .unwrap_or(&[])
    }

    pub fn replacements(&self, page: u16) -> &[ReplacementRecord] {
        self.pages
            .get(&page)
            .map(|r| r.replaced.as_slice())
            .unwrap_or(&[])
    }

    /// Indexes of pages carrying at least one edit, ascending
    pub fn pages_with_edits(&self) -> Vec<u16> {
        let mut pages: Vec<u16> = self
            .pages
            .iter()
            .filter(|(_, r)| !r.hidden.is_empty() || !r.replaced.is_empty())
            .map(|(page, _)| *page)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn is_page_clean(&self, page: u16) -> bool {
        self.pages
            .get(&page)
            .map_or(true, |r| r.hidden.is_empty() && r.replaced.is_empty())
    }
}
