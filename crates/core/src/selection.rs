//! Selection and hit-testing over the visible text of a page
//!
//! Queries go through the [`RegionRegistry`] so text under a mask can be
//! neither selected nor hovered.

use crate::editor::check_page;
use crate::engine::DocumentEngine;
use crate::error::CoreResult;
use crate::geometry::{Point, Rect};
use crate::registry::RegionRegistry;
use serde::{Deserialize, Serialize};

/// Text the user picked on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub text: String,
    pub rect: Rect,
    pub page_index: u16,
}

impl Selection {
    /// A selection is usable only when it holds visible characters
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Drag-selection state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging { page: u16, start: Point },
}

impl Gesture {
    /// Start a drag at `start` (document space). Restarts any drag in flight.
    pub fn press(&mut self, page: u16, start: Point) {
        *self = Gesture::Dragging { page, start };
    }

    /// End the drag at `end`, returning its page and normalized rectangle
    pub fn release(&mut self, end: Point) -> Option<(u16, Rect)> {
        match std::mem::take(self) {
            Gesture::Dragging { page, start } => Some((page, Rect::from_corners(start, end))),
            Gesture::Idle => None,
        }
    }

    /// Drop a drag in flight, e.g. when the page or zoom changes
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            log::debug!("discarding drag in progress");
        }
        *self = Gesture::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Gesture::Dragging { .. })
    }
}

/// Hit-testing front-end over an engine and its registry
#[derive(Debug, Clone, Copy)]
pub struct HitTester {
    probe_radius: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self { probe_radius: 5.0 }
    }
}

impl HitTester {
    pub fn new(probe_radius: f32) -> Self {
        Self { probe_radius }
    }

    /// Probe rectangle used for word hits around `point`
    pub fn probe(&self, point: Point) -> Rect {
        Rect::around(point, self.probe_radius)
    }

    /// Select the text under `rect`, unless any of it is masked
    pub fn select_region<E: DocumentEngine>(
        &self,
        engine: &E,
        registry: &RegionRegistry,
        page: u16,
        rect: &Rect,
    ) -> CoreResult<Option<Selection>> {
        check_page(engine, page)?;
        if registry.is_rect_hidden(page, rect) {
            log::debug!("page {page}: {rect:?} overlaps a hidden region");
            return Ok(None);
        }

        let text = engine.textbox(page, rect)?;
        let selection = Selection {
            text: text.trim().to_string(),
            rect: *rect,
            page_index: page,
        };
        Ok(selection.is_valid().then_some(selection))
    }

    /// Select the first visible word under the probe around `point`
    pub fn select_word_at<E: DocumentEngine>(
        &self,
        engine: &E,
        registry: &RegionRegistry,
        page: u16,
        point: Point,
    ) -> CoreResult<Option<Selection>> {
        check_page(engine, page)?;
        let probe = self.probe(point);
        let words = registry.filtered_words(page, engine.words(page)?);

        Ok(words
            .into_iter()
            .find(|word| word.rect.intersects(&probe))
            .map(|word| Selection {
                text: word.text,
                rect: word.rect,
                page_index: page,
            })
            .filter(Selection::is_valid))
    }

    /// True when `point` is over visible text
    pub fn is_over_text<E: DocumentEngine>(
        &self,
        engine: &E,
        registry: &RegionRegistry,
        page: u16,
        point: Point,
    ) -> CoreResult<bool> {
        check_page(engine, page)?;
        if registry.is_point_hidden(page, point) {
            return Ok(false);
        }

        let blocks = registry.filtered_text_blocks(page, engine.text_structure(page)?);
        Ok(blocks.iter().filter(|b| b.is_text()).any(|block| {
            block.bbox().contains_point(&point)
                || block.lines().iter().any(|l| l.bbox.contains_point(&point))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{InMemoryEngine, MemoryPage};
    use crate::error::CoreError;
    use crate::text::Rgb;

    fn engine() -> InMemoryEngine {
        InMemoryEngine::new().with_page(
            MemoryPage::letter()
                .with_line(100.0, 100.0, "Invoice", "Helvetica", 12.0, Rgb::BLACK)
                .with_line(100.0, 200.0, "Total due", "Helvetica-Bold", 12.0, Rgb::BLACK)
                .with_image(Rect::new(300.0, 300.0, 400.0, 400.0)),
        )
    }

    #[test]
    fn test_gesture_machine() {
        let mut gesture = Gesture::default();
        assert_eq!(gesture.release(Point::new(1.0, 1.0)), None);

        gesture.press(0, Point::new(200.0, 120.0));
        assert!(gesture.is_dragging());
        let (page, rect) = gesture.release(Point::new(100.0, 100.0)).unwrap();
        assert_eq!(page, 0);
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 120.0));
        assert_eq!(gesture, Gesture::Idle);

        gesture.press(1, Point::new(0.0, 0.0));
        gesture.cancel();
        assert_eq!(gesture.release(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn test_select_region() {
        let engine = engine();
        let registry = RegionRegistry::new();
        let tester = HitTester::default();
        let rect = Rect::new(100.0, 100.0, 200.0, 120.0);

        let selection = tester
            .select_region(&engine, &registry, 0, &rect)
            .unwrap()
            .unwrap();
        assert_eq!(selection.text, "Invoice");
        assert_eq!(selection.rect, rect);
        assert_eq!(selection.page_index, 0);

        let empty = tester
            .select_region(&engine, &registry, 0, &Rect::new(10.0, 10.0, 50.0, 50.0))
            .unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_select_region_rejects_hidden() {
        let engine = engine();
        let mut registry = RegionRegistry::new();
        registry.mark_hidden(0, Rect::new(150.0, 90.0, 160.0, 130.0));
        let tester = HitTester::default();

        let selection = tester
            .select_region(&engine, &registry, 0, &Rect::new(100.0, 100.0, 200.0, 120.0))
            .unwrap();
        assert!(selection.is_none());
    }

    #[test]
    fn test_select_word_at() {
        let engine = engine();
        let mut registry = RegionRegistry::new();
        let tester = HitTester::default();

        let word = tester
            .select_word_at(&engine, &registry, 0, Point::new(120.0, 107.0))
            .unwrap()
            .unwrap();
        assert_eq!(word.text, "Invoice");

        // Probe reaches 5 points past the word's right edge
        let word = tester
            .select_word_at(&engine, &registry, 0, Point::new(146.0, 107.0))
            .unwrap()
            .unwrap();
        assert_eq!(word.text, "Invoice");

        registry.mark_hidden(0, Rect::new(99.0, 99.0, 143.0, 115.0));
        let word = tester
            .select_word_at(&engine, &registry, 0, Point::new(120.0, 107.0))
            .unwrap();
        assert!(word.is_none());
    }

    #[test]
    fn test_is_over_text() {
        let engine = engine();
        let mut registry = RegionRegistry::new();
        let tester = HitTester::default();

        assert!(tester
            .is_over_text(&engine, &registry, 0, Point::new(110.0, 205.0))
            .unwrap());
        assert!(!tester
            .is_over_text(&engine, &registry, 0, Point::new(350.0, 350.0))
            .unwrap());

        registry.mark_hidden(0, Rect::new(99.0, 199.0, 200.0, 216.0));
        assert!(!tester
            .is_over_text(&engine, &registry, 0, Point::new(110.0, 205.0))
            .unwrap());
    }

    #[test]
    fn test_out_of_range_page() {
        let engine = engine();
        let registry = RegionRegistry::new();
        let err = HitTester::default()
            .select_word_at(&engine, &registry, 2, Point::new(0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRegion { page: 2, .. }));
    }
}
