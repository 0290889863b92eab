//! Editing session
//!
//! [`EditorSession`] owns everything tied to one open document: the engine,
//! the region registry, the current selection, the drag gesture, the zoom
//! and the current page. Pointer input arrives in screen pixels and is
//! converted to document space at the current zoom.

use crate::config::EditorConfig;
use crate::editor::{check_page, EditOutcome, RegionEditor, StyleOverrides};
use crate::engine::{AnnotationHandle, DocumentEngine};
use crate::error::{CoreError, CoreResult};
use crate::formatting::{FormattingAnalyzer, FormattingProfile};
use crate::geometry::{CoordinateConverter, Point};
use crate::metrics::TextDimensionEstimator;
use crate::registry::RegionRegistry;
use crate::selection::{Gesture, HitTester, Selection};
use crate::text::{blocks_to_text, Rgb};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a completed drag does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Select,
    Highlight,
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum PointerRelease {
    /// No drag was in progress, or the drag selected nothing
    Nothing,
    Selected(Selection),
    Highlighted(AnnotationHandle),
}

/// Zoom applied on open, clamped to the configured range and kept positive
fn initial_zoom(config: &EditorConfig) -> f32 {
    let zoom = config.clamp_zoom(config.zoom_default);
    if zoom > 0.0 && zoom.is_finite() {
        zoom
    } else {
        log::warn!("unusable default zoom {}, using 1.0", config.zoom_default);
        1.0
    }
}

/// One open document and its editing state
pub struct EditorSession<E: DocumentEngine> {
    config: EditorConfig,
    editor: RegionEditor,
    hit_tester: HitTester,
    document: Option<E>,
    path: Option<PathBuf>,
    registry: RegionRegistry,
    selection: Option<Selection>,
    gesture: Gesture,
    mode: InteractionMode,
    converter: CoordinateConverter,
    current_page: u16,
}

impl<E: DocumentEngine> Default for EditorSession<E> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl<E: DocumentEngine> EditorSession<E> {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            editor: RegionEditor::new(config.clone()),
            hit_tester: HitTester::new(config.probe_radius),
            converter: CoordinateConverter::new(initial_zoom(&config)),
            config,
            document: None,
            path: None,
            registry: RegionRegistry::new(),
            selection: None,
            gesture: Gesture::Idle,
            mode: InteractionMode::Select,
            current_page: 0,
        }
    }

    /// Open the document at `path`, replacing any open one
    pub fn open(&mut self, path: &Path) -> CoreResult<()> {
        let engine = E::open(path)?;
        self.load(engine);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Take ownership of an already opened document
    ///
    /// Edits recorded for a previous document are discarded.
    pub fn load(&mut self, engine: E) {
        log::info!("loaded document with {} pages", engine.page_count());
        self.document = Some(engine);
        self.path = None;
        self.reset_state();
    }

    /// Close the document, handing the engine back
    pub fn close(&mut self) -> Option<E> {
        self.path = None;
        self.reset_state();
        self.document.take()
    }

    fn reset_state(&mut self) {
        self.registry.clear_all();
        self.selection = None;
        self.gesture.cancel();
        self.current_page = 0;
        self.converter.set_scale(initial_zoom(&self.config));
    }

    pub fn save(&mut self, path: &Path) -> CoreResult<()> {
        self.document_mut()?.save(path)?;
        log::info!("saved document to {}", path.display());
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> CoreResult<&E> {
        self.document.as_ref().ok_or(CoreError::NoDocumentLoaded)
    }

    fn document_mut(&mut self) -> CoreResult<&mut E> {
        self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)
    }

    /// Path the document was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.gesture.cancel();
    }

    pub fn zoom(&self) -> f32 {
        self.converter.scale()
    }

    pub fn converter(&self) -> CoordinateConverter {
        self.converter
    }

    pub fn current_page(&self) -> u16 {
        self.current_page
    }

    pub fn page_count(&self) -> CoreResult<u16> {
        Ok(self.document()?.page_count())
    }

    // --- Navigation ---

    pub fn go_to_page(&mut self, page: u16) -> CoreResult<()> {
        check_page(self.document()?, page)?;
        self.current_page = page;
        self.selection = None;
        self.gesture.cancel();
        log::debug!("current page {page}");
        Ok(())
    }

    /// Move to the next page. Returns false on the last page.
    pub fn next_page(&mut self) -> CoreResult<bool> {
        let count = self.page_count()?;
        if self.current_page + 1 >= count {
            return Ok(false);
        }
        self.go_to_page(self.current_page + 1)?;
        Ok(true)
    }

    /// Move to the previous page. Returns false on the first page.
    pub fn prev_page(&mut self) -> CoreResult<bool> {
        self.document()?;
        if self.current_page == 0 {
            return Ok(false);
        }
        self.go_to_page(self.current_page - 1)?;
        Ok(true)
    }

    // --- Zoom ---

    /// Set the zoom, clamped to the configured range. Returns the new zoom.
    pub fn set_zoom(&mut self, zoom: f32) -> CoreResult<f32> {
        self.document()?;
        if !zoom.is_finite() {
            return Err(CoreError::MalformedInput(format!("zoom {zoom}")));
        }
        let zoom = self.config.clamp_zoom(zoom);
        if zoom != self.converter.scale() {
            self.converter.set_scale(zoom);
            self.selection = None;
            self.gesture.cancel();
            log::debug!("zoom {:.0}%", zoom * 100.0);
        }
        Ok(zoom)
    }

    pub fn zoom_in(&mut self) -> CoreResult<f32> {
        self.set_zoom(self.zoom() + self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> CoreResult<f32> {
        self.set_zoom(self.zoom() - self.config.zoom_step)
    }

    // --- Pointer input (screen pixels) ---

    /// Begin a drag on the current page
    pub fn pointer_down(&mut self, px: f32, py: f32) -> CoreResult<()> {
        self.document()?;
        let start = self.converter.screen_to_document(px, py);
        self.gesture.press(self.current_page, start);
        Ok(())
    }

    /// Finish a drag: select its text or highlight it, depending on the mode
    pub fn pointer_up(&mut self, px: f32, py: f32) -> CoreResult<PointerRelease> {
        self.document()?;
        let end = self.converter.screen_to_document(px, py);
        let Some((page, rect)) = self.gesture.release(end) else {
            return Ok(PointerRelease::Nothing);
        };

        match self.mode {
            InteractionMode::Select => {
                self.selection =
                    self.hit_tester
                        .select_region(self.document()?, &self.registry, page, &rect)?;
                Ok(self
                    .selection
                    .clone()
                    .map_or(PointerRelease::Nothing, PointerRelease::Selected))
            }
            InteractionMode::Highlight => {
                if rect.is_empty() {
                    return Ok(PointerRelease::Nothing);
                }
                let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
                let handle = self.editor.highlight_area(engine, page, &rect, None)?;
                Ok(PointerRelease::Highlighted(handle))
            }
        }
    }

    /// Select the word under the pointer
    ///
    /// On error the selection and any drag in flight are left as they were.
    pub fn double_click(&mut self, px: f32, py: f32) -> CoreResult<Option<Selection>> {
        let point = self.converter.screen_to_document(px, py);
        let word =
            self.hit_tester
                .select_word_at(self.document()?, &self.registry, self.current_page, point)?;
        self.gesture.cancel();
        self.selection = word;
        Ok(self.selection.clone())
    }

    /// True when the pointer is over visible text
    pub fn hover(&self, px: f32, py: f32) -> CoreResult<bool> {
        let point = self.converter.screen_to_document(px, py);
        self.hit_tester
            .is_over_text(self.document()?, &self.registry, self.current_page, point)
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn active_selection(&self) -> CoreResult<Selection> {
        self.selection
            .clone()
            .filter(Selection::is_valid)
            .ok_or(CoreError::EmptySelection)
    }

    // --- Edits on the selection ---

    /// Mask the selected text
    pub fn delete_selection(&mut self) -> CoreResult<()> {
        let selection = self.active_selection()?;
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        self.editor.hide_text_area(
            engine,
            &mut self.registry,
            selection.page_index,
            &selection.rect,
        )?;
        self.selection = None;
        Ok(())
    }

    /// Replace the selected text, keeping its style
    pub fn replace_selection(&mut self, new_text: &str) -> CoreResult<EditOutcome> {
        let selection = self.active_selection()?;
        if new_text.trim().is_empty() {
            return Err(CoreError::MalformedInput("empty replacement text".to_string()));
        }
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        let outcome = self.editor.replace_text_area(
            engine,
            &mut self.registry,
            selection.page_index,
            &selection.rect,
            new_text,
        )?;
        self.selection = None;
        Ok(outcome)
    }

    /// Redraw the selected text with a new size and/or color
    pub fn format_selection(
        &mut self,
        font_size: Option<f32>,
        color: Option<Rgb>,
    ) -> CoreResult<EditOutcome> {
        let selection = self.active_selection()?;
        if let Some(size) = font_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(CoreError::MalformedInput(format!("font size {size}")));
            }
        }
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        let outcome = self.editor.restyle_text_area(
            engine,
            &mut self.registry,
            selection.page_index,
            &selection.rect,
            &selection.text,
            StyleOverrides { font_size, color },
        )?;
        self.selection = None;
        Ok(outcome)
    }

    /// Highlight the selection in the configured color
    pub fn highlight_selection(&mut self) -> CoreResult<AnnotationHandle> {
        let selection = self.active_selection()?;
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        self.editor
            .highlight_area(engine, selection.page_index, &selection.rect, None)
    }

    /// Attach a note to the current page at a document-space point
    pub fn add_note(&mut self, anchor: Point, content: &str) -> CoreResult<AnnotationHandle> {
        let page = self.current_page;
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        self.editor.add_note(engine, page, anchor, content)
    }

    /// Draw new text on the current page at a document-space point
    pub fn insert_text_at(
        &mut self,
        origin: Point,
        text: &str,
        font_size: Option<f32>,
        color: Rgb,
    ) -> CoreResult<AnnotationHandle> {
        let page = self.current_page;
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        self.editor
            .insert_text_at(engine, page, origin, text, font_size, color)
    }

    /// Erase every edit on the current page. Returns the number of removed
    /// annotations.
    pub fn undo_current_page(&mut self) -> CoreResult<usize> {
        let page = self.current_page;
        let engine = self.document.as_mut().ok_or(CoreError::NoDocumentLoaded)?;
        let removed = self.editor.undo_page(engine, &mut self.registry, page)?;
        self.selection = None;
        Ok(removed)
    }

    // --- Queries ---

    /// Rasterize the current page at the current zoom
    pub fn render_current_page(&self) -> CoreResult<RgbaImage> {
        Ok(self
            .document()?
            .render(self.current_page, self.converter.scale())?)
    }

    /// Visible text of `page`, one line per text line
    pub fn extract_page_text(&self, page: u16) -> CoreResult<String> {
        let engine = self.document()?;
        check_page(engine, page)?;
        let blocks = self
            .registry
            .filtered_text_blocks(page, engine.text_structure(page)?);
        Ok(blocks_to_text(&blocks))
    }

    pub fn formatting_of_selection(&self) -> CoreResult<FormattingProfile> {
        let engine = self.document()?;
        let selection = self.active_selection()?;
        Ok(FormattingAnalyzer::analyze(
            engine,
            selection.page_index,
            &selection.rect,
        )?)
    }

    /// Estimated size of `text` drawn in the selection's style
    pub fn estimate_for_selection(&self, text: &str) -> CoreResult<(f32, f32)> {
        let profile = self.formatting_of_selection()?;
        Ok(TextDimensionEstimator::from_config(&self.config).estimate(text, &profile))
    }
}
