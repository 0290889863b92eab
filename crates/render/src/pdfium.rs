//! PDFium-backed document engine
//!
//! Overlays are written straight into the page: filled rectangles and glyph
//! runs become page objects, while highlights and sticky notes become
//! annotations. Each overlay is tracked by the index range it occupies so it
//! can be deleted again; ranges after a deleted overlay shift down.

use crate::layout::{build_blocks, build_words, to_document_rect, wrap_text, CharRecord};
use image::RgbaImage;
use pdf_retouch_core::{
    AnnotationHandle, BuiltinFont, DocumentEngine, EngineError, EngineResult, FreeTextStyle,
    Point, Rect, Rgb, TextBlock, Word,
};
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Opacity of highlight annotations
const HIGHLIGHT_ALPHA: u8 = 96;

/// Inner padding of free-text boxes, in points
const FREE_TEXT_PADDING: f32 = 2.0;

/// Side of the clickable square of a sticky note, in points
const NOTE_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// `count` consecutive page objects starting at `first`
    Objects { first: usize, count: usize },
    /// One entry of the page's annotation list
    Annotation { index: usize },
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    handle: AnnotationHandle,
    slot: Slot,
}

/// A PDF document opened through PDFium
pub struct PdfiumEngine {
    document: PdfDocument<'static>,
    overlays: HashMap<u16, Vec<Tracked>>,
}

/// Bind the PDFium library
///
/// Search order: the executable's directory, the working directory, then
/// the system library paths.
fn init_pdfium() -> EngineResult<Pdfium> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    if let Some(ref dir) = exe_dir {
        if let Ok(bindings) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        {
            return Ok(Pdfium::new(bindings));
        }
    }

    Ok(Pdfium::new(
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| EngineError::Backend(format!("failed to bind PDFium: {e}")))?,
    ))
}

fn pdf_color(color: Rgb, alpha: u8) -> PdfColor {
    let (r, g, b) = color.to_u8();
    PdfColor::new(r, g, b, alpha)
}

fn builtin(font: BuiltinFont) -> PdfFontBuiltin {
    match font {
        BuiltinFont::TimesRoman => PdfFontBuiltin::TimesRoman,
        BuiltinFont::TimesBold => PdfFontBuiltin::TimesBold,
        BuiltinFont::TimesItalic => PdfFontBuiltin::TimesItalic,
        BuiltinFont::TimesBoldItalic => PdfFontBuiltin::TimesBoldItalic,
        BuiltinFont::Helvetica => PdfFontBuiltin::Helvetica,
        BuiltinFont::HelveticaBold => PdfFontBuiltin::HelveticaBold,
        BuiltinFont::HelveticaOblique => PdfFontBuiltin::HelveticaOblique,
        BuiltinFont::HelveticaBoldOblique => PdfFontBuiltin::HelveticaBoldOblique,
        BuiltinFont::Courier => PdfFontBuiltin::Courier,
        BuiltinFont::CourierBold => PdfFontBuiltin::CourierBold,
        BuiltinFont::CourierOblique => PdfFontBuiltin::CourierOblique,
        BuiltinFont::CourierBoldOblique => PdfFontBuiltin::CourierBoldOblique,
        BuiltinFont::Symbol => PdfFontBuiltin::Symbol,
        BuiltinFont::ZapfDingbats => PdfFontBuiltin::ZapfDingbats,
    }
}

/// Document-space rectangle to a PDF-space one (bottom-left origin)
fn pdf_rect(rect: &Rect, page_height: f32) -> PdfRect {
    PdfRect::new_from_values(
        page_height - rect.y1, // bottom
        rect.x0,               // left
        page_height - rect.y0, // top
        rect.x1,               // right
    )
}

/// Shift the slots that followed `removed` down over the gap it left
fn release_slot(tracked: &mut [Tracked], removed: Slot) {
    for t in tracked.iter_mut() {
        match (&mut t.slot, removed) {
            (Slot::Objects { first: other, .. }, Slot::Objects { first, count })
                if *other > first =>
            {
                *other -= count;
            }
            (Slot::Annotation { index: other }, Slot::Annotation { index }) if *other > index => {
                *other -= 1;
            }
            _ => {}
        }
    }
}

fn edit_error(page: u16) -> impl Fn(PdfiumError) -> EngineError {
    move |e| EngineError::Edit {
        page,
        message: e.to_string(),
    }
}

impl PdfiumEngine {
    fn with_document(document: PdfDocument<'static>) -> Self {
        let mut engine = Self {
            document,
            overlays: HashMap::new(),
        };
        engine.track_existing_annotations();
        engine
    }

    /// Register annotations already present in the file so undo can strip them
    fn track_existing_annotations(&mut self) {
        for (index, page) in self.document.pages().iter().enumerate() {
            let count = page.annotations().len();
            if count == 0 {
                continue;
            }
            let tracked = (0..count)
                .map(|index| Tracked {
                    handle: AnnotationHandle::new(),
                    slot: Slot::Annotation { index },
                })
                .collect();
            self.overlays.insert(index as u16, tracked);
        }
    }

    fn check_page(&self, page: u16) -> EngineResult<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(EngineError::PageOutOfRange { page, page_count });
        }
        Ok(())
    }

    fn page(&self, page: u16) -> EngineResult<PdfPage<'static>> {
        self.check_page(page)?;
        self.document
            .pages()
            .get(page)
            .map_err(|e| EngineError::Backend(e.to_string()))
    }

    fn track(&mut self, page: u16, slot: Slot) -> AnnotationHandle {
        let handle = AnnotationHandle::new();
        self.overlays
            .entry(page)
            .or_default()
            .push(Tracked { handle, slot });
        handle
    }

    /// Characters of the page in document space
    fn char_records(&self, page: u16) -> EngineResult<Vec<CharRecord>> {
        let pdf_page = self.page(page)?;
        let height = pdf_page.height().value;
        let text = pdf_page
            .text()
            .map_err(|e| EngineError::Backend(format!("failed to get text page: {e}")))?;

        let mut records = Vec::new();
        for ch in text.chars().iter() {
            let Some(c) = ch.unicode_char() else {
                continue;
            };
            let bounds = ch.loose_bounds().ok().map(|b| {
                to_document_rect(
                    b.left().value,
                    b.bottom().value,
                    b.right().value,
                    b.top().value,
                    height,
                )
            });
            let color = ch
                .fill_color()
                .map(|fill| Rgb::from_u8(fill.red(), fill.green(), fill.blue()))
                .unwrap_or(Rgb::BLACK);

            records.push(CharRecord {
                ch: c,
                bounds,
                font: ch.font_name(),
                size: ch.scaled_font_size().value,
                color,
            });
        }
        Ok(records)
    }

    /// Add one glyph run to `page_obj`
    fn push_text_object(
        &self,
        page_obj: &mut PdfPage<'static>,
        page: u16,
        origin: Point,
        text: &str,
        font: PdfFontToken,
        font_size: f32,
        color: Rgb,
    ) -> EngineResult<()> {
        let height = page_obj.height().value;
        let mut object =
            PdfPageTextObject::new(&self.document, text, font, PdfPoints::new(font_size))
                .map_err(edit_error(page))?;
        object
            .translate(PdfPoints::new(origin.x), PdfPoints::new(height - origin.y))
            .map_err(edit_error(page))?;
        object
            .set_fill_color(pdf_color(color, 255))
            .map_err(edit_error(page))?;
        page_obj
            .objects_mut()
            .add_text_object(object)
            .map_err(edit_error(page))?;
        Ok(())
    }

    /// Run `draw` against the page and track the objects it appended
    fn with_new_objects<F>(&mut self, page: u16, draw: F) -> EngineResult<AnnotationHandle>
    where
        F: FnOnce(&Self, &mut PdfPage<'static>) -> EngineResult<()>,
    {
        let mut page_obj = self.page(page)?;
        let first = page_obj.objects().len();
        draw(self, &mut page_obj)?;
        page_obj.regenerate_content().map_err(edit_error(page))?;
        let count = page_obj.objects().len().saturating_sub(first);

        log::debug!("page {page}: added {count} object(s) at index {first}");
        Ok(self.track(page, Slot::Objects { first, count }))
    }
}

impl DocumentEngine for PdfiumEngine {
    fn open(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::Open(format!(
                "file does not exist: {}",
                path.display()
            )));
        }
        let pdfium = Box::leak(Box::new(init_pdfium()?));
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| EngineError::Open(e.to_string()))?;

        log::info!(
            "opened {} ({} pages)",
            path.display(),
            document.pages().len()
        );
        Ok(Self::with_document(document))
    }

    fn page_count(&self) -> u16 {
        self.document.pages().len()
    }

    fn page_bounds(&self, page: u16) -> EngineResult<Rect> {
        let pdf_page = self.page(page)?;
        Ok(Rect::new(
            0.0,
            0.0,
            pdf_page.width().value,
            pdf_page.height().value,
        ))
    }

    fn text_structure(&self, page: u16) -> EngineResult<Vec<TextBlock>> {
        Ok(build_blocks(&self.char_records(page)?))
    }

    fn words(&self, page: u16) -> EngineResult<Vec<Word>> {
        Ok(build_words(&self.char_records(page)?))
    }

    fn textbox(&self, page: u16, rect: &Rect) -> EngineResult<String> {
        let pdf_page = self.page(page)?;
        let height = pdf_page.height().value;
        let text = pdf_page
            .text()
            .map_err(|e| EngineError::Backend(format!("failed to get text page: {e}")))?;
        Ok(text.inside_rect(pdf_rect(rect, height)))
    }

    fn render(&self, page: u16, scale: f32) -> EngineResult<RgbaImage> {
        if scale <= 0.0 {
            return Err(EngineError::Render {
                page,
                message: format!("invalid scale {scale}"),
            });
        }
        let pdf_page = self.page(page)?;
        let render_error = |message: String| EngineError::Render { page, message };

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| render_error(e.to_string()))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes().to_vec())
            .ok_or_else(|| render_error(format!("bitmap size mismatch ({width}x{height})")))
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
        self.check_page(page)?;
        let token = self.document.fonts_mut().new_built_in(builtin(font));
        self.with_new_objects(page, |engine, page_obj| {
            engine.push_text_object(page_obj, page, origin, text, token, font_size, color)
        })
    }

    fn insert_free_text(
        &mut self,
        page: u16,
        rect: &Rect,
        text: &str,
        style: &FreeTextStyle,
    ) -> EngineResult<AnnotationHandle> {
        self.check_page(page)?;
        let token = self.document.fonts_mut().new_built_in(builtin(style.font));

        let size = style.font_size;
        let inner_width = (rect.width() - 2.0 * FREE_TEXT_PADDING).max(size);
        let max_chars = (inner_width / (size * 0.5)).floor() as usize;
        let lines = wrap_text(text, max_chars);
        let line_height = size * 1.2;

        self.with_new_objects(page, |engine, page_obj| {
            let height = page_obj.height().value;
            page_obj
                .objects_mut()
                .create_path_object_rect(
                    pdf_rect(rect, height),
                    Some(pdf_color(style.border_color, 255)),
                    Some(PdfPoints::new(0.5)),
                    Some(pdf_color(style.fill_color, 255)),
                )
                .map_err(edit_error(page))?;

            for (i, line) in lines.iter().enumerate() {
                let baseline = rect.y0 + FREE_TEXT_PADDING + size * 0.8 + i as f32 * line_height;
                if baseline > rect.y1 {
                    log::debug!("page {page}: free text clipped after {i} line(s)");
                    break;
                }
                if line.is_empty() {
                    continue;
                }
                let origin = Point::new(rect.x0 + FREE_TEXT_PADDING, baseline);
                engine.push_text_object(page_obj, page, origin, line, token, size, style.text_color)?;
            }
            Ok(())
        })
    }

    fn draw_filled_rect(
        &mut self,
        page: u16,
        rect: &Rect,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle> {
        self.with_new_objects(page, |_, page_obj| {
            let height = page_obj.height().value;
            page_obj
                .objects_mut()
                .create_path_object_rect(
                    pdf_rect(rect, height),
                    None,
                    None,
                    Some(pdf_color(color, 255)),
                )
                .map_err(edit_error(page))?;
            Ok(())
        })
    }

    fn add_highlight(
        &mut self,
        page: u16,
        rect: &Rect,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle> {
        let mut page_obj = self.page(page)?;
        let bounds = pdf_rect(rect, page_obj.height().value);
        let index = page_obj.annotations().len();

        let mut highlight = page_obj
            .annotations_mut()
            .create_highlight_annotation()
            .map_err(edit_error(page))?;
        highlight.set_bounds(bounds).map_err(edit_error(page))?;
        highlight
            .attachment_points_mut()
            .create_attachment_point_at_end(PdfQuadPoints::from_rect(&bounds))
            .map_err(edit_error(page))?;
        highlight
            .set_stroke_color(pdf_color(color, HIGHLIGHT_ALPHA))
            .map_err(edit_error(page))?;

        log::debug!("page {page}: added highlight at annotation index {index}");
        Ok(self.track(page, Slot::Annotation { index }))
    }

    fn add_note(
        &mut self,
        page: u16,
        anchor: Point,
        content: &str,
    ) -> EngineResult<AnnotationHandle> {
        let mut page_obj = self.page(page)?;
        let height = page_obj.height().value;
        let index = page_obj.annotations().len();

        let mut note = page_obj
            .annotations_mut()
            .create_text_annotation(content)
            .map_err(edit_error(page))?;
        let bounds = Rect::new(anchor.x, anchor.y, anchor.x + NOTE_SIZE, anchor.y + NOTE_SIZE);
        note.set_bounds(pdf_rect(&bounds, height))
            .map_err(edit_error(page))?;

        log::debug!("page {page}: added note at annotation index {index}");
        Ok(self.track(page, Slot::Annotation { index }))
    }

    fn list_annotations(&self, page: u16) -> EngineResult<Vec<AnnotationHandle>> {
        self.check_page(page)?;
        Ok(self
            .overlays
            .get(&page)
            .map(|tracked| tracked.iter().map(|t| t.handle).collect())
            .unwrap_or_default())
    }

    fn delete_annotation(&mut self, page: u16, handle: AnnotationHandle) -> EngineResult<()> {
        let mut page_obj = self.page(page)?;
        let tracked = self
            .overlays
            .get_mut(&page)
            .ok_or(EngineError::AnnotationNotFound(handle))?;
        let position = tracked
            .iter()
            .position(|t| t.handle == handle)
            .ok_or(EngineError::AnnotationNotFound(handle))?;
        let removed = tracked.remove(position);

        match removed.slot {
            Slot::Objects { first, count } => {
                for index in (first..first + count).rev() {
                    page_obj
                        .objects_mut()
                        .remove_object_at_index(index)
                        .map_err(edit_error(page))?;
                }
                page_obj.regenerate_content().map_err(edit_error(page))?;
            }
            Slot::Annotation { index } => {
                let annotation = page_obj
                    .annotations()
                    .get(index)
                    .map_err(edit_error(page))?;
                page_obj
                    .annotations_mut()
                    .delete_annotation(annotation)
                    .map_err(edit_error(page))?;
            }
        }
        release_slot(tracked, removed.slot);

        log::debug!("page {page}: deleted overlay {handle}");
        Ok(())
    }

    fn save(&mut self, path: &Path) -> EngineResult<()> {
        self.document
            .save_to_file(path)
            .map_err(|e| EngineError::Save(e.to_string()))?;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_rect_flips_y() {
        let rect = pdf_rect(&Rect::new(100.0, 100.0, 200.0, 120.0), 792.0);
        assert_eq!(rect.bottom().value, 672.0);
        assert_eq!(rect.top().value, 692.0);
        assert_eq!(rect.left().value, 100.0);
        assert_eq!(rect.right().value, 200.0);
    }

    #[test]
    fn test_pdf_rect_round_trips_through_layout() {
        let original = Rect::new(36.0, 50.5, 300.0, 80.0);
        let rect = pdf_rect(&original, 842.0);
        let back = to_document_rect(
            rect.left().value,
            rect.bottom().value,
            rect.right().value,
            rect.top().value,
            842.0,
        );
        assert_eq!(back, original);
    }

    #[test]
    fn test_pdf_color_scales_components() {
        let color = pdf_color(Rgb::new(1.0, 0.5, 0.0), HIGHLIGHT_ALPHA);
        assert_eq!(color.red(), 255);
        assert_eq!(color.green(), 128);
        assert_eq!(color.blue(), 0);
        assert_eq!(color.alpha(), HIGHLIGHT_ALPHA);
    }

    fn tracked(slots: &[Slot]) -> Vec<Tracked> {
        slots
            .iter()
            .map(|&slot| Tracked {
                handle: AnnotationHandle::new(),
                slot,
            })
            .collect()
    }

    #[test]
    fn test_release_slot_shifts_only_later_entries_of_same_kind() {
        let mut remaining = tracked(&[
            Slot::Objects { first: 0, count: 2 },
            Slot::Objects { first: 5, count: 1 },
            Slot::Annotation { index: 0 },
            Slot::Annotation { index: 2 },
        ]);
        release_slot(&mut remaining, Slot::Objects { first: 2, count: 3 });
        let slots: Vec<Slot> = remaining.iter().map(|t| t.slot).collect();
        assert_eq!(
            slots,
            vec![
                Slot::Objects { first: 0, count: 2 },
                Slot::Objects { first: 2, count: 1 },
                Slot::Annotation { index: 0 },
                Slot::Annotation { index: 2 },
            ]
        );

        release_slot(&mut remaining, Slot::Annotation { index: 1 });
        assert_eq!(remaining[2].slot, Slot::Annotation { index: 0 });
        assert_eq!(remaining[3].slot, Slot::Annotation { index: 1 });
        assert_eq!(remaining[1].slot, Slot::Objects { first: 2, count: 1 });
    }

    #[test]
    fn test_highlight_is_a_page_annotation() {
        let pdfium = match init_pdfium() {
            Ok(p) => Box::leak(Box::new(p)),
            Err(e) => {
                eprintln!("Skipping test - pdfium not available: {e}");
                return;
            }
        };
        let mut document = pdfium.create_new_pdf().unwrap();
        document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .unwrap();
        let mut engine = PdfiumEngine::with_document(document);
        let objects_before = engine.page(0).unwrap().objects().len();

        let first = engine
            .add_highlight(0, &Rect::new(100.0, 100.0, 200.0, 120.0), Rgb::YELLOW)
            .unwrap();
        let second = engine
            .add_highlight(0, &Rect::new(100.0, 140.0, 200.0, 160.0), Rgb::YELLOW)
            .unwrap();

        let page = engine.page(0).unwrap();
        assert_eq!(page.objects().len(), objects_before);
        assert_eq!(page.annotations().len(), 2);
        for annotation in page.annotations().iter() {
            assert_eq!(annotation.annotation_type(), PdfPageAnnotationType::Highlight);
        }
        assert_eq!(engine.list_annotations(0).unwrap(), vec![first, second]);

        engine.delete_annotation(0, first).unwrap();
        assert_eq!(engine.page(0).unwrap().annotations().len(), 1);
        engine.delete_annotation(0, second).unwrap();
        assert_eq!(engine.page(0).unwrap().annotations().len(), 0);
        assert!(engine.list_annotations(0).unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let err = PdfiumEngine::open(Path::new("/nonexistent/input.pdf"))
            .err()
            .expect("missing file must not open");
        assert!(err.to_string().contains("file does not exist"));
    }
}
