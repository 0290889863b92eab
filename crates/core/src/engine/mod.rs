//! Document engine contract
//!
//! The editing core never touches PDF bytes directly. Everything it needs from
//! a page (text structure, words, rendering, overlay insertion) goes through
//! [`DocumentEngine`], one open document per engine value.

pub mod memory;

use crate::geometry::{Point, Rect};
use crate::text::{Rgb, TextBlock, Word};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Identifier of an engine-level overlay or annotation on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationHandle(Uuid);

impl AnnotationHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnnotationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The standard 14 PDF fonts every engine can draw without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinFont {
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl BuiltinFont {
    /// PostScript name of the font
    pub fn postscript_name(&self) -> &'static str {
        match self {
            BuiltinFont::TimesRoman => "Times-Roman",
            BuiltinFont::TimesBold => "Times-Bold",
            BuiltinFont::TimesItalic => "Times-Italic",
            BuiltinFont::TimesBoldItalic => "Times-BoldItalic",
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
            BuiltinFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            BuiltinFont::Courier => "Courier",
            BuiltinFont::CourierBold => "Courier-Bold",
            BuiltinFont::CourierOblique => "Courier-Oblique",
            BuiltinFont::CourierBoldOblique => "Courier-BoldOblique",
            BuiltinFont::Symbol => "Symbol",
            BuiltinFont::ZapfDingbats => "ZapfDingbats",
        }
    }
}

impl Default for BuiltinFont {
    fn default() -> Self {
        BuiltinFont::Helvetica
    }
}

/// Parameters of a free-text box overlay
#[derive(Debug, Clone, PartialEq)]
pub struct FreeTextStyle {
    pub font: BuiltinFont,
    pub font_size: f32,
    pub text_color: Rgb,
    pub fill_color: Rgb,
    pub border_color: Rgb,
}

/// Errors raised by a document engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u16, page_count: u16 },
    #[error("failed to render page {page}: {message}")]
    Render { page: u16, message: String },
    #[error("failed to modify page {page}: {message}")]
    Edit { page: u16, message: String },
    #[error("annotation {0} not found")]
    AnnotationNotFound(AnnotationHandle),
    #[error("failed to save document: {0}")]
    Save(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// One open PDF document
///
/// Rectangles and points are in document space (top-left origin, points).
/// Implementations translate to their own coordinate conventions.
pub trait DocumentEngine {
    /// Open the document stored at `path`
    fn open(path: &Path) -> EngineResult<Self>
    where
        Self: Sized;

    fn page_count(&self) -> u16;

    /// Page rectangle, always anchored at (0, 0)
    fn page_bounds(&self, page: u16) -> EngineResult<Rect>;

    /// Hierarchical text layout of the page in document order
    fn text_structure(&self, page: u16) -> EngineResult<Vec<TextBlock>>;

    /// Flat word list of the page in document order
    fn words(&self, page: u16) -> EngineResult<Vec<Word>>;

    /// Text whose glyphs fall inside `rect`
    fn textbox(&self, page: u16, rect: &Rect) -> EngineResult<String>;

    /// Rasterize the page at `scale` pixels per point
    fn render(&self, page: u16, scale: f32) -> EngineResult<RgbaImage>;

    /// Draw a glyph run with its baseline starting at `origin`
    fn insert_text(
        &mut self,
        page: u16,
        origin: Point,
        text: &str,
        font: BuiltinFont,
        font_size: f32,
        color: Rgb,
    ) -> EngineResult<AnnotationHandle>;

    /// Place a boxed, wrapped text block filling `rect`
    fn insert_free_text(
        &mut self,
        page: u16,
        rect: &Rect,
        text: &str,
        style: &FreeTextStyle,
    ) -> EngineResult<AnnotationHandle>;

    /// Paint an opaque rectangle
    fn draw_filled_rect(&mut self, page: u16, rect: &Rect, color: Rgb)
        -> EngineResult<AnnotationHandle>;

    fn add_highlight(&mut self, page: u16, rect: &Rect, color: Rgb)
        -> EngineResult<AnnotationHandle>;

    /// Attach a sticky note anchored at `anchor`
    fn add_note(&mut self, page: u16, anchor: Point, content: &str)
        -> EngineResult<AnnotationHandle>;

    /// Every overlay and annotation currently on the page
    fn list_annotations(&self, page: u16) -> EngineResult<Vec<AnnotationHandle>>;

    fn delete_annotation(&mut self, page: u16, handle: AnnotationHandle) -> EngineResult<()>;

    fn save(&mut self, path: &Path) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::PageOutOfRange { page: 5, page_count: 3 };
        assert_eq!(err.to_string(), "page 5 out of range (page_count=3)");

        let err = EngineError::Edit {
            page: 0,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "failed to modify page 0: boom");
    }

    #[test]
    fn test_annotation_handles_are_unique() {
        assert_ne!(AnnotationHandle::new(), AnnotationHandle::new());
    }

    #[test]
    fn test_builtin_font_names() {
        assert_eq!(BuiltinFont::default().postscript_name(), "Helvetica");
        assert_eq!(BuiltinFont::TimesBoldItalic.postscript_name(), "Times-BoldItalic");
    }
}
