//! PDF Retouch Render Library
//!
//! PDFium implementation of the editing core's document engine, plus the
//! character grouping that turns PDFium's flat text layer into blocks,
//! lines, spans and words.

pub mod layout;
pub mod pdfium;

pub use layout::{build_blocks, build_words, wrap_text, CharRecord};
pub use pdfium::PdfiumEngine;
