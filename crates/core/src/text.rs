//! Page text structure as reported by a document engine
//!
//! The hierarchy is blocks → lines → spans → glyphs, each level carrying its
//! own bounding rectangle in document space. Image blocks carry only a box.

use crate::geometry::Rect;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Span style flags, using the bit layout common to PDF text extractors
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StyleFlags: u32 {
        const SUPERSCRIPT = 1 << 0;
        const ITALIC = 1 << 1;
        const SERIF = 1 << 2;
        const MONOSPACE = 1 << 3;
        const BOLD = 1 << 4;
    }
}

impl StyleFlags {
    /// Guess style flags from a PostScript font name
    ///
    /// Used by engines that expose a font name but no descriptor flags.
    pub fn from_font_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let mut flags = StyleFlags::empty();
        if lower.contains("bold") || lower.contains("black") || lower.contains("heavy") {
            flags |= StyleFlags::BOLD;
        }
        if lower.contains("italic") || lower.contains("oblique") {
            flags |= StyleFlags::ITALIC;
        }
        if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            flags |= StyleFlags::SERIF;
        }
        if lower.contains("courier") || lower.contains("mono") {
            flags |= StyleFlags::MONOSPACE;
        }
        flags
    }
}

/// RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };
    pub const RED: Rgb = Rgb { r: 1.0, g: 0.0, b: 0.0 };
    pub const GREEN: Rgb = Rgb { r: 0.0, g: 1.0, b: 0.0 };
    pub const BLUE: Rgb = Rgb { r: 0.0, g: 0.0, b: 1.0 };
    pub const YELLOW: Rgb = Rgb { r: 1.0, g: 1.0, b: 0.0 };
    pub const ORANGE: Rgb = Rgb { r: 1.0, g: 0.5, b: 0.0 };
    pub const PINK: Rgb = Rgb { r: 1.0, g: 0.75, b: 0.8 };

    /// Create a color, clamping each component into `[0, 1]`
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Decode a packed `0xRRGGBB` sRGB value
    pub fn from_packed_srgb(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as f32 / 255.0,
            g: ((value >> 8) & 0xFF) as f32 / 255.0,
            b: (value & 0xFF) as f32 / 255.0,
        }
    }

    /// Create from 8-bit channels
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Convert to 8-bit channels
    pub fn to_u8(&self) -> (u8, u8, u8) {
        (
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        )
    }

    /// Look up one of the named palette colors offered by the editor
    pub fn named(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Rgb::BLACK),
            "white" => Some(Rgb::WHITE),
            "red" => Some(Rgb::RED),
            "green" => Some(Rgb::GREEN),
            "blue" => Some(Rgb::BLUE),
            "yellow" => Some(Rgb::YELLOW),
            "orange" => Some(Rgb::ORANGE),
            "pink" => Some(Rgb::PINK),
            _ => None,
        }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

/// Advance metrics of a single glyph inside a span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub width: f32,
}

/// Smallest styled run of text (one font, size and color)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub bbox: Rect,
    pub text: String,
    pub font: String,
    pub size: f32,
    pub flags: StyleFlags,
    pub color: Rgb,
    #[serde(default)]
    pub chars: Vec<Glyph>,
}

/// A line of spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub bbox: Rect,
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    /// Concatenated text of all spans in the line
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A block of page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextBlock {
    Text { bbox: Rect, lines: Vec<TextLine> },
    Image { bbox: Rect },
}

impl TextBlock {
    pub fn bbox(&self) -> Rect {
        match self {
            TextBlock::Text { bbox, .. } | TextBlock::Image { bbox } => *bbox,
        }
    }

    /// Lines of a text block; image blocks have none
    pub fn lines(&self) -> &[TextLine] {
        match self {
            TextBlock::Text { lines, .. } => lines,
            TextBlock::Image { .. } => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, TextBlock::Text { .. })
    }
}

/// A word with its bounding rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub rect: Rect,
    pub text: String,
}

impl Word {
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
        }
    }
}

/// Rebuild plain text from a block list, one line per text line
pub fn blocks_to_text(blocks: &[TextBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        for line in block.lines() {
            out.push_str(&line.text());
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_flags_from_font_name() {
        let flags = StyleFlags::from_font_name("Arial-BoldItalicMT");
        assert!(flags.contains(StyleFlags::BOLD));
        assert!(flags.contains(StyleFlags::ITALIC));

        let flags = StyleFlags::from_font_name("Courier");
        assert_eq!(flags, StyleFlags::MONOSPACE);

        let flags = StyleFlags::from_font_name("Times-Roman");
        assert_eq!(flags, StyleFlags::SERIF);

        assert!(StyleFlags::from_font_name("Helvetica").is_empty());
    }

    #[test]
    fn test_packed_srgb() {
        assert_eq!(Rgb::from_packed_srgb(0x000000), Rgb::BLACK);
        assert_eq!(Rgb::from_packed_srgb(0xFFFFFF), Rgb::WHITE);
        assert_eq!(Rgb::from_packed_srgb(0xFF0000), Rgb::RED);
        let c = Rgb::from_packed_srgb(0x336699);
        assert!((c.g - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(Rgb::named("Yellow"), Some(Rgb::YELLOW));
        assert_eq!(Rgb::named("mauve"), None);
        assert_eq!(Rgb::new(2.0, -1.0, 0.5), Rgb { r: 1.0, g: 0.0, b: 0.5 });
        assert_eq!(Rgb::YELLOW.to_u8(), (255, 255, 0));
    }

    #[test]
    fn test_blocks_to_text_skips_images() {
        let span = TextSpan {
            bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
            text: "Hi".to_string(),
            font: "Helvetica".to_string(),
            size: 10.0,
            flags: StyleFlags::empty(),
            color: Rgb::BLACK,
            chars: Vec::new(),
        };
        let blocks = vec![
            TextBlock::Image {
                bbox: Rect::new(0.0, 0.0, 50.0, 50.0),
            },
            TextBlock::Text {
                bbox: span.bbox,
                lines: vec![TextLine {
                    bbox: span.bbox,
                    spans: vec![span],
                }],
            },
        ];
        assert_eq!(blocks_to_text(&blocks), "Hi\n");
    }
}
