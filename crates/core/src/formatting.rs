//! Visual formatting analysis of a page region
//!
//! The analyzer reports the style of the first span that overlaps the region,
//! scanning blocks, lines and spans in document order. Regions without text
//! get the baseline profile.

use crate::engine::{BuiltinFont, DocumentEngine, EngineResult};
use crate::geometry::Rect;
use crate::text::{Rgb, StyleFlags, TextBlock};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Style of a run of text, as needed to draw a look-alike replacement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingProfile {
    pub font_name: String,
    pub font_size: f32,
    pub style_flags: StyleFlags,
    pub color: Rgb,
    pub line_height: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    pub alignment: Alignment,
}

impl Default for FormattingProfile {
    fn default() -> Self {
        Self {
            font_name: "helv".to_string(),
            font_size: 12.0,
            style_flags: StyleFlags::empty(),
            color: Rgb::BLACK,
            line_height: 14.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            alignment: Alignment::Left,
        }
    }
}

impl FormattingProfile {
    pub fn is_bold(&self) -> bool {
        self.style_flags.contains(StyleFlags::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.style_flags.contains(StyleFlags::ITALIC)
    }

    /// Built-in font used to draw text in this style
    pub fn builtin_font(&self) -> BuiltinFont {
        normalize_font_name_styled(&self.font_name, self.style_flags)
    }

    /// Style label: "Normal", "Bold", "Italic" or "Bold + Italic"
    pub fn style_label(&self) -> &'static str {
        match (self.is_bold(), self.is_italic()) {
            (true, true) => "Bold + Italic",
            (true, false) => "Bold",
            (false, true) => "Italic",
            (false, false) => "Normal",
        }
    }

    /// One-line human summary, e.g. `Font: Helvetica, Size: 12.0, Style: Bold`
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FormattingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Font: {}, Size: {:.1}, Style: {}",
            self.font_name,
            self.font_size,
            self.style_label()
        )
    }
}

/// Analyze the formatting of the text overlapping `rect`
pub fn analyze(blocks: &[TextBlock], rect: &Rect) -> FormattingProfile {
    let mut profile = FormattingProfile::default();

    for block in blocks {
        let TextBlock::Text { bbox, lines } = block else {
            continue;
        };
        if !bbox.intersects(rect) {
            continue;
        }
        for line in lines {
            if !line.bbox.intersects(rect) {
                continue;
            }
            let Some(span) = line.spans.iter().find(|s| s.bbox.intersects(rect)) else {
                continue;
            };

            profile.font_name = span.font.clone();
            profile.font_size = span.size;
            profile.style_flags = span.flags;
            profile.color = span.color;
            profile.line_height = line.bbox.height();

            if span.chars.len() > 1 {
                let glyph_width: f32 = span.chars.iter().map(|g| g.width).sum();
                if glyph_width > 0.0 {
                    profile.char_spacing =
                        (span.bbox.width() - glyph_width) / span.chars.len() as f32;
                }
            }

            log::debug!("formatting of {rect:?}: {profile}");
            return profile;
        }
    }

    log::debug!("no text under {rect:?}, using baseline formatting");
    profile
}

/// Engine-facing front-end of [`analyze`]
pub struct FormattingAnalyzer;

impl FormattingAnalyzer {
    /// Fetch the page structure and analyze `rect`
    pub fn analyze<E: DocumentEngine>(
        engine: &E,
        page: u16,
        rect: &Rect,
    ) -> EngineResult<FormattingProfile> {
        let blocks = engine.text_structure(page)?;
        Ok(analyze(&blocks, rect))
    }
}

/// Map a font name reported by text extraction to a drawable built-in font
///
/// Accepts standard-14 PostScript names and the short aliases used by
/// PDF toolkits. Unmapped names fall back to Helvetica.
pub fn normalize_font_name(name: &str) -> BuiltinFont {
    lookup_font(name).unwrap_or_else(|| {
        log::warn!("unmapped font {name:?}, falling back to Helvetica");
        BuiltinFont::Helvetica
    })
}

/// Like [`normalize_font_name`], but keeps bold/italic on unmapped fonts
pub fn normalize_font_name_styled(name: &str, flags: StyleFlags) -> BuiltinFont {
    if let Some(font) = lookup_font(name) {
        return font;
    }
    let font = match (
        flags.contains(StyleFlags::BOLD),
        flags.contains(StyleFlags::ITALIC),
    ) {
        (true, true) => BuiltinFont::HelveticaBoldOblique,
        (true, false) => BuiltinFont::HelveticaBold,
        (false, true) => BuiltinFont::HelveticaOblique,
        (false, false) => BuiltinFont::Helvetica,
    };
    log::warn!("unmapped font {name:?}, falling back to {}", font.postscript_name());
    font
}

fn lookup_font(name: &str) -> Option<BuiltinFont> {
    let font = match name {
        "Times-Roman" | "tiro" | "times-roman" => BuiltinFont::TimesRoman,
        "Times-Bold" | "tibo" | "times-bold" => BuiltinFont::TimesBold,
        "Times-Italic" | "tiit" | "times-italic" => BuiltinFont::TimesItalic,
        "Times-BoldItalic" | "tibi" | "times-bolditalic" => BuiltinFont::TimesBoldItalic,
        "Helvetica" | "helv" => BuiltinFont::Helvetica,
        "Helvetica-Bold" | "hebo" => BuiltinFont::HelveticaBold,
        "Helvetica-Oblique" | "heit" => BuiltinFont::HelveticaOblique,
        "Helvetica-BoldOblique" | "hebi" => BuiltinFont::HelveticaBoldOblique,
        "Courier" | "cour" => BuiltinFont::Courier,
        "Courier-Bold" | "cobo" => BuiltinFont::CourierBold,
        "Courier-Oblique" | "coit" => BuiltinFont::CourierOblique,
        "Courier-BoldOblique" | "cobi" => BuiltinFont::CourierBoldOblique,
        "Symbol" | "symb" => BuiltinFont::Symbol,
        "ZapfDingbats" | "zadb" => BuiltinFont::ZapfDingbats,
        _ => return None,
    };
    Some(font)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Glyph, TextLine, TextSpan};
    use proptest::prelude::*;

    fn span(bbox: Rect, font: &str, size: f32, flags: StyleFlags, glyphs: &[f32]) -> TextSpan {
        TextSpan {
            bbox,
            text: "x".repeat(glyphs.len()),
            font: font.to_string(),
            size,
            flags,
            color: Rgb::RED,
            chars: glyphs.iter().map(|&width| Glyph { width }).collect(),
        }
    }

    fn block(spans: Vec<TextSpan>) -> TextBlock {
        let bbox = spans
            .iter()
            .skip(1)
            .fold(spans[0].bbox, |acc, s| acc.union(&s.bbox));
        TextBlock::Text {
            bbox,
            lines: vec![TextLine { bbox, spans }],
        }
    }

    #[test]
    fn test_baseline_profile() {
        let profile = FormattingProfile::default();
        assert_eq!(profile.font_name, "helv");
        assert_eq!(profile.font_size, 12.0);
        assert_eq!(profile.line_height, 14.0);
        assert_eq!(profile.color, Rgb::BLACK);
        assert_eq!(profile.alignment, Alignment::Left);
    }

    #[test]
    fn test_empty_page_yields_baseline() {
        let profile = analyze(&[], &Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(profile, FormattingProfile::default());
    }

    #[test]
    fn test_first_intersecting_span_wins() {
        let blocks = vec![block(vec![
            span(Rect::new(0.0, 0.0, 40.0, 14.0), "Times-Bold", 11.0, StyleFlags::BOLD, &[]),
            span(Rect::new(40.0, 0.0, 80.0, 14.0), "Courier", 9.0, StyleFlags::MONOSPACE, &[]),
        ])];

        let profile = analyze(&blocks, &Rect::new(30.0, 2.0, 60.0, 10.0));
        assert_eq!(profile.font_name, "Times-Bold");
        assert_eq!(profile.font_size, 11.0);
        assert_eq!(profile.color, Rgb::RED);
        assert_eq!(profile.line_height, 14.0);

        let profile = analyze(&blocks, &Rect::new(50.0, 2.0, 60.0, 10.0));
        assert_eq!(profile.font_name, "Courier");
    }

    #[test]
    fn test_char_spacing_from_glyph_widths() {
        let blocks = vec![block(vec![span(
            Rect::new(0.0, 0.0, 24.0, 12.0),
            "Helvetica",
            12.0,
            StyleFlags::empty(),
            &[5.0, 5.0, 5.0, 5.0],
        )])];
        let profile = analyze(&blocks, &Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(profile.char_spacing, 1.0);

        // Single glyph: spacing is left at zero
        let blocks = vec![block(vec![span(
            Rect::new(0.0, 0.0, 24.0, 12.0),
            "Helvetica",
            12.0,
            StyleFlags::empty(),
            &[5.0],
        )])];
        let profile = analyze(&blocks, &Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(profile.char_spacing, 0.0);
    }

    #[test]
    fn test_touching_span_does_not_match() {
        let blocks = vec![block(vec![span(
            Rect::new(0.0, 0.0, 40.0, 14.0),
            "Courier",
            9.0,
            StyleFlags::empty(),
            &[],
        )])];
        let profile = analyze(&blocks, &Rect::new(40.0, 0.0, 80.0, 14.0));
        assert_eq!(profile, FormattingProfile::default());
    }

    #[test]
    fn test_normalize_font_name() {
        assert_eq!(normalize_font_name("Helvetica-Bold"), BuiltinFont::HelveticaBold);
        assert_eq!(normalize_font_name("cobi"), BuiltinFont::CourierBoldOblique);
        assert_eq!(normalize_font_name("Times-Roman"), BuiltinFont::TimesRoman);
        assert_eq!(normalize_font_name("ArialMT"), BuiltinFont::Helvetica);

        let flags = StyleFlags::BOLD | StyleFlags::ITALIC;
        assert_eq!(
            normalize_font_name_styled("Arial-BoldItalicMT", flags),
            BuiltinFont::HelveticaBoldOblique
        );
        assert_eq!(
            normalize_font_name_styled("Courier", flags),
            BuiltinFont::Courier
        );
    }

    #[test]
    fn test_describe() {
        let mut profile = FormattingProfile::default();
        assert_eq!(profile.describe(), "Font: helv, Size: 12.0, Style: Normal");

        profile.font_name = "Helvetica-BoldOblique".to_string();
        profile.style_flags = StyleFlags::BOLD | StyleFlags::ITALIC;
        profile.font_size = 10.5;
        assert_eq!(
            profile.describe(),
            "Font: Helvetica-BoldOblique, Size: 10.5, Style: Bold + Italic"
        );
    }

    proptest! {
        #[test]
        fn prop_disjoint_region_falls_back(x in 200.0f32..500.0, y in 200.0f32..500.0) {
            let blocks = vec![block(vec![span(
                Rect::new(0.0, 0.0, 100.0, 100.0),
                "Courier",
                9.0,
                StyleFlags::empty(),
                &[4.0, 4.0],
            )])];
            let profile = analyze(&blocks, &Rect::new(x, y, x + 10.0, y + 10.0));
            prop_assert_eq!(profile, FormattingProfile::default());
        }
    }
}
