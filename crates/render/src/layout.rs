//! Grouping of extracted characters into the block/line/span/word model
//!
//! PDFium reports a flat character stream. Lines break on explicit newlines,
//! on a vertical jump, or when the pen moves back to the left; spans break on
//! a change of font, size or color; blocks break on a blank-line sized gap.

use pdf_retouch_core::{Glyph, Point, Rect, Rgb, StyleFlags, TextBlock, TextLine, TextSpan, Word};

/// One character as reported by the text layer, in document space
#[derive(Debug, Clone, PartialEq)]
pub struct CharRecord {
    pub ch: char,
    /// Loose glyph box; `None` for generated characters such as spaces
    pub bounds: Option<Rect>,
    pub font: String,
    pub size: f32,
    pub color: Rgb,
}

impl CharRecord {
    fn is_line_break(&self) -> bool {
        self.ch == '\n' || self.ch == '\r'
    }

    fn same_style(&self, span: &TextSpan) -> bool {
        self.font == span.font && self.size == span.size && self.color == span.color
    }
}

/// Split the character stream into lines, dropping explicit line breaks
fn split_lines(chars: &[CharRecord]) -> Vec<Vec<&CharRecord>> {
    let mut lines: Vec<Vec<&CharRecord>> = Vec::new();
    let mut current: Vec<&CharRecord> = Vec::new();
    let mut last_box: Option<Rect> = None;

    for record in chars {
        if record.is_line_break() {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            last_box = None;
            continue;
        }

        if let (Some(bounds), Some(last)) = (record.bounds, last_box) {
            let center_y = (bounds.y0 + bounds.y1) / 2.0;
            let wrapped = center_y < last.y0 || center_y > last.y1 || bounds.x1 < last.x0;
            if wrapped && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
        }

        if record.bounds.is_none() && current.is_empty() {
            // Leading generated whitespace carries no position
            continue;
        }
        if let Some(bounds) = record.bounds {
            last_box = Some(bounds);
        }
        current.push(record);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    // Trailing generated whitespace carries no position either
    for line in &mut lines {
        while line.last().is_some_and(|r| r.bounds.is_none()) {
            line.pop();
        }
    }
    lines.retain(|line| !line.is_empty());
    lines
}

fn union_all(boxes: impl Iterator<Item = Rect>) -> Option<Rect> {
    boxes.fold(None, |acc: Option<Rect>, r| {
        Some(acc.map_or(r, |a| a.union(&r)))
    })
}

fn build_line(records: &[&CharRecord]) -> Option<TextLine> {
    let mut spans: Vec<TextSpan> = Vec::new();

    for record in records {
        let starts_span = match spans.last() {
            Some(span) => record.bounds.is_some() && !record.same_style(span),
            None => true,
        };

        if starts_span {
            let Some(bounds) = record.bounds else {
                continue;
            };
            spans.push(TextSpan {
                bbox: bounds,
                text: String::new(),
                font: record.font.clone(),
                size: record.size,
                flags: StyleFlags::from_font_name(&record.font),
                color: record.color,
                chars: Vec::new(),
            });
        }

        if let Some(span) = spans.last_mut() {
            span.text.push(record.ch);
            if let Some(bounds) = record.bounds {
                span.bbox = span.bbox.union(&bounds);
                span.chars.push(Glyph {
                    width: bounds.width(),
                });
            }
        }
    }

    let bbox = union_all(spans.iter().map(|s| s.bbox))?;
    Some(TextLine { bbox, spans })
}

/// Build the block/line/span hierarchy from a page's characters
pub fn build_blocks(chars: &[CharRecord]) -> Vec<TextBlock> {
    let lines: Vec<TextLine> = split_lines(chars)
        .iter()
        .filter_map(|records| build_line(records))
        .collect();

    let mut blocks: Vec<Vec<TextLine>> = Vec::new();
    for line in lines {
        let starts_block = match blocks.last().and_then(|b| b.last()) {
            Some(prev) => {
                let gap = line.bbox.y0 - prev.bbox.y1;
                let overlaps_x = line.bbox.x0 < prev.bbox.x1 && prev.bbox.x0 < line.bbox.x1;
                gap > prev.bbox.height() || gap < -prev.bbox.height() || !overlaps_x
            }
            None => true,
        };
        if starts_block {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
        .into_iter()
        .filter_map(|lines| {
            let bbox = union_all(lines.iter().map(|l| l.bbox))?;
            Some(TextBlock::Text { bbox, lines })
        })
        .collect()
}

/// Build the flat word list from a page's characters
pub fn build_words(chars: &[CharRecord]) -> Vec<Word> {
    let mut words = Vec::new();
    for line in split_lines(chars) {
        let mut text = String::new();
        let mut bbox: Option<Rect> = None;
        for record in line {
            if record.ch.is_whitespace() {
                if let Some(rect) = bbox.take() {
                    words.push(Word::new(rect, std::mem::take(&mut text)));
                }
                continue;
            }
            text.push(record.ch);
            if let Some(bounds) = record.bounds {
                bbox = Some(bbox.map_or(bounds, |b| b.union(&bounds)));
            }
        }
        if let Some(rect) = bbox {
            words.push(Word::new(rect, text));
        }
    }
    words
}

/// Greedy word wrap to at most `max_chars` per line; explicit newlines kept
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

/// Convert a PDF-space box (bottom-left origin) to document space
pub fn to_document_rect(left: f32, bottom: f32, right: f32, top: f32, page_height: f32) -> Rect {
    Rect::from_corners(
        Point::new(left, page_height - top),
        Point::new(right, page_height - bottom),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_chars(text: &str, x: f32, y: f32, font: &str) -> Vec<CharRecord> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| CharRecord {
                ch,
                bounds: (!ch.is_whitespace()).then(|| {
                    let x0 = x + i as f32 * 6.0;
                    Rect::new(x0, y, x0 + 6.0, y + 12.0)
                }),
                font: font.to_string(),
                size: 12.0,
                color: Rgb::BLACK,
            })
            .collect()
    }

    #[test]
    fn test_words_split_on_whitespace() {
        let chars = line_chars("Invoice 2024", 100.0, 100.0, "Helvetica");
        let words = build_words(&chars);

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Invoice");
        assert_eq!(words[0].rect, Rect::new(100.0, 100.0, 142.0, 112.0));
        assert_eq!(words[1].text, "2024");
        assert_eq!(words[1].rect.x0, 148.0);
    }

    #[test]
    fn test_lines_break_on_vertical_jump() {
        let mut chars = line_chars("Total", 100.0, 100.0, "Helvetica");
        chars.extend(line_chars("Due", 100.0, 114.0, "Helvetica"));
        chars.extend(line_chars("Notes", 100.0, 200.0, "Helvetica"));

        let blocks = build_blocks(&chars);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines().len(), 2);
        assert_eq!(blocks[0].lines()[1].text(), "Due");
        assert_eq!(blocks[1].lines()[0].text(), "Notes");
    }

    #[test]
    fn test_spans_break_on_style_change() {
        let mut chars = line_chars("Net ", 100.0, 100.0, "Helvetica");
        chars.extend(line_chars("30", 124.0, 100.0, "Helvetica-Bold"));

        let blocks = build_blocks(&chars);
        let spans = &blocks[0].lines()[0].spans;
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Net ");
        assert_eq!(spans[0].chars.len(), 3);
        assert_eq!(spans[1].font, "Helvetica-Bold");
        assert!(spans[1].flags.contains(StyleFlags::BOLD));
    }

    #[test]
    fn test_explicit_newlines_split_lines() {
        let mut chars = line_chars("A", 10.0, 10.0, "Courier");
        chars.push(CharRecord {
            ch: '\n',
            bounds: None,
            font: "Courier".to_string(),
            size: 12.0,
            color: Rgb::BLACK,
        });
        chars.extend(line_chars("B", 40.0, 10.0, "Courier"));

        let words = build_words(&chars);
        assert_eq!(words.len(), 2);
        let blocks = build_blocks(&chars);
        let lines: usize = blocks.iter().map(|b| b.lines().len()).sum();
        assert_eq!(lines, 2);
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_text("one\ntwo", 50), vec!["one", "two"]);
        assert_eq!(wrap_text("supercalifragilistic", 5), vec!["supercalifragilistic"]);
    }

    #[test]
    fn test_to_document_rect_flips_y() {
        let rect = to_document_rect(100.0, 672.0, 200.0, 692.0, 792.0);
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 120.0));
    }
}
