//! Parsing of user-entered values (rectangles, points, sizes, colors)

use crate::error::{CoreError, CoreResult};
use crate::geometry::{Point, Rect};
use crate::text::Rgb;

fn parse_numbers(value: &str, expected: usize, what: &str) -> CoreResult<Vec<f32>> {
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CoreError::MalformedInput(format!("{what} {value:?}")))?;

    if numbers.len() != expected || numbers.iter().any(|n| !n.is_finite()) {
        return Err(CoreError::MalformedInput(format!(
            "{what} {value:?}: expected {expected} comma-separated numbers"
        )));
    }
    Ok(numbers)
}

/// Parse `x0,y0,x1,y1` into a normalized rectangle
pub fn parse_rect(value: &str) -> CoreResult<Rect> {
    let n = parse_numbers(value, 4, "rectangle")?;
    Ok(Rect::from_tuple((n[0], n[1], n[2], n[3])))
}

/// Parse `x,y`
pub fn parse_point(value: &str) -> CoreResult<Point> {
    let n = parse_numbers(value, 2, "point")?;
    Ok(Point::new(n[0], n[1]))
}

/// Parse a strictly positive font size
pub fn parse_font_size(value: &str) -> CoreResult<f32> {
    match value.trim().parse::<f32>() {
        Ok(size) if size.is_finite() && size > 0.0 => Ok(size),
        _ => Err(CoreError::MalformedInput(format!("font size {value:?}"))),
    }
}

/// Parse a palette name (`red`) or a hex color (`#ff8000`)
pub fn parse_color(value: &str) -> CoreResult<Rgb> {
    let value = value.trim();
    if let Some(color) = Rgb::named(value) {
        return Ok(color);
    }
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() == 6 {
        if let Ok(packed) = u32::from_str_radix(hex, 16) {
            return Ok(Rgb::from_packed_srgb(packed));
        }
    }
    Err(CoreError::MalformedInput(format!("color {value:?}")))
}
