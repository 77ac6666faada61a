use crate::timelapse_core::error::TimelapseError;
use image::{Rgb, RgbImage};
use std::fmt;
use std::str::FromStr;

/// Distance in pixels between overlay text and the frame edge.
const MARGIN: i64 = 10;

/// Glyph cell in font units: 5 columns of ink plus 1 of spacing, 7 rows.
const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ADVANCE: u32 = 6;
const GLYPH_ROWS: u32 = 7;

/// Label drawn in the middle of placeholder frames.
pub const NO_IMAGERY_LABEL: &str = "No imagery available";

/// Corner of the frame where timestamp text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayPosition {
    #[default]
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl OverlayPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayPosition::BottomLeft => "bottom-left",
            OverlayPosition::BottomRight => "bottom-right",
            OverlayPosition::TopLeft => "top-left",
            OverlayPosition::TopRight => "top-right",
        }
    }

    /// Bottom-left corner of a `text_width` x `text_height` block placed in
    /// this corner of a `width` x `height` frame.
    fn text_origin(&self, width: u32, height: u32, text_width: u32, text_height: u32) -> (i64, i64) {
        let (w, h) = (i64::from(width), i64::from(height));
        let (tw, th) = (i64::from(text_width), i64::from(text_height));

        match self {
            OverlayPosition::BottomLeft => (MARGIN, h - MARGIN),
            OverlayPosition::BottomRight => (w - tw - MARGIN, h - MARGIN),
            OverlayPosition::TopLeft => (MARGIN, th + MARGIN),
            OverlayPosition::TopRight => (w - tw - MARGIN, th + MARGIN),
        }
    }
}

impl fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OverlayPosition {
    type Err = TimelapseError;

    /// Accepts the short codes `BL`, `BR`, `TL`, `TR` or the long names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bl" | "bottom-left" => Ok(OverlayPosition::BottomLeft),
            "br" | "bottom-right" => Ok(OverlayPosition::BottomRight),
            "tl" | "top-left" => Ok(OverlayPosition::TopLeft),
            "tr" | "top-right" => Ok(OverlayPosition::TopRight),
            _ => Err(TimelapseError::InvalidAnchor(s.to_string())),
        }
    }
}

/// How overlay text is rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// 1.0 renders glyphs 21 pixels tall.
    pub font_scale: f32,
    /// Stroke width in pixels.
    pub thickness: u32,
    pub color: Rgb<u8>,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_scale: 1.0,
            thickness: 2,
            color: Rgb([255, 255, 255]),
        }
    }
}

impl TextStyle {
    fn unit(&self) -> u32 {
        ((self.font_scale * 3.0).round() as u32).max(1)
    }

    fn stroke_extra(&self) -> u32 {
        self.thickness.saturating_sub(1)
    }
}

/// Pixel size of `text` rendered with `style`.
pub fn text_size(text: &str, style: &TextStyle) -> (u32, u32) {
    let unit = style.unit();
    let extra = style.stroke_extra();
    let chars = text.chars().count() as u32;

    // The last glyph has no trailing spacing column.
    let width = if chars == 0 {
        0
    } else {
        (chars.saturating_mul(GLYPH_ADVANCE) - (GLYPH_ADVANCE - GLYPH_COLUMNS))
            .saturating_mul(unit)
            .saturating_add(extra)
    };
    (width, GLYPH_ROWS.saturating_mul(unit).saturating_add(extra))
}

/// Draw `text` in the given corner of `img`.
pub fn overlay_text(img: &mut RgbImage, text: &str, position: OverlayPosition, style: &TextStyle) {
    let (text_width, text_height) = text_size(text, style);
    let (x, baseline) = position.text_origin(img.width(), img.height(), text_width, text_height);
    draw_text(img, text, x, baseline, style);
}

/// Draw `text` centred on `img`.
pub fn overlay_centered(img: &mut RgbImage, text: &str, style: &TextStyle) {
    let (text_width, text_height) = text_size(text, style);
    let x = (i64::from(img.width()) - i64::from(text_width)) / 2;
    let baseline = (i64::from(img.height()) + i64::from(text_height)) / 2;
    draw_text(img, text, x, baseline, style);
}

/// Draw `text` with its bottom-left corner at (`x`, `baseline`). Anything
/// falling outside the image is clipped.
fn draw_text(img: &mut RgbImage, text: &str, x: i64, baseline: i64, style: &TextStyle) {
    let unit = i64::from(style.unit());
    let dot = unit + i64::from(style.stroke_extra());
    let (_, text_height) = text_size(text, style);
    let top = baseline - i64::from(text_height);

    for (i, c) in text.chars().enumerate() {
        let left = x + i as i64 * i64::from(GLYPH_ADVANCE) * unit;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_COLUMNS {
                if bits & (1 << (GLYPH_COLUMNS - 1 - col)) == 0 {
                    continue;
                }
                let px = left + i64::from(col) * unit;
                let py = top + row as i64 * unit;
                fill_rect(img, px, py, dot, dot, style.color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width).min(i64::from(img.width()));
    let y1 = (y + height).min(i64::from(img.height()));

    for py in y0..y1 {
        for px in x0..x1 {
            img.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// 5x7 bitmap for `c`; bit 4 is the leftmost column. Letters render as
/// capitals.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        ' ' => [0x00; 7],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}
