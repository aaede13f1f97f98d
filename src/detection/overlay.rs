//! Diagnostic drawing onto annotated frames.
//!
//! Labels use a built-in 3×5 block font. Only digits, ASCII letters (rendered upper-case) and
//! `: . -` have glyphs; anything else advances like a space.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
pub const COUNT_GREEN: Rgb<u8> = Rgb([0, 200, 0]);

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// Draw the outline of the rectangle spanning `(x1, y1)..=(x2, y2)`,
/// `thickness` pixels wide, growing inwards.
pub fn draw_box(frame: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness as i32 {
        let width = x2 - x1 + 1 - 2 * t;
        let height = y2 - y1 + 1 - 2 * t;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x1 + t, y1 + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

/// Full-width horizontal line centred on row `y`.
pub fn draw_counting_line(frame: &mut RgbImage, y: i32, color: Rgb<u8>, thickness: u32) {
    let right = frame.width() as f32;
    for t in 0..thickness as i32 {
        let row = (y + t) as f32;
        draw_line_segment_mut(frame, (0.0, row), (right, row), color);
    }
}

pub fn draw_dot(frame: &mut RgbImage, x: i32, y: i32, radius: i32, color: Rgb<u8>) {
    draw_filled_circle_mut(frame, (x, y), radius, color);
}

/// Pixel size of `text` at the given scale.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let width = (chars * (GLYPH_WIDTH + 1) - 1) * scale;
    (width, GLYPH_HEIGHT * scale)
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn draw_text(frame: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let mut cursor = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> col) == 0 {
                        continue;
                    }
                    let px = cursor + (col * scale) as i32;
                    let py = y + (row as u32 * scale) as i32;
                    draw_filled_rect_mut(frame, Rect::at(px, py).of_size(scale, scale), color);
                }
            }
        }
        cursor += ((GLYPH_WIDTH + 1) * scale) as i32;
    }
}

/// Text on a filled background box whose top-left corner is at `(x, y)`.
pub fn draw_text_box(
    frame: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    scale: u32,
    padding: u32,
    text_color: Rgb<u8>,
    background: Rgb<u8>,
) {
    let (w, h) = text_size(text, scale.max(1));
    if w == 0 {
        return;
    }
    draw_filled_rect_mut(
        frame,
        Rect::at(x, y).of_size(w + 2 * padding, h + 2 * padding),
        background,
    );
    draw_text(frame, text, x + padding as i32, y + padding as i32, scale, text_color);
}

fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_size_accounts_for_spacing() {
        assert_eq!(text_size("12", 1), (7, 5));
        assert_eq!(text_size("12", 2), (14, 10));
        assert_eq!(text_size("", 3), (0, 0));
    }

    #[test]
    fn digit_one_lights_its_stem() {
        let mut frame = RgbImage::new(10, 10);
        draw_text(&mut frame, "1", 2, 2, 1, WHITE);
        // middle column of every row is lit for "1"
        for row in 0..5 {
            assert_eq!(*frame.get_pixel(3, 2 + row), WHITE);
        }
        assert_eq!(*frame.get_pixel(4, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn box_outline_leaves_interior_untouched() {
        let mut frame = RgbImage::new(20, 20);
        draw_box(&mut frame, 2, 2, 12, 12, RED, 2);
        assert_eq!(*frame.get_pixel(2, 7), RED);
        assert_eq!(*frame.get_pixel(3, 7), RED);
        assert_eq!(*frame.get_pixel(12, 7), RED);
        assert_eq!(*frame.get_pixel(7, 7), Rgb([0, 0, 0]));
    }
}
