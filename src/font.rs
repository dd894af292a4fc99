// 5x7 bitmap font covering printable ASCII, drawn at any scale.
// Text positions follow the "bottom-left baseline" convention: (x, y) is the
// lower-left corner of the glyph box, so a text of height h occupies y-h..y.

use crate::draw::{fill_rect_f, put_pixel};
use crate::types::{BLACK, FrameBuffer};

pub const GLYPH_W: i32 = 5;
pub const GLYPH_H: i32 = 7;
/// Horizontal advance per character at scale 1 (5 pixels glyph + 1 spacing).
pub const ADVANCE: i32 = GLYPH_W + 1;

/// Return a 5x7 glyph bitmap.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
pub fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '"' => g!(0b01010,0b01010,0b01010,0b00000,0b00000,0b00000,0b00000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        '$' => g!(0b00100,0b01111,0b10100,0b01110,0b00101,0b11110,0b00100),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),
        '&' => g!(0b01100,0b10010,0b10100,0b01000,0b10101,0b10010,0b01101),
        '\'' => g!(0b01100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '*' => g!(0b00000,0b00100,0b10101,0b01110,0b10101,0b00100,0b00000),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b01100,0b00100,0b01000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b01100,0b01100),
        '/' => g!(0b00000,0b00001,0b00010,0b00100,0b01000,0b10000,0b00000),

        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        ':' => g!(0b00000,0b01100,0b01100,0b00000,0b01100,0b01100,0b00000),
        ';' => g!(0b00000,0b01100,0b01100,0b00000,0b01100,0b00100,0b01000),
        '<' => g!(0b00010,0b00100,0b01000,0b10000,0b01000,0b00100,0b00010),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),
        '>' => g!(0b01000,0b00100,0b00010,0b00001,0b00010,0b00100,0b01000),
        '?' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b00000,0b00100),
        '@' => g!(0b01110,0b10001,0b00001,0b01101,0b10101,0b10101,0b01110),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b10001,0b01010,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        '[' => g!(0b01110,0b01000,0b01000,0b01000,0b01000,0b01000,0b01110),
        '\\' => g!(0b00000,0b10000,0b01000,0b00100,0b00010,0b00001,0b00000),
        ']' => g!(0b01110,0b00010,0b00010,0b00010,0b00010,0b00010,0b01110),
        '^' => g!(0b00100,0b01010,0b10001,0b00000,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),
        '`' => g!(0b01000,0b00100,0b00010,0b00000,0b00000,0b00000,0b00000),

        'a' => g!(0b00000,0b00000,0b01110,0b00001,0b01111,0b10001,0b01111),
        'b' => g!(0b10000,0b10000,0b10110,0b11001,0b10001,0b10001,0b11110),
        'c' => g!(0b00000,0b00000,0b01110,0b10000,0b10000,0b10001,0b01110),
        'd' => g!(0b00001,0b00001,0b01101,0b10011,0b10001,0b10001,0b01111),
        'e' => g!(0b00000,0b00000,0b01110,0b10001,0b11111,0b10000,0b01110),
        'f' => g!(0b00110,0b01001,0b01000,0b11100,0b01000,0b01000,0b01000),
        'g' => g!(0b00000,0b01111,0b10001,0b10001,0b01111,0b00001,0b01110),
        'h' => g!(0b10000,0b10000,0b10110,0b11001,0b10001,0b10001,0b10001),
        'i' => g!(0b00100,0b00000,0b01100,0b00100,0b00100,0b00100,0b01110),
        'j' => g!(0b00010,0b00000,0b00110,0b00010,0b00010,0b10010,0b01100),
        'k' => g!(0b10000,0b10000,0b10010,0b10100,0b11000,0b10100,0b10010),
        'l' => g!(0b01100,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'm' => g!(0b00000,0b00000,0b11010,0b10101,0b10101,0b10001,0b10001),
        'n' => g!(0b00000,0b00000,0b10110,0b11001,0b10001,0b10001,0b10001),
        'o' => g!(0b00000,0b00000,0b01110,0b10001,0b10001,0b10001,0b01110),
        'p' => g!(0b00000,0b00000,0b11110,0b10001,0b11110,0b10000,0b10000),
        'q' => g!(0b00000,0b00000,0b01101,0b10011,0b01111,0b00001,0b00001),
        'r' => g!(0b00000,0b00000,0b10110,0b11001,0b10000,0b10000,0b10000),
        's' => g!(0b00000,0b00000,0b01110,0b10000,0b01110,0b00001,0b11110),
        't' => g!(0b01000,0b01000,0b11100,0b01000,0b01000,0b01001,0b00110),
        'u' => g!(0b00000,0b00000,0b10001,0b10001,0b10001,0b10011,0b01101),
        'v' => g!(0b00000,0b00000,0b10001,0b10001,0b10001,0b01010,0b00100),
        'w' => g!(0b00000,0b00000,0b10001,0b10001,0b10101,0b10101,0b01010),
        'x' => g!(0b00000,0b00000,0b10001,0b01010,0b00100,0b01010,0b10001),
        'y' => g!(0b00000,0b00000,0b10001,0b10001,0b01111,0b00001,0b01110),
        'z' => g!(0b00000,0b00000,0b11111,0b00010,0b00100,0b01000,0b11111),

        '{' => g!(0b00010,0b00100,0b00100,0b01000,0b00100,0b00100,0b00010),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        '}' => g!(0b01000,0b00100,0b00100,0b00010,0b00100,0b00100,0b01000),
        '~' => g!(0b00000,0b00000,0b01000,0b10101,0b00010,0b00000,0b00000),

        _ => None,
    }
}

/// Pixel size of `text` at an integer `scale`: (width, height).
pub fn text_size(text: &str, scale: u32) -> (i32, i32) {
    let s = scale.max(1) as i32;
    let n = text.chars().count() as i32;
    let w = if n == 0 { 0 } else { n * ADVANCE * s - s };
    (w, GLYPH_H * s)
}

/// Draw one glyph with cells `px` pixels wide; fractional sizes are allowed
/// so animated characters can grow smoothly.
pub fn draw_char(fb: &mut FrameBuffer, x: f32, baseline: f32, ch: char, color: u32, px: f32) {
    let Some(rows) = glyph5x7(ch) else { return };
    let top = baseline - GLYPH_H as f32 * px;
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..GLYPH_W {
            if (rowbits & (1 << (4 - rx))) != 0 {
                let cx = x + rx as f32 * px;
                let cy = top + ry as f32 * px;
                fill_rect_f(fb, cx, cy, px, px, color);
            }
        }
    }
}

/// Draw `text` at integer `scale`; `thickness` > 1 emboldens by smearing
/// each glyph one pixel to the right per extra step.
pub fn draw_text(fb: &mut FrameBuffer, x: i32, baseline: i32, text: &str, color: u32, scale: u32, thickness: u32) {
    let s = scale.max(1) as f32;
    for bold in 0..thickness.max(1) as i32 {
        let mut cx = (x + bold) as f32;
        for ch in text.chars() {
            draw_char(fb, cx, baseline as f32, ch, color, s);
            cx += ADVANCE as f32 * s;
        }
    }
}

/// Text with a dark halo `outline` pixels wide, for readability over video.
pub fn draw_text_outlined(
    fb: &mut FrameBuffer,
    x: i32,
    baseline: i32,
    text: &str,
    color: u32,
    scale: u32,
    thickness: u32,
    outline: i32,
) {
    for dy in -outline..=outline {
        for dx in -outline..=outline {
            if dx == 0 && dy == 0 {
                continue;
            }
            draw_text(fb, x + dx, baseline + dy, text, BLACK, scale, thickness);
        }
    }
    draw_text(fb, x, baseline, text, color, scale, thickness);
}

/// Small HUD text with a 1-pixel black shadow, (x, y) is the top-left corner.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        if let Some(rows) = glyph5x7(ch) {
            // Shadow pass first, then the glyph itself
            for (offset, c) in [(1, BLACK), (0, color)] {
                for (ry, rowbits) in rows.iter().enumerate() {
                    for rx in 0..GLYPH_W {
                        if (rowbits & (1 << (4 - rx))) != 0 {
                            put_pixel(fb, x + rx + offset, y + ry as i32 + offset, c);
                        }
                    }
                }
            }
        }
        x += ADVANCE;
    }
}
