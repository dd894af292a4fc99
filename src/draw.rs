// Window + software drawing utilities.
// 1) A window that shows the composited camera frame and collects typing.
// 2) Pixel primitives: lines, round-tipped strokes, circles, rectangles.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::Error;
use crate::text::KeyInput;
use crate::types::{FrameBuffer, Point, Rect, channels, rgb};
use minifb::{InputCallback, Key, KeyRepeat, Window, WindowOptions};

/// Map one character from minifb's text callback to a key. Enter, Backspace
/// and Escape arrive here as control codes, so they keep their place among
/// the typed characters. Other control codes (Ctrl+letter) are dropped.
pub fn key_for_char(ch: char) -> Option<KeyInput> {
    match ch {
        '\r' | '\n' => Some(KeyInput::Enter),
        '\u{8}' | '\u{7f}' => Some(KeyInput::Backspace),
        '\u{1b}' => Some(KeyInput::Escape),
        ' '..='~' => Some(KeyInput::Char(ch)),
        _ => None,
    }
}

/// Queues keys from minifb's text input callback in arrival order.
struct KeySink(Rc<RefCell<VecDeque<KeyInput>>>);

impl InputCallback for KeySink {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(key) = char::from_u32(uni_char).and_then(key_for_char) {
            self.0.borrow_mut().push_back(key);
        }
    }
}

pub struct Drawer {
    window: Window, // the on-screen window you see
    typed: Rc<RefCell<VecDeque<KeyInput>>>,
}

impl Drawer {
    /// Create a window sized to the camera feed.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // The frame loop paces itself; minifb must not sleep on its own.
        window.set_target_fps(0);
        let typed = Rc::new(RefCell::new(VecDeque::new()));
        window.set_input_callback(Box::new(KeySink(Rc::clone(&typed))));
        Ok(Self { window, typed })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    fn ctrl_down(&self) -> bool {
        self.window.is_key_down(Key::LeftCtrl) || self.window.is_key_down(Key::RightCtrl)
    }

    /// Drain everything typed since the last call, in arrival order.
    /// Ctrl+Z / Ctrl+Y come from key state and follow the typed keys.
    pub fn key_events(&mut self) -> Vec<KeyInput> {
        let ctrl = self.ctrl_down();
        let mut out: Vec<KeyInput> = self
            .typed
            .borrow_mut()
            .drain(..)
            .filter(|k| !(ctrl && matches!(k, KeyInput::Char(_))))
            .collect();
        if ctrl {
            for key in self.window.get_keys_pressed(KeyRepeat::Yes) {
                match key {
                    Key::Z => out.push(KeyInput::Undo),
                    Key::Y => out.push(KeyInput::Redo),
                    _ => {}
                }
            }
        }
        out
    }
}

/* ---------- Software drawing: pixels, lines, circles, rectangles ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Walk the Bresenham path from p0 to p1, calling `plot` on every pixel.
fn bresenham(p0: Point, p1: Point, mut plot: impl FnMut(i32, i32)) {
    let (mut x0, mut y0, x1, y1) = (p0.x, p0.y, p1.x, p1.y);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(x0, y0);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Thin 1-pixel line.
pub fn draw_line(fb: &mut FrameBuffer, p0: Point, p1: Point, color: u32) {
    bresenham(p0, p1, |x, y| put_pixel(fb, x, y, color));
}

/// Filled disc of radius `r` centred at `c`.
pub fn fill_circle(fb: &mut FrameBuffer, c: Point, r: i32, color: u32) {
    if r <= 0 {
        put_pixel(fb, c.x, c.y, color);
        return;
    }
    let r2 = r * r;
    for dy in -r..=r {
        let y = c.y + dy;
        if y < 0 || y as usize >= fb.height {
            continue;
        }
        // Span of this row inside the circle
        let half = ((r2 - dy * dy) as f32).sqrt() as i32;
        let x0 = (c.x - half).max(0);
        let x1 = (c.x + half).min(fb.width as i32 - 1);
        if x0 > x1 {
            continue;
        }
        let row = y as usize * fb.width;
        fb.pixels[row + x0 as usize..=row + x1 as usize].fill(color);
    }
}

/// Ring of the given outer radius and thickness.
pub fn draw_circle(fb: &mut FrameBuffer, c: Point, r: i32, thickness: i32, color: u32) {
    let outer = r * r;
    let inner = (r - thickness).max(0).pow(2);
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 <= outer && d2 >= inner {
                put_pixel(fb, c.x + dx, c.y + dy, color);
            }
        }
    }
}

/// Stroke with round caps: a disc of diameter `thickness` dragged along the
/// segment, so consecutive segments join without gaps.
pub fn draw_thick_line(fb: &mut FrameBuffer, p0: Point, p1: Point, thickness: u32, color: u32) {
    let r = (thickness as i32) / 2;
    if r <= 0 {
        draw_line(fb, p0, p1, color);
        return;
    }
    // Stamping every pixel is wasteful for big brushes; a quarter radius
    // keeps the edge smooth.
    let step = (r / 4).max(1);
    let mut i = 0;
    let mut last = p0;
    bresenham(p0, p1, |x, y| {
        if i % step == 0 {
            fill_circle(fb, Point::new(x, y), r, color);
        }
        last = Point::new(x, y);
        i += 1;
    });
    fill_circle(fb, last, r, color);
}

/// Solid rectangle, clipped to the buffer.
pub fn fill_rect(fb: &mut FrameBuffer, rect: Rect, color: u32) {
    let x0 = rect.left.min(rect.right).max(0);
    let x1 = rect.left.max(rect.right).min(fb.width as i32 - 1);
    let y0 = rect.top.min(rect.bottom).max(0);
    let y1 = rect.top.max(rect.bottom).min(fb.height as i32 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    for y in y0..=y1 {
        let row = y as usize * fb.width;
        fb.pixels[row + x0 as usize..=row + x1 as usize].fill(color);
    }
}

/// Rectangle with fractional origin/size (glyph cells at animated scales).
pub fn fill_rect_f(fb: &mut FrameBuffer, x: f32, y: f32, w: f32, h: f32, color: u32) {
    let rect = Rect {
        left: x.floor() as i32,
        top: y.floor() as i32,
        right: (x + w).ceil() as i32 - 1,
        bottom: (y + h).ceil() as i32 - 1,
    };
    fill_rect(fb, rect, color);
}

/// Rectangle outline `thickness` pixels wide, drawn inward.
pub fn draw_rect(fb: &mut FrameBuffer, rect: Rect, thickness: i32, color: u32) {
    for t in 0..thickness.max(1) {
        let (l, r, top, b) = (rect.left + t, rect.right - t, rect.top + t, rect.bottom - t);
        draw_line(fb, Point::new(l, top), Point::new(r, top), color);
        draw_line(fb, Point::new(l, b), Point::new(r, b), color);
        draw_line(fb, Point::new(l, top), Point::new(l, b), color);
        draw_line(fb, Point::new(r, top), Point::new(r, b), color);
    }
}

/// Mix `color` into a rectangle: out = alpha * color + (1 - alpha) * frame.
pub fn blend_rect(fb: &mut FrameBuffer, rect: Rect, color: u32, alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    let (cr, cg, cb) = channels(color);
    let x0 = rect.left.max(0);
    let x1 = rect.right.min(fb.width as i32 - 1);
    let y0 = rect.top.max(0);
    let y1 = rect.bottom.min(fb.height as i32 - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let idx = y as usize * fb.width + x as usize;
            let (r, g, b) = channels(fb.pixels[idx]);
            let mix = |c: u8, f: u8| (a * c as f32 + (1.0 - a) * f as f32).round() as u8;
            fb.pixels[idx] = rgb(mix(cr, r), mix(cg, g), mix(cb, b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BLACK, WHITE};

    #[test]
    fn control_codes_map_to_editing_keys() {
        assert_eq!(key_for_char('\r'), Some(KeyInput::Enter));
        assert_eq!(key_for_char('\u{8}'), Some(KeyInput::Backspace));
        assert_eq!(key_for_char('\u{7f}'), Some(KeyInput::Backspace));
        assert_eq!(key_for_char('\u{1b}'), Some(KeyInput::Escape));
        assert_eq!(key_for_char('q'), Some(KeyInput::Char('q')));
        // Ctrl+Z arrives as SUB; the chord is read from key state instead
        assert_eq!(key_for_char('\u{1a}'), None);
        assert_eq!(key_for_char('é'), None);
    }

    #[test]
    fn queued_keys_keep_their_order() {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut sink = KeySink(Rc::clone(&queue));
        for ch in "ab\u{8}c\r".chars() {
            sink.add_char(ch as u32);
        }
        let keys: Vec<KeyInput> = queue.borrow_mut().drain(..).collect();
        assert_eq!(
            keys,
            vec![KeyInput::Char('a'), KeyInput::Char('b'), KeyInput::Backspace, KeyInput::Char('c'), KeyInput::Enter]
        );
    }

    #[test]
    fn thick_line_covers_both_endpoints_with_round_caps() {
        let mut fb = FrameBuffer::new(50, 50);
        draw_thick_line(&mut fb, Point::new(10, 25), Point::new(40, 25), 10, WHITE);
        assert_eq!(fb.get(10, 25), Some(WHITE));
        assert_eq!(fb.get(40, 25), Some(WHITE));
        // Cap extends past the endpoint by the radius, corners stay empty
        assert_eq!(fb.get(44, 25), Some(WHITE));
        assert_eq!(fb.get(45, 30), Some(BLACK));
    }

    #[test]
    fn fill_rect_clips_negative_origin() {
        let mut fb = FrameBuffer::new(10, 10);
        fill_rect(&mut fb, Rect { left: -5, top: -5, right: 2, bottom: 2 }, WHITE);
        assert_eq!(fb.pixels.iter().filter(|&&p| p == WHITE).count(), 9);
    }

    #[test]
    fn blend_rect_mixes_channels() {
        let mut fb = FrameBuffer::filled(2, 2, WHITE);
        blend_rect(&mut fb, Rect { left: 0, top: 0, right: 1, bottom: 1 }, BLACK, 0.5);
        let (r, g, b) = channels(fb.pixels[0]);
        assert_eq!((r, g, b), (128, 128, 128));
    }
}
