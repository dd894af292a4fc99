// Core types shared by the camera, the painter and the compositor.

/// A pixel buffer; each entry is 0x00RRGGBB (the layout minifb presents).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,     // how wide the frame is on screen (pixels)
    pub height: usize,    // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>, // length = width * height
}

impl FrameBuffer {
    /// All-black buffer. On the drawing canvas black means "nothing painted".
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn same_size(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Nearest-neighbour copy at `width` x `height`.
    pub fn resized(&self, width: usize, height: usize) -> FrameBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = FrameBuffer::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        for y in 0..height {
            let sy = y * self.height / height;
            let src = &self.pixels[sy * self.width..(sy + 1) * self.width];
            for x in 0..width {
                out.pixels[y * width + x] = src[x * self.width / width];
            }
        }
        out
    }

    /// Mirror left/right in place (selfie view).
    pub fn flip_horizontal(&mut self) {
        for row in self.pixels.chunks_mut(self.width.max(1)) {
            row.reverse();
        }
    }

    /// Copy `src` into this buffer with its top-left corner at (x, y), clipped.
    pub fn blit(&mut self, src: &FrameBuffer, x: i32, y: i32) {
        for sy in 0..src.height {
            let dy = y + sy as i32;
            if dy < 0 || dy as usize >= self.height {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + sx as i32;
                if dx < 0 || dx as usize >= self.width {
                    continue;
                }
                self.pixels[dy as usize * self.width + dx as usize] = src.pixels[sy * src.width + sx];
            }
        }
    }
}

/// A pixel position in frame space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2, (self.y + other.y) / 2)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Axis-aligned rectangle, edges inclusive (hit-testing matches what is drawn).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        self.left <= p.x && p.x <= self.right && self.top <= p.y && p.y <= self.bottom
    }
}

// ---------------------- color helpers (0x00RRGGBB) ----------------------

#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
pub fn channels(px: u32) -> (u8, u8, u8) {
    (((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
}

/// Scale every channel by `k` in [0,1] (used for fades).
#[inline]
pub fn scale_color(px: u32, k: f32) -> u32 {
    let k = k.clamp(0.0, 1.0);
    let (r, g, b) = channels(px);
    rgb(
        (r as f32 * k).round() as u8,
        (g as f32 * k).round() as u8,
        (b as f32 * k).round() as u8,
    )
}

pub const BLACK: u32 = 0x00_00_00_00;
pub const WHITE: u32 = 0x00_FF_FF_FF;
pub const PINK: u32 = 0x00_FF_00_FF;
pub const BLUE: u32 = 0x00_00_00_FF;
pub const GREEN: u32 = 0x00_00_FF_00;
pub const YELLOW: u32 = 0x00_FF_FF_00;
/// The eraser paints "nothing" back onto the canvas.
pub const ERASER: u32 = BLACK;
