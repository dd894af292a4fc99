// Painting fingertip motion onto a raster.

use crate::draw::{draw_thick_line, fill_rect};
use crate::types::{ERASER, FrameBuffer, Point, Rect};

/// Intermediate points painted per frame of motion.
pub const INTERPOLATION_STEPS: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Brush { color: u32, size: u32 },
    Eraser { size: u32 },
}

impl Tool {
    /// Black is the eraser sentinel.
    pub fn from_color(color: u32, brush_size: u32, eraser_size: u32) -> Self {
        if color == ERASER {
            Tool::Eraser { size: eraser_size }
        } else {
            Tool::Brush { color, size: brush_size }
        }
    }
}

/// `from + (to - from) * k / steps` for k = 1..=steps; the last point is `to`.
pub fn interpolate(from: Point, to: Point, steps: i32) -> impl Iterator<Item = Point> {
    let steps = steps.max(1);
    (1..=steps).map(move |k| {
        Point::new(from.x + (to.x - from.x) * k / steps, from.y + (to.y - from.y) * k / steps)
    })
}

/// Paint the motion `from -> to`: round-capped segments chained through the
/// interpolated points, or eraser squares centred on each of them.
pub fn stroke(fb: &mut FrameBuffer, from: Point, to: Point, tool: Tool) {
    let mut last = from;
    for p in interpolate(from, to, INTERPOLATION_STEPS) {
        match tool {
            Tool::Brush { color, size } => draw_thick_line(fb, last, p, size, color),
            Tool::Eraser { size } => {
                let half = size as i32 / 2;
                let rect = Rect { left: p.x - half, top: p.y - half, right: p.x + half, bottom: p.y + half };
                fill_rect(fb, rect, ERASER);
            }
        }
        last = p;
    }
}
