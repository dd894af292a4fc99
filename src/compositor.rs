// Builds the frame you see, in a fixed order:
// 1) canvas over camera (only where something is painted)
// 2) header strip
// 3) keyboard mode: translucent input bar
// 4) text objects, plus the live caret while typing
// 5) guide page, blended below the header
// 6) the current notification banner
// The canvas is read, never written.

use crate::draw::{blend_rect, fill_rect};
use crate::error::Error;
use crate::font::{draw_text, draw_text_outlined, text_size};
use crate::gamma::GammaLut;
use crate::header::Layout;
use crate::notify::Notification;
use crate::text::TextInput;
use crate::types::{BLACK, FrameBuffer, Rect, WHITE, rgb};

pub const INPUT_BAR_HEIGHT: i32 = 100;
pub const INPUT_BAR_COLOR: u32 = rgb(50, 50, 50);
pub const INPUT_BAR_ALPHA: f32 = 0.3;
pub const GUIDE_ALPHA: f32 = 0.5;
/// Baseline of notification text, just under the header.
pub const NOTIFICATION_Y: i32 = 110;

/// What to draw this frame besides the camera image.
pub struct Scene<'a> {
    pub canvas: &'a FrameBuffer,
    pub header: Option<&'a FrameBuffer>,
    pub text: &'a TextInput,
    /// Guide page with its index and the page count.
    pub guide: Option<(&'a FrameBuffer, usize, usize)>,
    pub notification: Option<&'a Notification>,
}

pub struct Compositor {
    layout: Layout,
    lut: GammaLut,
}

impl Compositor {
    pub fn new(layout: Layout) -> Self {
        Self { layout, lut: GammaLut::new() }
    }

    /// Compose `scene` onto `frame` (the live camera image) in place.
    pub fn compose(&self, frame: &mut FrameBuffer, scene: &Scene<'_>) -> Result<(), Error> {
        overlay_painted(frame, scene.canvas)?;

        if let Some(header) = scene.header {
            frame.blit(header, 0, 0);
        }

        if scene.text.is_active() {
            let h = self.layout.height as i32;
            let bar = Rect { left: 0, top: h - INPUT_BAR_HEIGHT, right: self.layout.width as i32 - 1, bottom: h - 1 };
            blend_rect(frame, bar, INPUT_BAR_COLOR, INPUT_BAR_ALPHA);
        }
        scene.text.render(frame);

        if let Some((page, index, count)) = scene.guide {
            let top = self.layout.header_height;
            self.blend_linear_at(frame, page, top, GUIDE_ALPHA)?;
            let label = format!("Guide {}/{}", index + 1, count);
            let (w, _) = text_size(&label, 2);
            draw_text_outlined(frame, self.layout.width as i32 - w - 20, self.layout.height as i32 - 20, &label, WHITE, 2, 1, 1);
        }

        if let Some(note) = scene.notification {
            self.banner(frame, &note.text);
        }
        Ok(())
    }

    fn banner(&self, frame: &mut FrameBuffer, text: &str) {
        let (w, h) = text_size(text, 2);
        let (x, y) = (50, NOTIFICATION_Y);
        fill_rect(frame, Rect { left: x - 8, top: y - h - 8, right: x + w + 8, bottom: y + 8 }, BLACK);
        draw_text(frame, x, y, text, WHITE, 2, 2);
    }

    /// Mix `page` into `frame` rows starting at `top`, in linear light:
    /// out = alpha * page + (1 - alpha) * frame.
    pub fn blend_linear_at(&self, frame: &mut FrameBuffer, page: &FrameBuffer, top: usize, alpha: f32) -> Result<(), Error> {
        if page.width != frame.width || top + page.height > frame.height {
            return Err(Error::SizeMismatch(format!(
                "guide {}x{} at row {top} does not fit {}x{}",
                page.width, page.height, frame.width, frame.height
            )));
        }
        let start = top * frame.width;
        for (dst, &src) in frame.pixels[start..start + page.pixels.len()].iter_mut().zip(&page.pixels) {
            *dst = self.lut.mix(*dst, src, alpha);
        }
        Ok(())
    }
}

/// Copy every non-black canvas pixel over the camera image; black means
/// nothing was painted there and the camera shows through.
pub fn overlay_painted(frame: &mut FrameBuffer, canvas: &FrameBuffer) -> Result<(), Error> {
    if !frame.same_size(canvas) {
        return Err(Error::SizeMismatch(format!(
            "canvas {}x{} vs frame {}x{}",
            canvas.width, canvas.height, frame.width, frame.height
        )));
    }
    for (dst, &src) in frame.pixels.iter_mut().zip(&canvas.pixels) {
        if src != BLACK {
            *dst = src;
        }
    }
    Ok(())
}
