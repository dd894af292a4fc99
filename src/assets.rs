// Header strips, guide pages and the export template, loaded from disk and
// resized once to the active layout. Missing assets are never fatal: the
// header falls back to a generated strip, guides and template to nothing.

use std::path::{Path, PathBuf};

use image::RgbImage;
use image::imageops::FilterType;

use crate::draw::{draw_rect, fill_rect};
use crate::error::Error;
use crate::font::{draw_text, text_size};
use crate::header::{BUTTON_COUNT, HEADER_ACTIONS, HeaderAction, Layout};
use crate::types::{ERASER, FrameBuffer, Rect, WHITE, rgb};

pub const HEADER_DIR: &str = "header";
pub const GUIDE_DIR: &str = "guide";
pub const TEMPLATE_FILE: &str = "template.png";

const STRIP_BG: u32 = rgb(40, 40, 40);
const HIGHLIGHT: u32 = rgb(255, 255, 255);

/// Pack an RGB image into a 0x00RRGGBB buffer.
pub fn frame_from_rgb(img: &RgbImage) -> FrameBuffer {
    let (w, h) = img.dimensions();
    let pixels = img.pixels().map(|p| rgb(p[0], p[1], p[2])).collect();
    FrameBuffer { width: w as usize, height: h as usize, pixels }
}

/// Decode `path` and stretch it to exactly `width` x `height`.
pub fn load_resized(path: &Path, width: usize, height: usize) -> Result<FrameBuffer, Error> {
    let img = image::open(path)?;
    let img = img.resize_exact(width as u32, height as u32, FilterType::Triangle).to_rgb8();
    Ok(frame_from_rgb(&img))
}

/// Image files in `dir`, sorted by file name.
fn image_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load every image in `dir` at the given size. Unreadable files are
/// skipped with a warning; a missing folder yields an empty list.
pub fn load_folder(dir: &Path, width: usize, height: usize) -> Vec<FrameBuffer> {
    let files = match image_files(dir) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("asset folder {} unavailable: {e}", dir.display());
            return Vec::new();
        }
    };
    files
        .iter()
        .filter_map(|path| match load_resized(path, width, height) {
            Ok(fb) => Some(fb),
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                None
            }
        })
        .collect()
}

fn button_label(action: HeaderAction) -> &'static str {
    match action {
        HeaderAction::Save => "SAVE",
        HeaderAction::SelectColor(_) => "",
        HeaderAction::SelectEraser => "ERASE",
        HeaderAction::Undo => "UNDO",
        HeaderAction::Redo => "REDO",
        HeaderAction::ToggleGuide => "GUIDE",
        HeaderAction::ToggleKeyboard => "TEXT",
    }
}

/// Header set drawn in code: entry 0 is the plain strip, entry `i + 1`
/// highlights button `i`.
pub fn generated_headers(layout: &Layout) -> Vec<FrameBuffer> {
    let (w, h) = (layout.width, layout.header_height);
    let bw = layout.button_width() as i32;
    let hh = h as i32;

    let mut base = FrameBuffer::filled(w, h, STRIP_BG);
    for (i, &action) in HEADER_ACTIONS.iter().enumerate() {
        let left = i as i32 * bw;
        let pad = (bw / 8).max(2);
        let cell = Rect { left: left + pad, top: pad, right: left + bw - pad, bottom: hh - pad };
        match action {
            HeaderAction::SelectColor(color) => fill_rect(&mut base, cell, color),
            HeaderAction::SelectEraser => {
                fill_rect(&mut base, cell, ERASER);
                draw_rect(&mut base, cell, 1, WHITE);
            }
            _ => {}
        }
        let label = button_label(action);
        if !label.is_empty() {
            let scale = if bw >= 100 { 2 } else { 1 };
            let (tw, th) = text_size(label, scale);
            draw_text(&mut base, left + (bw - tw) / 2, (hh + th) / 2, label, WHITE, scale, 1);
        }
    }

    let mut headers = vec![base.clone()];
    for i in 0..BUTTON_COUNT as i32 {
        let mut lit = base.clone();
        let frame = Rect { left: i * bw, top: 0, right: (i + 1) * bw - 1, bottom: hh - 1 };
        draw_rect(&mut lit, frame, 3, HIGHLIGHT);
        headers.push(lit);
    }
    headers
}

pub struct Assets {
    pub headers: Vec<FrameBuffer>,
    pub guides: Vec<FrameBuffer>,
    pub template: Option<FrameBuffer>,
}

impl Assets {
    /// Load `header/`, `guide/` and `template.png` from `root`.
    pub fn load(root: &Path, layout: &Layout) -> Self {
        let mut headers = load_folder(&root.join(HEADER_DIR), layout.width, layout.header_height);
        if headers.is_empty() {
            tracing::warn!("no header images found; using generated header");
            headers = generated_headers(layout);
        }

        let guide_h = layout.height.saturating_sub(layout.header_height).max(1);
        let guides = load_folder(&root.join(GUIDE_DIR), layout.width, guide_h);

        let template_path = root.join(TEMPLATE_FILE);
        let template = if template_path.exists() {
            load_resized(&template_path, layout.width, layout.height)
                .inspect_err(|e| tracing::warn!("template unusable: {e}"))
                .ok()
        } else {
            None
        };

        tracing::info!(headers = headers.len(), guides = guides.len(), template = template.is_some(), "assets loaded");
        Self { headers, guides, template }
    }
}
