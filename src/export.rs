// Saving the drawing to a PNG off the frame-loop thread.
// The frame loop hands over an owned copy of the canvas and text objects;
// the worker never touches live state. Results come back as notifications.

use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use image::{ImageFormat, RgbImage};

use crate::auth::Profile;
use crate::error::Error;
use crate::font::draw_text_outlined;
use crate::notify::{LONG, Notifier};
use crate::text::TextObject;
use crate::tracking::ClickTracker;
use crate::types::{BLACK, FrameBuffer, WHITE, channels};
use crate::upload::{UploadRequest, UploadSink};

pub const SAVE_FOLDER: &str = "beyondthebrush_app_saved_canvas";
pub const SAVE_BUTTON: &str = "btb_saved_canvas";
pub const SAVE_PAGE: &str = "beyondthebrush_app";

/// Everything a save needs, copied out of the live state.
#[derive(Clone, Debug)]
pub struct ExportJob {
    pub canvas: FrameBuffer,
    pub texts: Vec<TextObject>,
    pub header_height: usize,
}

/// Where the painter sends save requests. It must return immediately.
pub trait ExportDispatch {
    fn dispatch(&mut self, job: ExportJob);
}

/// `<downloads>/beyondthebrush_app_saved_canvas`, with home or the working
/// directory standing in when the platform has no downloads folder.
pub fn default_export_dir() -> PathBuf {
    dirs_next::download_dir()
        .or_else(|| dirs_next::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SAVE_FOLDER)
}

pub fn export_file_name() -> String {
    Local::now().format("btb_saved_canvas_%Y%m%d_%H%M%S.png").to_string()
}

/// Flatten the drawing: paint over a white (or template) background, add
/// text below the header with a dark outline, then crop the header rows.
pub fn render_export(job: &ExportJob, template: Option<&FrameBuffer>) -> FrameBuffer {
    let (w, h) = (job.canvas.width, job.canvas.height);
    let mut sheet = match template {
        Some(t) if t.width == w && t.height == h => t.clone(),
        _ => FrameBuffer::filled(w, h, WHITE),
    };
    for (dst, &src) in sheet.pixels.iter_mut().zip(&job.canvas.pixels) {
        if src != BLACK {
            *dst = src;
        }
    }
    for obj in job.texts.iter().filter(|o| o.position.y > job.header_height as i32) {
        draw_text_outlined(&mut sheet, obj.position.x, obj.position.y, &obj.text, obj.color, obj.scale, obj.thickness, 1);
    }

    let top = job.header_height.min(h);
    FrameBuffer { width: w, height: h - top, pixels: sheet.pixels[top * w..].to_vec() }
}

pub fn encode_png(fb: &FrameBuffer) -> Result<Vec<u8>, Error> {
    let img = RgbImage::from_fn(fb.width as u32, fb.height as u32, |x, y| {
        let (r, g, b) = channels(fb.pixels[y as usize * fb.width + x as usize]);
        image::Rgb([r, g, b])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Uploads go out under this identity.
#[derive(Clone)]
pub struct UploadTarget {
    pub sink: Arc<dyn UploadSink>,
    pub profile: Profile,
}

pub struct Exporter {
    dir: PathBuf,
    template: Option<FrameBuffer>,
    notifier: Notifier,
    tracker: Arc<ClickTracker>,
    upload: Option<UploadTarget>,
}

impl Exporter {
    pub fn new(dir: PathBuf, notifier: Notifier, tracker: Arc<ClickTracker>) -> Self {
        Self { dir, template: None, notifier, tracker, upload: None }
    }

    pub fn with_template(mut self, template: Option<FrameBuffer>) -> Self {
        self.template = template;
        self
    }

    pub fn with_upload(mut self, upload: Option<UploadTarget>) -> Self {
        self.upload = upload;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render, encode and write one export; returns the file written.
    pub fn export_blocking(&self, job: &ExportJob) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.dir)?;
        let sheet = render_export(job, self.template.as_ref());
        let bytes = encode_png(&sheet)?;
        let path = self.dir.join(export_file_name());
        std::fs::write(&path, &bytes)?;
        tracing::info!("canvas saved to {}", path.display());

        self.tracker.track(SAVE_BUTTON, SAVE_PAGE);
        if let Some(target) = &self.upload {
            let req = UploadRequest {
                user_email: target.profile.email.clone(),
                user_role: target.profile.role,
                file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                image: bytes,
            };
            if let Err(e) = target.sink.upload(&req) {
                tracing::warn!("upload of {} failed: {e}", req.file_name);
            }
        }
        Ok(path)
    }

    /// Export and post the outcome; panics are caught and reported as failures.
    pub fn run(&self, job: &ExportJob) {
        match catch_unwind(AssertUnwindSafe(|| self.export_blocking(job))) {
            Ok(Ok(_)) => self.notifier.post("Image Saved!", LONG),
            Ok(Err(e)) => {
                tracing::warn!("error saving canvas: {e}");
                self.notifier.post("Error saving image!", LONG);
            }
            Err(_) => {
                tracing::error!("export worker panicked");
                self.notifier.post("Error saving image!", LONG);
            }
        }
    }
}

/// Runs every export on its own short-lived thread.
pub struct BackgroundExporter {
    exporter: Arc<Exporter>,
}

impl BackgroundExporter {
    pub fn new(exporter: Exporter) -> Self {
        Self { exporter: Arc::new(exporter) }
    }
}

impl ExportDispatch for BackgroundExporter {
    fn dispatch(&mut self, job: ExportJob) {
        let exporter = Arc::clone(&self.exporter);
        let spawned = std::thread::Builder::new().name("export".into()).spawn(move || exporter.run(&job));
        if let Err(e) = spawned {
            tracing::error!("could not start export thread: {e}");
            self.exporter.notifier.post("Error saving image!", LONG);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationCenter;
    use crate::types::{PINK, Point};
    use tempfile::tempdir;

    fn job() -> ExportJob {
        let mut canvas = FrameBuffer::new(40, 30);
        canvas.pixels[15 * 40 + 20] = PINK;
        canvas.pixels[2 * 40 + 2] = PINK; // inside the header band
        ExportJob { canvas, texts: Vec::new(), header_height: 10 }
    }

    #[test]
    fn header_rows_are_cropped_and_background_is_white() {
        let sheet = render_export(&job(), None);
        assert_eq!((sheet.width, sheet.height), (40, 20));
        assert_eq!(sheet.get(20, 5), Some(PINK));
        assert_eq!(sheet.get(0, 0), Some(WHITE));
        assert!(sheet.pixels.iter().filter(|&&p| p == PINK).count() == 1);
    }

    #[test]
    fn template_replaces_white() {
        let template = FrameBuffer::filled(40, 30, 0x00_11_22_33);
        let sheet = render_export(&job(), Some(&template));
        assert_eq!(sheet.get(0, 0), Some(0x00_11_22_33));
        assert_eq!(sheet.get(20, 5), Some(PINK));
    }

    #[test]
    fn only_text_below_header_is_kept() {
        let mut j = ExportJob { canvas: FrameBuffer::new(200, 100), texts: Vec::new(), header_height: 40 };
        j.texts.push(TextObject::new("hi", Point::new(10, 30)));
        let sheet = render_export(&j, None);
        assert!(sheet.pixels.iter().all(|&p| p == WHITE));
        j.texts.push(TextObject::new("hi", Point::new(10, 90)));
        let sheet = render_export(&j, None);
        assert!(sheet.pixels.iter().any(|&p| p != WHITE));
    }

    #[test]
    fn export_writes_png_and_reports_success() {
        let dir = tempdir().unwrap();
        let mut center = NotificationCenter::new();
        let exporter = Exporter::new(dir.path().join(SAVE_FOLDER), center.notifier(), Arc::new(ClickTracker::offline()));
        exporter.run(&job());

        let files: Vec<_> = std::fs::read_dir(exporter.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("btb_saved_canvas_") && name.ends_with(".png"));
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (40, 20));
        assert_eq!(center.live(std::time::Instant::now()).unwrap().text, "Image Saved!");
    }

    #[test]
    fn unwritable_target_reports_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        let mut center = NotificationCenter::new();
        let exporter = Exporter::new(blocker.join(SAVE_FOLDER), center.notifier(), Arc::new(ClickTracker::offline()));
        exporter.run(&job());
        assert_eq!(center.live(std::time::Instant::now()).unwrap().text, "Error saving image!");
    }
}
