// Opens the webcam and turns its frames into mirrored 0x00RRGGBB buffers.
// `Reconnecting` wraps any frame source with the reinitialization policy:
// one reopen after a short pause per failure, then give up.

use std::thread;
use std::time::Duration;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};

use crate::assets::frame_from_rgb;
use crate::error::Error;
use crate::types::FrameBuffer;

/// Pause before reopening a camera that stopped delivering frames.
pub const REINIT_PAUSE: Duration = Duration::from_millis(100);
pub const REINIT_ATTEMPTS: u32 = 1;

/// Anything that hands out camera-sized frames.
pub trait FrameSource {
    /// Blocks until a frame is available.
    fn next_frame(&mut self) -> Result<FrameBuffer, Error>;
    fn resolution(&self) -> (u32, u32);
}

pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index` asking for the closest mode to `width` x `height`
    /// at `fps`. The device may pick another size; `resolution` reports it.
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, Error> {
        let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, fps);
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::CameraInit(format!("create camera {index}: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("open stream: {e}")))?;

        let actual = cam.resolution();
        tracing::info!(index, width = actual.width(), height = actual.height(), "camera opened");
        Ok(Self { cam, width: actual.width(), height: actual.height() })
    }
}

impl FrameSource for CameraCapture {
    fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self.cam.frame().map_err(|e| Error::CameraFrame(format!("fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("decode rgb: {e}")))?;
        let mut fb = frame_from_rgb(&rgb);
        // Mirror so moving your hand right moves the stroke right
        fb.flip_horizontal();
        Ok(fb)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            tracing::debug!("stopping camera stream: {e}");
        }
    }
}

/// A frame source that reopens itself once when a read fails.
pub struct Reconnecting<S, F> {
    source: Option<S>,
    open: F,
    pause: Duration,
}

impl<S, F> Reconnecting<S, F>
where
    S: FrameSource,
    F: FnMut() -> Result<S, Error>,
{
    /// Open the first source right away; that failure is fatal to the caller.
    pub fn new(mut open: F) -> Result<Self, Error> {
        let source = open()?;
        Ok(Self { source: Some(source), open, pause: REINIT_PAUSE })
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(FrameSource::resolution)
    }

    /// Next frame, or `Ok(None)` when this frame was lost but the source was
    /// reopened (the caller skips the frame). `CameraLost` once reopening fails.
    pub fn poll(&mut self) -> Result<Option<FrameBuffer>, Error> {
        let Some(source) = self.source.as_mut() else {
            return Err(Error::CameraLost { attempts: 0 });
        };
        let err = match source.next_frame() {
            Ok(frame) => return Ok(Some(frame)),
            Err(e) => e,
        };
        tracing::warn!("camera read failed: {err}; reinitializing");

        // Release the old handle before opening the device again
        self.source = None;
        for attempt in 1..=REINIT_ATTEMPTS {
            thread::sleep(self.pause);
            match (self.open)() {
                Ok(s) => {
                    tracing::info!(attempt, "camera reinitialized");
                    self.source = Some(s);
                    return Ok(None);
                }
                Err(e) => tracing::warn!(attempt, "camera reinitialization failed: {e}"),
            }
        }
        Err(Error::CameraLost { attempts: REINIT_ATTEMPTS })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Yields `frames` good frames, then fails forever.
    struct FakeCamera {
        frames: u32,
    }

    impl FrameSource for FakeCamera {
        fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
            if self.frames == 0 {
                return Err(Error::CameraFrame("unplugged".into()));
            }
            self.frames -= 1;
            Ok(FrameBuffer::new(4, 3))
        }

        fn resolution(&self) -> (u32, u32) {
            (4, 3)
        }
    }

    #[test]
    fn reopen_skips_the_failed_frame() {
        let opens = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opens);
        let mut cam = Reconnecting::new(move || {
            counter.set(counter.get() + 1);
            Ok(FakeCamera { frames: if counter.get() == 1 { 1 } else { 5 } })
        })
        .unwrap()
        .with_pause(Duration::ZERO);

        assert!(cam.poll().unwrap().is_some());
        assert!(cam.poll().unwrap().is_none());
        assert_eq!(opens.get(), 2);
        assert!(cam.poll().unwrap().is_some());
    }

    #[test]
    fn failed_reopen_reports_camera_lost() {
        let mut first = true;
        let mut cam = Reconnecting::new(move || {
            if std::mem::take(&mut first) {
                Ok(FakeCamera { frames: 0 })
            } else {
                Err(Error::CameraInit("gone".into()))
            }
        })
        .unwrap()
        .with_pause(Duration::ZERO);

        assert!(matches!(cam.poll(), Err(Error::CameraLost { attempts: 1 })));
        assert!(cam.resolution().is_none());
        assert!(matches!(cam.poll(), Err(Error::CameraLost { .. })));
    }
}
