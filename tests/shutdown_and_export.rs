use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use beyond_the_brush::camera::{FrameSource, Reconnecting};
use beyond_the_brush::config::{SettingsSpec, SizeConfig};
use beyond_the_brush::error::Error;
use beyond_the_brush::export::{ExportJob, Exporter};
use beyond_the_brush::lifecycle::Cleanup;
use beyond_the_brush::notify::NotificationCenter;
use beyond_the_brush::text::TextObject;
use beyond_the_brush::tracking::ClickTracker;
use beyond_the_brush::types::{FrameBuffer, PINK, Point, WHITE, rgb};
use tempfile::tempdir;

/// Delivers a couple of frames, then behaves like an unplugged device.
struct Flaky {
    frames: u32,
    released: Rc<Cell<u32>>,
}

impl FrameSource for Flaky {
    fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        if self.frames == 0 {
            return Err(Error::CameraFrame("device vanished".into()));
        }
        self.frames -= 1;
        Ok(FrameBuffer::new(8, 6))
    }

    fn resolution(&self) -> (u32, u32) {
        (8, 6)
    }
}

impl Drop for Flaky {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

#[test]
fn lost_camera_triggers_cleanup_exactly_once() {
    let released = Rc::new(Cell::new(0));
    let opens = Rc::new(Cell::new(0));
    let (r, o) = (Rc::clone(&released), Rc::clone(&opens));
    let camera = Reconnecting::new(move || {
        o.set(o.get() + 1);
        if o.get() == 1 {
            Ok(Flaky { frames: 2, released: Rc::clone(&r) })
        } else {
            Err(Error::CameraInit("no device".into()))
        }
    })
    .unwrap()
    .with_pause(Duration::ZERO);

    let window_closed = Rc::new(Cell::new(0));
    let mut cleanup = Cleanup::new();
    let closed = Rc::clone(&window_closed);
    cleanup.register("main window", move || closed.set(closed.get() + 1));
    let camera = cleanup.hold("camera", camera);

    let mut frames = 0;
    let outcome = loop {
        let polled = camera.get_mut().map(|mut c| c.poll());
        match polled {
            Some(Ok(Some(_))) => frames += 1,
            Some(Ok(None)) => {}
            Some(Err(e)) => break e,
            None => panic!("camera released before it was lost"),
        }
    };
    assert!(matches!(outcome, Error::CameraLost { attempts: 1 }));
    assert_eq!(frames, 2);
    assert_eq!(opens.get(), 2);
    // The failed device was dropped before reopening
    assert_eq!(released.get(), 1);

    cleanup.run();
    cleanup.run();
    drop(cleanup);
    assert_eq!(window_closed.get(), 1);
    assert!(camera.is_released());
}

#[test]
fn export_writes_cropped_png_and_reports_success() {
    let dir = tempdir().unwrap();
    let mut center = NotificationCenter::new();
    let exporter = Exporter::new(dir.path().join("saves"), center.notifier(), Arc::new(ClickTracker::offline()));

    let mut canvas = FrameBuffer::new(64, 48);
    for x in 10..20 {
        canvas.pixels[30 * 64 + x] = PINK;
    }
    let job = ExportJob { canvas, texts: vec![TextObject::new("hi", Point::new(40, 45))], header_height: 8 };
    exporter.run(&job);

    let files: Vec<_> = std::fs::read_dir(exporter.dir()).unwrap().filter_map(Result::ok).collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().to_string_lossy().into_owned();
    assert!(name.starts_with("btb_saved_canvas_") && name.ends_with(".png"), "{name}");

    let img = image::open(files[0].path()).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (64, 40));
    let px = img.get_pixel(15, 22);
    assert_eq!(rgb(px[0], px[1], px[2]), PINK);
    let corner = img.get_pixel(63, 0);
    assert_eq!(rgb(corner[0], corner[1], corner[2]), WHITE);

    center.pump();
    assert_eq!(center.live(Instant::now()).map(|n| n.text.clone()), Some("Image Saved!".to_string()));
}

#[test]
fn export_into_unwritable_location_reports_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "file in the way").unwrap();

    let mut center = NotificationCenter::new();
    let exporter = Exporter::new(blocker.join("saves"), center.notifier(), Arc::new(ClickTracker::offline()));
    exporter.run(&ExportJob { canvas: FrameBuffer::new(4, 4), texts: Vec::new(), header_height: 1 });

    center.pump();
    assert_eq!(center.live(Instant::now()).map(|n| n.text.clone()), Some("Error saving image!".to_string()));
}

#[test]
fn size_config_survives_a_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("size_config.json");
    let spec = SettingsSpec::default();
    SizeConfig { brush_size: 25, eraser_size: 150 }.save(&path).unwrap();
    assert_eq!(SizeConfig::load(&path, &spec), SizeConfig { brush_size: 25, eraser_size: 150 });

    std::fs::write(&path, r#"{"brush_size": 900}"#).unwrap();
    assert_eq!(SizeConfig::load(&path, &spec), SizeConfig { brush_size: 200, eraser_size: 100 });
}
