// What you SEE:
// • The mirrored camera image with your strokes on top and the tool header
//   across the top.
// • Index + middle finger up: hover a header button to pick it.
// • Index finger alone: draw (or swipe between guide pages while they show).
// • A small second window holds the brush/eraser size sliders.
// • ESC closes keyboard mode, or quits when it is not open.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;

use beyond_the_brush::assets::Assets;
use beyond_the_brush::auth::{Authenticator, JsonUserStore, Profile, Role};
use beyond_the_brush::camera::{CameraCapture, Reconnecting};
use beyond_the_brush::compositor::{Compositor, Scene};
use beyond_the_brush::config::{CONFIG_FILE, SettingsSpec, SizeConfig};
use beyond_the_brush::draw::Drawer;
use beyond_the_brush::error::Error;
use beyond_the_brush::export::{BackgroundExporter, Exporter, UploadTarget, default_export_dir};
use beyond_the_brush::gesture::{INDEX_TIP, MIDDLE_TIP, TipSmoother, classify};
use beyond_the_brush::header::Layout;
use beyond_the_brush::landmarks::{DetectorConfig, HelperProcess, LandmarkProvider, NoHands};
use beyond_the_brush::lifecycle::{Cleanup, Held};
use beyond_the_brush::logging;
use beyond_the_brush::notify::{LONG, NotificationCenter};
use beyond_the_brush::painter::{HandInput, KeyResponse, Painter};
use beyond_the_brush::profile::SystemProfile;
use beyond_the_brush::settings_window::{SettingsEvent, SettingsWindow};
use beyond_the_brush::tracking::{ClickTracker, DEFAULT_BASE_URL};
use beyond_the_brush::types::FrameBuffer;
use beyond_the_brush::upload::HttpUploadSink;

/// Signed-in user from the last successful login.
const USER_DATA_FILE: &str = "user_data.json";
const SMOOTHING_WINDOW: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "beyond-the-brush", version, about = "Draw in the air in front of your webcam")]
struct Cli {
    /// Camera device index
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Folder holding header/, guide/ and template.png
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Brush/eraser size file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Hand detector command (program and arguments)
    #[arg(long, env = "BTB_DETECTOR")]
    detector: Option<String>,

    #[arg(long, env = "BTB_TRACKING_URL", default_value = DEFAULT_BASE_URL)]
    tracking_url: String,

    /// Where saved canvases are uploaded for signed-in users
    #[arg(long, env = "BTB_UPLOAD_URL")]
    upload_url: Option<String>,

    /// JSON user store for signing in
    #[arg(long, env = "BTB_USERS")]
    users: Option<PathBuf>,

    #[arg(long, env = "BTB_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "BTB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, value_enum, default_value_t = Role::Student)]
    role: Role,

    /// Verbose logging; RUST_LOG is honoured too
    #[arg(long)]
    debug: bool,
}

/// Sign in with the given credentials, or pick up the saved session.
fn sign_in(cli: &Cli) -> Result<Option<Profile>, String> {
    let (Some(users), Some(email), Some(password)) = (&cli.users, &cli.email, &cli.password) else {
        return Ok(Profile::load(Path::new(USER_DATA_FILE)).ok());
    };
    let store = JsonUserStore::open(users).map_err(|e| format!("user store unavailable: {e}"))?;
    let profile = Authenticator::new(store).authenticate(email, password, cli.role).map_err(|e| e.to_string())?;
    if let Err(e) = profile.save(Path::new(USER_DATA_FILE)) {
        tracing::warn!("could not remember session: {e}");
    }
    tracing::info!(email = %profile.email, role = %profile.role, "signed in");
    Ok(Some(profile))
}

fn start_detector(cli: &Cli, profile: &SystemProfile) -> Box<dyn LandmarkProvider> {
    let Some(command) = &cli.detector else {
        tracing::warn!("no hand detector configured (--detector); gestures are disabled");
        return Box::new(NoHands);
    };
    match HelperProcess::spawn(command, DetectorConfig::from(profile)) {
        Ok(p) => Box::new(p),
        Err(e) => {
            tracing::warn!("hand detector unavailable: {e}");
            Box::new(NoHands)
        }
    }
}

/// Detect, classify and smooth the first hand in `frame`.
fn read_hand(detector: &mut dyn LandmarkProvider, frame: &FrameBuffer, smoother: &mut TipSmoother) -> Option<HandInput> {
    if let Err(e) = detector.detect(frame) {
        tracing::warn!("detection failed: {e}");
        smoother.reset();
        return None;
    }
    let hand = detector.find(0);
    let c = classify(hand);
    if c.reset_smoothing {
        smoother.reset();
        return None;
    }
    let hand = hand?;
    let (index_tip, middle_tip) = smoother.smooth(hand.point(INDEX_TIP)?, hand.point(MIDDLE_TIP)?);
    Some(HandInput { fingers: c.fingers, index_tip, middle_tip })
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let profile = SystemProfile::detect();
    let mut cleanup = Cleanup::new();

    /* --- Camera + window ---
       Visual: window opens at whatever size the camera settles on. */
    let (index, fps) = (cli.camera, profile.fps);
    let (want_w, want_h) = (profile.width, profile.height);
    let camera = Reconnecting::new(move || CameraCapture::open(index, want_w, want_h, fps))?;
    let (w, h) = camera.resolution().unwrap_or((want_w, want_h));
    let window = cleanup.hold("main window", Drawer::new("Beyond The Brush", w as usize, h as usize)?);
    let camera = cleanup.hold("camera", camera);

    let layout = Layout::new(w as usize, h as usize);
    let assets = Assets::load(&cli.assets, &layout);
    let mut center = NotificationCenter::new();

    /* --- Session, tracking, export --- */
    let session = match sign_in(&cli) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("sign-in failed: {e}");
            center.notifier().post("Sign-in failed", LONG);
            None
        }
    };

    let tracker = Arc::new(ClickTracker::http(&cli.tracking_url));
    let probe = Arc::clone(&tracker);
    if let Err(e) = thread::Builder::new().name("tracking-probe".into()).spawn(move || {
        probe.check_connection();
    }) {
        tracing::warn!("could not start tracking probe: {e}");
    }

    let upload = match (&cli.upload_url, session) {
        (Some(url), Some(profile)) => match HttpUploadSink::new(url) {
            Ok(sink) => Some(UploadTarget { sink: Arc::new(sink), profile }),
            Err(e) => {
                tracing::warn!("uploads disabled: {e}");
                None
            }
        },
        _ => None,
    };
    let exporter = Exporter::new(default_export_dir(), center.notifier(), tracker)
        .with_template(assets.template.clone())
        .with_upload(upload);

    let mut painter = Painter::new(
        layout,
        assets.headers.len(),
        assets.guides.len(),
        center.notifier(),
        Box::new(BackgroundExporter::new(exporter)),
    );

    /* --- Sizes + settings panel --- */
    let spec = SettingsSpec::default();
    let sizes = SizeConfig::load(&cli.config, &spec);
    painter.set_sizes(sizes.brush_size, sizes.eraser_size);
    let mut settings: Option<Held<SettingsWindow>> = match SettingsWindow::open(spec, sizes, cli.config.clone()) {
        Ok(s) => Some(cleanup.hold("settings window", s)),
        Err(e) => {
            tracing::warn!("settings window unavailable: {e}");
            None
        }
    };

    let detector = cleanup.hold("hand detector", start_detector(&cli, &profile));
    let compositor = Compositor::new(layout);
    let mut smoother = TipSmoother::new(SMOOTHING_WINDOW);
    let interval = profile.frame_interval();
    let process_every = profile.process_every.max(1) as u64;
    let mut frame_no: u64 = 0;
    let mut last_tick = Instant::now();
    // Shown again whenever a camera frame is skipped, so the window keeps pumping events
    let mut shown = FrameBuffer::new(layout.width, layout.height);

    /* ------------------------------ Main loop ------------------------------ */
    loop {
        let now = Instant::now();
        let dt = (now - last_tick).as_secs_f32(); // drives caret blink + text animations
        last_tick = now;

        match window.get_mut() {
            Some(win) if win.is_open() => {}
            _ => break,
        }

        /* 1) Live frame. A lost frame after a successful reopen is skipped. */
        let polled = match camera.get_mut() {
            Some(mut cam) => cam.poll(),
            None => break,
        };
        let mut fresh = match polled {
            Ok(frame) => frame,
            Err(e @ Error::CameraLost { .. }) => {
                tracing::error!("{e}; shutting down");
                cleanup.run();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("skipping frame: {e}");
                None
            }
        };

        /* 2) Hand → mode machine (every n-th frame on slow machines). */
        if let Some(frame) = fresh.as_mut() {
            if !frame.same_size(painter.canvas()) {
                // A reopened camera may settle on another mode; the canvas keeps its size
                tracing::debug!(width = frame.width, height = frame.height, "scaling camera frame to canvas");
                *frame = frame.resized(layout.width, layout.height);
            }
            if frame_no % process_every == 0 {
                let hand = match detector.get_mut() {
                    Some(mut d) => read_hand(&mut **d, frame, &mut smoother),
                    None => None,
                };
                painter.step(frame, hand, now);
            }
            frame_no += 1;
        }

        /* 3) Keys */
        let keys = window.get_mut().map(|mut w| w.key_events()).unwrap_or_default();
        let mut quit = false;
        for key in keys {
            if painter.handle_key(key, now) == KeyResponse::Quit {
                quit = true;
            }
        }
        painter.tick(dt);
        center.pump();

        /* 4) Compose + present */
        if let Some(mut frame) = fresh {
            let guide = if painter.show_guide() {
                assets.guides.get(painter.guide_index()).map(|g| (g, painter.guide_index(), assets.guides.len()))
            } else {
                None
            };
            let scene = Scene {
                canvas: painter.canvas(),
                header: assets.headers.get(painter.header_index()),
                text: painter.text(),
                guide,
                notification: center.live(now),
            };
            match compositor.compose(&mut frame, &scene) {
                Ok(()) => shown = frame,
                Err(e) => tracing::warn!("compose failed: {e}"),
            }
        }
        if let Some(mut win) = window.get_mut() {
            if let Err(e) = win.present(&shown) {
                tracing::warn!("{e}");
            }
        }

        /* 5) Settings panel shares this thread */
        if let Some(held) = &settings {
            let event = held.get_mut().and_then(|mut s| s.poll());
            match event {
                Some(SettingsEvent::Live(s) | SettingsEvent::Applied(s)) => painter.set_sizes(s.brush_size, s.eraser_size),
                Some(SettingsEvent::Closed(s)) => {
                    painter.set_sizes(s.brush_size, s.eraser_size);
                    held.release();
                    settings = None;
                }
                None => {}
            }
        }

        if quit {
            break;
        }

        /* 6) Cap the frame rate */
        let spent = now.elapsed();
        if spent < interval {
            thread::sleep(interval - spent);
        }
    }

    cleanup.run();
    Ok(())
}
