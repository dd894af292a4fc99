// End-to-end flows through the public API: detector output in, composited
// frame, canvas state and notifications out. No camera, window or network.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use beyond_the_brush::assets::generated_headers;
use beyond_the_brush::compositor::{Compositor, Scene};
use beyond_the_brush::export::{ExportDispatch, ExportJob};
use beyond_the_brush::gesture::{FingerState, INDEX_TIP, MIDDLE_TIP, TipSmoother, classify};
use beyond_the_brush::header::Layout;
use beyond_the_brush::landmarks::{DetectorConfig, parse_detection};
use beyond_the_brush::notify::NotificationCenter;
use beyond_the_brush::painter::{HandInput, Painter};
use beyond_the_brush::text::{KeyInput, TextInput, TextObject};
use beyond_the_brush::types::{BLACK, ERASER, FrameBuffer, PINK, Point};

const W: usize = 1280;
const H: usize = 720;

struct CountingExport(Rc<Cell<usize>>);

impl ExportDispatch for CountingExport {
    fn dispatch(&mut self, _job: ExportJob) {
        self.0.set(self.0.get() + 1);
    }
}

fn painter(guides: usize) -> (Painter, NotificationCenter, Rc<Cell<usize>>) {
    let center = NotificationCenter::new();
    let saves = Rc::new(Cell::new(0));
    let layout = Layout::new(W, H);
    let p = Painter::new(layout, 11, guides, center.notifier(), Box::new(CountingExport(Rc::clone(&saves))));
    (p, center, saves)
}

fn two_fingers(at: Point) -> HandInput {
    HandInput { fingers: FingerState([false, true, true, false, false]), index_tip: at, middle_tip: at + Point::new(30, 0) }
}

fn one_finger(at: Point) -> HandInput {
    HandInput { fingers: FingerState([false, true, false, false, false]), index_tip: at, middle_tip: at + Point::new(30, 40) }
}

/// Detector reply for one hand with index and middle raised, tips at the
/// given normalized positions.
fn peace_sign(index: (f32, f32), middle: (f32, f32)) -> String {
    let points: Vec<String> = (0..21)
        .map(|id| {
            let (x, y) = match id {
                INDEX_TIP => index,
                MIDDLE_TIP => middle,
                _ => (0.5, 0.5),
            };
            format!(r#"{{"x":{x},"y":{y},"z":0.0}}"#)
        })
        .collect();
    format!(r#"{{"hands":[{{"handedness":"Right","score":0.95,"landmarks":[{}]}}]}}"#, points.join(","))
}

#[test]
fn detected_peace_sign_over_eraser_button_selects_eraser() {
    let cfg = DetectorConfig { max_hands: 1, detection_confidence: 0.7, tracking_confidence: 0.5, downscale: None };
    // Button 5 spans x 640..768 on a 1280 wide header
    let line = peace_sign((0.55, 0.05), (0.57, 0.05));
    let hands = parse_detection(&line, W, H, &cfg).unwrap();
    let hand = hands.first();

    let c = classify(hand);
    assert!(!c.reset_smoothing);
    assert_eq!(c.fingers, FingerState([false, true, true, false, false]));

    let hand = hand.unwrap();
    let mut smoother = TipSmoother::new(3);
    let (index_tip, middle_tip) = smoother.smooth(hand.point(INDEX_TIP).unwrap(), hand.point(MIDDLE_TIP).unwrap());

    let (mut p, mut center, _) = painter(0);
    let mut frame = FrameBuffer::new(W, H);
    p.step(&mut frame, Some(HandInput { fingers: c.fingers, index_tip, middle_tip }), Instant::now());
    assert_eq!(p.header_index(), 6);
    assert_eq!(p.draw_color(), ERASER);

    let layout = *p.layout();
    let headers = generated_headers(&layout);
    let note = center.live(Instant::now()).cloned();
    assert_eq!(note.as_ref().map(|n| n.text.as_str()), Some("Eraser selected"));

    let mut shown = FrameBuffer::new(W, H);
    let scene = Scene {
        canvas: p.canvas(),
        header: headers.get(p.header_index()),
        text: p.text(),
        guide: None,
        notification: note.as_ref(),
    };
    Compositor::new(layout).compose(&mut shown, &scene).unwrap();
    assert_eq!(shown.get(5 * 128, 40), headers[6].get(5 * 128, 40));
}

#[test]
fn swipe_right_past_threshold_announces_first_page() {
    let (mut p, mut center, _) = painter(3);
    let now = Instant::now();
    let mut frame = FrameBuffer::new(W, H);
    // Guide button, then move down out of the header before swiping
    p.step(&mut frame, Some(two_fingers(Point::new(8 * 128 + 64, 30))), now);
    assert!(p.show_guide());
    p.step(&mut frame, Some(one_finger(Point::new(600, 400))), now);
    p.step(&mut frame, Some(one_finger(Point::new(660, 400))), now);
    assert_eq!(p.guide_index(), 0);
    assert_eq!(center.live(Instant::now()).map(|n| n.text.clone()), Some("Guide 1/3".to_string()));
}

#[test]
fn save_button_inside_cooldown_dispatches_once() {
    let (mut p, _, saves) = painter(0);
    let t0 = Instant::now();
    p.press(0, t0);
    p.press(0, t0 + Duration::from_millis(400));
    p.press(0, t0 + Duration::from_millis(900));
    assert_eq!(saves.get(), 1);
    p.press(0, t0 + Duration::from_millis(1100));
    assert_eq!(saves.get(), 2);
}

#[test]
fn undo_then_redo_restores_the_stroke() {
    let (mut p, _, _) = painter(0);
    let now = Instant::now();
    let mut frame = FrameBuffer::new(W, H);
    p.step(&mut frame, Some(one_finger(Point::new(300, 300))), now);
    p.step(&mut frame, Some(one_finger(Point::new(400, 300))), now);
    let drawn = p.canvas().clone();
    assert_eq!(drawn.get(350, 300), Some(PINK));

    assert!(p.undo());
    assert!(p.undo());
    assert!(p.canvas().pixels.iter().all(|&px| px == BLACK));
    assert!(p.redo());
    assert!(p.redo());
    assert_eq!(p.canvas(), &drawn);
    assert!(!p.redo());
}

#[test]
fn backspace_on_empty_buffer_changes_nothing() {
    let mut t = TextInput::new(W, H);
    t.set_active(true);
    let out = t.handle_key(KeyInput::Backspace, Instant::now());
    assert!(!out.snapshot);
    assert_eq!(t.buffer(), "");
    assert_eq!(t.object_count(), 0);
}

#[test]
fn deleting_last_character_of_selected_object_removes_it() {
    let mut t = TextInput::new(W, H);
    t.set_active(true);
    t.push_object(TextObject::new("a", Point::new(200, 300)));
    assert!(t.begin_drag(Point::new(203, 295)));
    t.end_drag();
    assert_eq!(t.selected_index(), Some(0));

    t.handle_key(KeyInput::Backspace, Instant::now());
    assert_eq!(t.object_count(), 0);
    assert!(t.selected_index().is_none());

    // Ctrl+Z brings it back
    t.handle_key(KeyInput::Undo, Instant::now() + Duration::from_secs(1));
    assert_eq!(t.objects().next().map(|o| o.text.as_str()), Some("a"));
}
