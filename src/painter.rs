// The per-frame gesture state machine.
// `Painter` owns the drawing session: canvas, text objects, undo history and
// the transient draw state. Each frame it resolves exactly one `Mode` from
// the finger state and where the index tip is, then applies that mode.

use std::time::{Duration, Instant};

use crate::draw::{draw_circle, fill_circle, fill_rect};
use crate::export::{ExportDispatch, ExportJob};
use crate::font::draw_text;
use crate::gesture::FingerState;
use crate::header::{HEADER_ACTIONS, HeaderAction, Layout, header_for_region};
use crate::history::{History, MAX_UNDO, Snapshot};
use crate::notify::{Notifier, SHORT};
use crate::stroke::{Tool, stroke};
use crate::text::{KeyInput, TextInput};
use crate::types::{BLACK, ERASER, FrameBuffer, GREEN, PINK, Point, Rect, WHITE, YELLOW};

pub const SWIPE_THRESHOLD: i32 = 50;
pub const SAVE_COOLDOWN: Duration = Duration::from_secs(1);
const TIP_MARKER_RADIUS: i32 = 15;
const GUIDE_CURSOR_RADIUS: i32 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Selection,
    Drawing,
    GuideNav,
    TextDrag,
}

/// Smoothed fingertips plus finger state for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandInput {
    pub fingers: FingerState,
    pub index_tip: Point,
    pub middle_tip: Point,
}

/// Which mode a frame runs in. Two raised fingers select tools, except that
/// with the keyboard open they drag text unless the tip is in the header.
/// The index finger alone draws, or swipes through guides while they show.
pub fn resolve_mode(hand: Option<&HandInput>, layout: &Layout, keyboard_active: bool, show_guide: bool) -> Mode {
    let Some(hand) = hand else { return Mode::Idle };
    let f = hand.fingers;
    if f.index() && f.middle() {
        if keyboard_active && !layout.in_header(hand.index_tip) {
            Mode::TextDrag
        } else {
            Mode::Selection
        }
    } else if f.index() && !keyboard_active {
        if show_guide { Mode::GuideNav } else { Mode::Drawing }
    } else {
        Mode::Idle
    }
}

/// What the frame loop should do after a key was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyResponse {
    Continue,
    Quit,
}

pub struct Painter {
    layout: Layout,
    canvas: FrameBuffer,
    text: TextInput,
    history: History<Snapshot>,
    draw_color: u32,
    brush_size: u32,
    eraser_size: u32,
    prev: Option<Point>,
    swipe_start: Option<i32>,
    show_guide: bool,
    guide_index: usize,
    guide_count: usize,
    header_index: usize,
    header_count: usize,
    hovered: Option<usize>,
    last_save: Option<Instant>,
    mode: Mode,
    notifier: Notifier,
    exporter: Box<dyn ExportDispatch>,
}

impl Painter {
    pub fn new(
        layout: Layout,
        header_count: usize,
        guide_count: usize,
        notifier: Notifier,
        exporter: Box<dyn ExportDispatch>,
    ) -> Self {
        Self {
            canvas: FrameBuffer::new(layout.width, layout.height),
            text: TextInput::new(layout.width, layout.height),
            history: History::new(MAX_UNDO),
            draw_color: PINK,
            brush_size: crate::config::DEFAULT_BRUSH_SIZE,
            eraser_size: crate::config::DEFAULT_ERASER_SIZE,
            prev: None,
            swipe_start: None,
            show_guide: false,
            guide_index: 0,
            guide_count,
            header_index: 0,
            header_count,
            hovered: None,
            last_save: None,
            mode: Mode::Idle,
            notifier,
            exporter,
            layout,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }

    /// Paint a background template into the canvas (export artwork).
    pub fn canvas_mut(&mut self) -> &mut FrameBuffer {
        &mut self.canvas
    }

    pub fn text(&self) -> &TextInput {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut TextInput {
        &mut self.text
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn draw_color(&self) -> u32 {
        self.draw_color
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn eraser_size(&self) -> u32 {
        self.eraser_size
    }

    pub fn set_sizes(&mut self, brush: u32, eraser: u32) {
        self.brush_size = brush.max(1);
        self.eraser_size = eraser.max(1);
    }

    pub fn header_index(&self) -> usize {
        self.header_index
    }

    pub fn show_guide(&self) -> bool {
        self.show_guide
    }

    pub fn guide_index(&self) -> usize {
        self.guide_index
    }

    pub fn guide_count(&self) -> usize {
        self.guide_count
    }

    pub fn keyboard_active(&self) -> bool {
        self.text.is_active()
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    fn live_state(&self) -> Snapshot {
        Snapshot { canvas: self.canvas.clone(), texts: self.text.snapshot_objects() }
    }

    fn restore(&mut self, state: Snapshot) {
        if state.canvas.same_size(&self.canvas) {
            self.canvas = state.canvas;
        } else {
            tracing::warn!("discarding snapshot with mismatched canvas size");
        }
        self.text.replace_objects(state.texts);
    }

    /// Push the current canvas and text objects as a new undo step.
    pub fn snapshot(&mut self) {
        let state = self.live_state();
        self.history.snapshot(state);
    }

    pub fn undo(&mut self) -> bool {
        let live = self.live_state();
        match self.history.undo(&live) {
            Some(state) => {
                self.restore(state);
                self.notifier.post("Undo", SHORT);
                true
            }
            None => {
                self.notifier.post("Nothing to undo", SHORT);
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        let live = self.live_state();
        match self.history.redo(&live) {
            Some(state) => {
                self.restore(state);
                self.notifier.post("Redo", SHORT);
                true
            }
            None => {
                self.notifier.post("Nothing to redo", SHORT);
                false
            }
        }
    }

    /// Run one frame. `frame` is the live camera image; tip markers and
    /// stroke previews are drawn onto it, strokes also land on the canvas.
    pub fn step(&mut self, frame: &mut FrameBuffer, hand: Option<HandInput>, now: Instant) -> Mode {
        let mode = resolve_mode(hand.as_ref(), &self.layout, self.text.is_active(), self.show_guide);
        if mode != self.mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "mode change");
        }
        self.mode = mode;

        if mode != Mode::Drawing {
            self.prev = None;
        }
        if mode != Mode::GuideNav {
            self.swipe_start = None;
        }
        if mode != Mode::Selection {
            self.hovered = None;
        }
        if mode != Mode::TextDrag && self.text.is_dragging() {
            self.text.end_drag();
        }

        let Some(hand) = hand else { return mode };
        match mode {
            Mode::Idle => {}
            Mode::Selection => self.select(frame, &hand, now),
            Mode::Drawing => self.draw(frame, hand.index_tip),
            Mode::GuideNav => self.navigate_guide(frame, hand.index_tip),
            Mode::TextDrag => self.drag_text(frame, &hand),
        }
        mode
    }

    fn select(&mut self, frame: &mut FrameBuffer, hand: &HandInput, now: Instant) {
        let tip = hand.index_tip;
        match self.layout.region_at(tip) {
            // Fire once per entry into a button, not on every frame spent over it
            Some(region) if self.hovered != Some(region) => {
                self.hovered = Some(region);
                self.press(region, now);
            }
            Some(_) => {}
            None => self.hovered = None,
        }

        let (a, b) = (hand.index_tip, hand.middle_tip);
        let rect = Rect { left: a.x.min(b.x), top: a.y.min(b.y) - 25, right: a.x.max(b.x), bottom: a.y.max(b.y) + 25 };
        fill_rect(frame, rect, self.draw_color);
    }

    /// Apply header button `region`.
    pub fn press(&mut self, region: usize, now: Instant) {
        let Some(&action) = HEADER_ACTIONS.get(region) else { return };
        if action == HeaderAction::Save && self.last_save.is_some_and(|t| now.saturating_duration_since(t) < SAVE_COOLDOWN) {
            tracing::debug!("save ignored during cooldown");
            return;
        }
        self.header_index = header_for_region(region, self.header_index, self.header_count);
        tracing::debug!(region, ?action, "header button");

        match action {
            HeaderAction::Save => {
                self.last_save = Some(now);
                self.show_guide = false;
                self.notifier.post("Saving...", SHORT);
                let job = ExportJob {
                    canvas: self.canvas.clone(),
                    texts: self.text.snapshot_objects(),
                    header_height: self.layout.header_height,
                };
                self.exporter.dispatch(job);
            }
            HeaderAction::SelectColor(color) => {
                self.draw_color = color;
                self.show_guide = false;
                self.text.set_active(false);
                self.notifier.post(format!("{} brush selected", color_name(color)), SHORT);
            }
            HeaderAction::SelectEraser => {
                self.text.delete_selected();
                self.draw_color = ERASER;
                self.show_guide = false;
                self.text.set_active(false);
                self.notifier.post("Eraser selected", SHORT);
            }
            HeaderAction::Undo => {
                self.undo();
                self.show_guide = false;
            }
            HeaderAction::Redo => {
                self.redo();
                self.show_guide = false;
            }
            HeaderAction::ToggleGuide => {
                self.guide_index = 0;
                self.text.set_active(false);
                if self.guide_count == 0 {
                    self.show_guide = false;
                    self.notifier.post("No guides available", SHORT);
                    return;
                }
                self.show_guide = !self.show_guide;
                if self.show_guide {
                    self.notifier.post("Guide selected", SHORT);
                }
            }
            HeaderAction::ToggleKeyboard => {
                if !self.text.is_active() {
                    self.text.set_active(true);
                    self.notifier.post("Keyboard Mode Opened", SHORT);
                }
                self.show_guide = false;
            }
        }
    }

    fn draw(&mut self, frame: &mut FrameBuffer, tip: Point) {
        // Every frame of contact is its own undo step, taken before painting
        self.snapshot();

        let tool = Tool::from_color(self.draw_color, self.brush_size, self.eraser_size);
        if matches!(tool, Tool::Eraser { .. }) {
            self.text.erase_at(tip);
        }
        fill_circle(frame, tip, TIP_MARKER_RADIUS, self.draw_color);

        let from = self.prev.unwrap_or(tip);
        stroke(frame, from, tip, tool);
        stroke(&mut self.canvas, from, tip, tool);
        self.prev = Some(tip);
    }

    fn navigate_guide(&mut self, frame: &mut FrameBuffer, tip: Point) {
        let start = *self.swipe_start.get_or_insert(tip.x);
        let dx = tip.x - start;
        if dx.abs() > SWIPE_THRESHOLD && self.guide_count > 0 {
            // Swiping right goes back, left goes forward
            self.guide_index = if dx > 0 {
                self.guide_index.saturating_sub(1)
            } else {
                (self.guide_index + 1).min(self.guide_count - 1)
            };
            self.notifier.post(format!("Guide {}/{}", self.guide_index + 1, self.guide_count), SHORT);
            self.swipe_start = Some(tip.x);
        }

        draw_circle(frame, tip, GUIDE_CURSOR_RADIUS + 5, 2, GREEN);
        fill_circle(frame, tip, GUIDE_CURSOR_RADIUS, GREEN);
        fill_circle(frame, tip, 3, BLACK);

        let label = format!("Guide: {}/{}", self.guide_index + 1, self.guide_count);
        let (w, h) = crate::font::text_size(&label, 2);
        let x = (tip.x - w / 2).clamp(10, (self.layout.width as i32 - w - 10).max(10));
        let y = (tip.y - GUIDE_CURSOR_RADIUS - 10).max(30);
        fill_rect(frame, Rect { left: x - 5, top: y - h - 5, right: x + w + 5, bottom: y + 5 }, BLACK);
        draw_text(frame, x, y, &label, WHITE, 2, 1);
    }

    fn drag_text(&mut self, frame: &mut FrameBuffer, hand: &HandInput) {
        let mid = hand.index_tip.midpoint(hand.middle_tip);
        if self.text.is_dragging() {
            self.text.drag_to(mid);
        } else {
            self.text.begin_drag(mid);
        }
        fill_circle(frame, mid, TIP_MARKER_RADIUS, YELLOW);
    }

    /// Route one key. Text edits that start a new step push a canvas-level
    /// snapshot holding the text objects as they were before the key.
    pub fn handle_key(&mut self, key: KeyInput, now: Instant) -> KeyResponse {
        if !self.text.is_active() {
            return if key == KeyInput::Escape { KeyResponse::Quit } else { KeyResponse::Continue };
        }
        let before = self.text.snapshot_objects();
        let outcome = self.text.handle_key(key, now);
        if outcome.snapshot {
            self.history.snapshot(Snapshot { canvas: self.canvas.clone(), texts: before });
        }
        if key == KeyInput::Escape {
            self.notifier.post("Keyboard Mode Closed", SHORT);
        }
        KeyResponse::Continue
    }

    /// Advance text animations and caret blink.
    pub fn tick(&mut self, dt: f32) {
        self.text.update(dt);
    }
}

fn color_name(color: u32) -> &'static str {
    match color {
        PINK => "Pink",
        crate::types::BLUE => "Blue",
        GREEN => "Green",
        YELLOW => "Yellow",
        _ => "Custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::tests::hand_with;
    use crate::gesture::{INDEX_TIP, MIDDLE_TIP, classify};
    use crate::notify::NotificationCenter;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingExport(Rc<Cell<usize>>);

    impl ExportDispatch for CountingExport {
        fn dispatch(&mut self, _job: ExportJob) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn painter(guides: usize) -> (Painter, NotificationCenter, Rc<Cell<usize>>) {
        let center = NotificationCenter::new();
        let count = Rc::new(Cell::new(0));
        let p = Painter::new(
            Layout::new(1280, 720),
            11,
            guides,
            center.notifier(),
            Box::new(CountingExport(Rc::clone(&count))),
        );
        (p, center, count)
    }

    fn two_fingers(at: Point) -> HandInput {
        HandInput { fingers: FingerState([false, true, true, false, false]), index_tip: at, middle_tip: at + Point::new(30, 0) }
    }

    fn one_finger(at: Point) -> HandInput {
        HandInput { fingers: FingerState([false, true, false, false, false]), index_tip: at, middle_tip: at + Point::new(30, 40) }
    }

    fn frame() -> FrameBuffer {
        FrameBuffer::new(1280, 720)
    }

    /// Centre of header button `i`.
    fn button(i: usize) -> Point {
        Point::new(i as i32 * 128 + 64, 30)
    }

    #[test]
    fn mode_priority() {
        let l = Layout::new(1280, 720);
        let two = two_fingers(Point::new(300, 300));
        let one = one_finger(Point::new(300, 300));
        assert_eq!(resolve_mode(None, &l, false, false), Mode::Idle);
        assert_eq!(resolve_mode(Some(&two), &l, false, true), Mode::Selection);
        assert_eq!(resolve_mode(Some(&two), &l, true, false), Mode::TextDrag);
        assert_eq!(resolve_mode(Some(&two_fingers(button(3))), &l, true, false), Mode::Selection);
        assert_eq!(resolve_mode(Some(&one), &l, false, false), Mode::Drawing);
        assert_eq!(resolve_mode(Some(&one), &l, false, true), Mode::GuideNav);
        assert_eq!(resolve_mode(Some(&one), &l, true, false), Mode::Idle);
        let fist = HandInput { fingers: FingerState::NONE, ..one };
        assert_eq!(resolve_mode(Some(&fist), &l, false, false), Mode::Idle);
    }

    #[test]
    fn classified_landmarks_drive_selection() {
        let hand = hand_with([false, true, true, false, false]);
        let fingers = classify(Some(&hand)).fingers;
        let input = HandInput {
            fingers,
            index_tip: hand.point(INDEX_TIP).unwrap(),
            middle_tip: hand.point(MIDDLE_TIP).unwrap(),
        };
        assert_eq!(resolve_mode(Some(&input), &Layout::new(1280, 720), false, false), Mode::Selection);
    }

    #[test]
    fn eraser_button_switches_header_and_tool() {
        let (mut p, mut center, _) = painter(0);
        p.step(&mut frame(), Some(two_fingers(button(5))), Instant::now());
        assert_eq!(p.header_index(), 6);
        assert_eq!(p.draw_color(), ERASER);
        assert_eq!(center.live(Instant::now()).unwrap().text, "Eraser selected");
    }

    #[test]
    fn header_action_fires_once_per_entry() {
        let (mut p, _, count) = painter(0);
        let now = Instant::now();
        for i in 0..5 {
            p.step(&mut frame(), Some(two_fingers(button(0))), now + Duration::from_secs(2 * i));
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn rapid_saves_dispatch_once() {
        let (mut p, _, count) = painter(0);
        let now = Instant::now();
        for i in 0..6 {
            let at = if i % 2 == 0 { button(0) } else { Point::new(64, 300) };
            p.step(&mut frame(), Some(two_fingers(at)), now + Duration::from_millis(100 * i));
        }
        assert_eq!(count.get(), 1);
        p.step(&mut frame(), Some(two_fingers(Point::new(64, 300))), now + Duration::from_millis(1500));
        p.step(&mut frame(), Some(two_fingers(button(0))), now + Duration::from_millis(1600));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn drawing_paints_canvas_and_snapshots_each_frame() {
        let (mut p, _, _) = painter(0);
        let now = Instant::now();
        p.step(&mut frame(), Some(one_finger(Point::new(100, 300))), now);
        p.step(&mut frame(), Some(one_finger(Point::new(200, 300))), now);
        assert_eq!(p.canvas().get(150, 300), Some(PINK));
        assert_eq!(p.undo_len(), 2);

        p.undo();
        assert_eq!(p.canvas().get(150, 300), Some(BLACK));
        assert_eq!(p.canvas().get(100, 300), Some(PINK));
        p.redo();
        assert_eq!(p.canvas().get(150, 300), Some(PINK));
    }

    #[test]
    fn idle_breaks_the_stroke() {
        let (mut p, _, _) = painter(0);
        let now = Instant::now();
        p.step(&mut frame(), Some(one_finger(Point::new(100, 300))), now);
        p.step(&mut frame(), None, now);
        p.step(&mut frame(), Some(one_finger(Point::new(300, 300))), now);
        assert_eq!(p.canvas().get(200, 300), Some(BLACK));
    }

    #[test]
    fn eraser_removes_text_under_tip() {
        let (mut p, _, _) = painter(0);
        p.text_mut().push_object(crate::text::TextObject::new("abc", Point::new(400, 400)));
        let now = Instant::now();
        p.step(&mut frame(), Some(two_fingers(button(5))), now);
        p.step(&mut frame(), Some(one_finger(Point::new(405, 395))), now);
        assert_eq!(p.text().object_count(), 0);
        // The removal is undoable
        p.undo();
        assert_eq!(p.text().object_count(), 1);
    }

    #[test]
    fn guide_button_without_guides_keeps_drawing_enabled() {
        let (mut p, mut center, _) = painter(0);
        let now = Instant::now();
        p.step(&mut frame(), Some(two_fingers(button(8))), now);
        assert!(!p.show_guide());
        assert_eq!(center.live(Instant::now()).unwrap().text, "No guides available");

        p.step(&mut frame(), Some(one_finger(Point::new(300, 300))), now);
        assert_eq!(p.canvas().get(300, 300), Some(PINK));
    }

    #[test]
    fn swipe_right_goes_back_and_clamps() {
        let (mut p, mut center, _) = painter(4);
        let now = Instant::now();
        p.step(&mut frame(), Some(two_fingers(button(8))), now);
        assert!(p.show_guide());
        p.step(&mut frame(), Some(one_finger(Point::new(500, 400))), now);
        p.step(&mut frame(), Some(one_finger(Point::new(560, 400))), now);
        assert_eq!(p.guide_index(), 0);
        assert_eq!(center.live(Instant::now()).unwrap().text, "Guide 1/4");

        p.step(&mut frame(), Some(one_finger(Point::new(500, 400))), now);
        assert_eq!(p.guide_index(), 1);
        p.step(&mut frame(), Some(one_finger(Point::new(440, 400))), now);
        assert_eq!(p.guide_index(), 2);
        assert_eq!(center.live(Instant::now()).unwrap().text, "Guide 3/4");
    }

    #[test]
    fn keyboard_mode_and_text_drag() {
        let (mut p, _, _) = painter(0);
        let now = Instant::now();
        p.step(&mut frame(), Some(two_fingers(button(9))), now);
        assert!(p.keyboard_active());
        p.text_mut().push_object(crate::text::TextObject::new("drag me", Point::new(300, 500)));

        // Midpoint of index (305, 490) and middle (335, 490) is (320, 490)
        p.step(&mut frame(), Some(two_fingers(Point::new(305, 490))), now);
        assert_eq!(p.mode(), Mode::TextDrag);
        p.step(&mut frame(), Some(two_fingers(Point::new(405, 390))), now);
        p.step(&mut frame(), None, now);
        assert_eq!(p.text().objects().next().unwrap().position, Point::new(400, 400));
        assert!(!p.text().is_dragging());
    }

    #[test]
    fn escape_closes_keyboard_before_quitting() {
        let (mut p, _, _) = painter(0);
        let now = Instant::now();
        p.press(9, now);
        assert_eq!(p.handle_key(KeyInput::Escape, now), KeyResponse::Continue);
        assert!(!p.keyboard_active());
        assert_eq!(p.handle_key(KeyInput::Escape, now), KeyResponse::Quit);
    }

    #[test]
    fn typing_snapshots_once_per_new_buffer() {
        let (mut p, _, _) = painter(0);
        let now = Instant::now();
        p.press(9, now);
        for (i, ch) in "hey".chars().enumerate() {
            p.handle_key(KeyInput::Char(ch), now + Duration::from_secs(i as u64 + 1));
        }
        assert_eq!(p.undo_len(), 1);
        p.handle_key(KeyInput::Enter, now + Duration::from_secs(10));
        assert_eq!(p.undo_len(), 1);
        assert_eq!(p.text().object_count(), 1);
        assert!(p.undo());
        assert_eq!(p.text().object_count(), 0);
        assert_eq!(p.undo_len(), 0);
    }

    #[test]
    fn nothing_to_undo_is_announced() {
        let (mut p, mut center, _) = painter(0);
        assert!(!p.undo());
        assert_eq!(center.live(Instant::now()).unwrap().text, "Nothing to undo");
    }
}
