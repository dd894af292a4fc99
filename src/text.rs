// On-canvas text: a live input buffer with a blinking caret, a bounded
// z-ordered list of committed text objects, dragging, a small text-only
// undo history and a per-character fade-in.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::draw::{draw_rect, fill_rect};
use crate::font::{ADVANCE, draw_char, draw_text_outlined, text_size};
use crate::history::History;
use crate::types::{GREEN, Point, Rect, WHITE, scale_color};

pub const MAX_TEXT_OBJECTS: usize = 15;
pub const TEXT_HISTORY_BOUND: usize = 8;
pub const MAX_ANIMATIONS: usize = 30;
pub const ANIMATION_SECS: f32 = 0.1;
pub const CURSOR_BLINK_SECS: f32 = 0.5;
/// The same key again within this window is treated as contact bounce.
pub const KEY_DEBOUNCE: Duration = Duration::from_millis(30);
/// Backspace repeating faster than this is a held key and deletes in bulk.
pub const HELD_BACKSPACE: Duration = Duration::from_millis(150);
pub const HELD_BACKSPACE_CHARS: usize = 3;

const DEFAULT_SCALE: u32 = 3;
const DEFAULT_THICKNESS: u32 = 2;
const DEFAULT_COLOR: u32 = WHITE;
const OUTLINE_PX: i32 = 2;
const COMMIT_X: i32 = 50;
const CARET_HEIGHT: i32 = 30;
const CARET_MIN_WIDTH: i32 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Font {
    #[default]
    Mono5x7,
}

/// A committed piece of text. `position` is the bottom-left of the text box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextObject {
    pub text: String,
    pub position: Point,
    pub color: u32,
    pub font: Font,
    pub scale: u32,
    pub thickness: u32,
    pub selected: bool,
}

impl TextObject {
    pub fn new(text: impl Into<String>, position: Point) -> Self {
        Self {
            text: text.into(),
            position,
            color: DEFAULT_COLOR,
            font: Font::Mono5x7,
            scale: DEFAULT_SCALE,
            thickness: DEFAULT_THICKNESS,
            selected: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        let (w, h) = text_size(&self.text, self.scale);
        Rect {
            left: self.position.x,
            top: self.position.y - h,
            right: self.position.x + w,
            bottom: self.position.y,
        }
    }

    /// Outlined text, plus a green box when selected.
    pub fn render(&self, fb: &mut crate::types::FrameBuffer) {
        draw_text_outlined(
            fb,
            self.position.x,
            self.position.y,
            &self.text,
            self.color,
            self.scale,
            self.thickness,
            OUTLINE_PX,
        );
        if self.selected {
            let b = self.bounds();
            let frame = Rect { left: b.left - 5, top: b.top - 5, right: b.right + 5, bottom: b.bottom + 5 };
            draw_rect(fb, frame, 2, GREEN);
        }
    }
}

/// What the text history keeps per object; font, scale and thickness are
/// left out and come back as defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TextEdit {
    text: String,
    position: Point,
    color: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Escape,
    Undo,
    Redo,
}

/// Result of feeding one key to the text subsystem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// The key was consumed.
    pub handled: bool,
    /// The change starts a new edit and deserves a canvas-level undo step.
    pub snapshot: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Idle,
    Object { index: usize, offset: Point },
    Caret { offset: Point },
}

#[derive(Clone, Copy, Debug)]
struct CharAnimation {
    target_pos: usize,
    elapsed: f32,
}

impl CharAnimation {
    fn progress(&self) -> f32 {
        (self.elapsed / ANIMATION_SECS).clamp(0.0, 1.0)
    }
}

pub struct TextInput {
    buffer: String,
    active: bool,
    cursor_visible: bool,
    cursor_timer: f32,
    objects: VecDeque<TextObject>,
    drag: Drag,
    input_position: Point,
    home: Point,
    history: History<Vec<TextEdit>>,
    animations: VecDeque<CharAnimation>,
    last_key: Option<KeyInput>,
    last_key_at: Option<Instant>,
    selection_edited: bool,
}

impl TextInput {
    /// `width`/`height` of the frame; the caret starts at its centre.
    pub fn new(width: usize, height: usize) -> Self {
        let home = Point::new(width as i32 / 2, height as i32 / 2);
        Self {
            buffer: String::new(),
            active: false,
            cursor_visible: true,
            cursor_timer: 0.0,
            objects: VecDeque::with_capacity(MAX_TEXT_OBJECTS),
            drag: Drag::Idle,
            input_position: home,
            home,
            history: History::new(TEXT_HISTORY_BOUND),
            animations: VecDeque::with_capacity(MAX_ANIMATIONS),
            last_key: None,
            last_key_at: None,
            selection_edited: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.cursor_visible = true;
            self.cursor_timer = 0.0;
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn input_position(&self) -> Point {
        self.input_position
    }

    pub fn objects(&self) -> impl Iterator<Item = &TextObject> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Owned copy of the objects, in z-order.
    pub fn snapshot_objects(&self) -> Vec<TextObject> {
        self.objects.iter().cloned().collect()
    }

    /// Replace every object wholesale (undo/redo of the canvas history).
    pub fn replace_objects(&mut self, objects: Vec<TextObject>) {
        self.objects = objects.into_iter().take(MAX_TEXT_OBJECTS).collect();
        self.drag = Drag::Idle;
    }

    /// Append a committed object, dropping the oldest at the bound.
    pub fn push_object(&mut self, object: TextObject) {
        if self.objects.len() >= MAX_TEXT_OBJECTS {
            self.objects.pop_front();
            self.drag = Drag::Idle;
        }
        self.objects.push_back(object);
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.objects.iter().position(|o| o.selected)
    }

    pub fn clear_selection(&mut self) {
        for o in &mut self.objects {
            o.selected = false;
        }
        if matches!(self.drag, Drag::Object { .. }) {
            self.drag = Drag::Idle;
        }
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn edits(&self) -> Vec<TextEdit> {
        self.objects
            .iter()
            .map(|o| TextEdit { text: o.text.clone(), position: o.position, color: o.color })
            .collect()
    }

    fn save_edit_state(&mut self) {
        let edits = self.edits();
        self.history.snapshot(edits);
    }

    fn restore_edits(&mut self, edits: Vec<TextEdit>) {
        self.objects = edits
            .into_iter()
            .map(|e| TextObject { color: e.color, ..TextObject::new(e.text, e.position) })
            .collect();
        self.drag = Drag::Idle;
    }

    /// Feed one key. Inactive input ignores everything.
    pub fn handle_key(&mut self, key: KeyInput, now: Instant) -> KeyOutcome {
        if !self.active {
            return KeyOutcome::default();
        }

        let since_last = self.last_key_at.map(|t| now.saturating_duration_since(t));
        let repeated = self.last_key == Some(key);
        if repeated && key != KeyInput::Backspace && since_last.is_some_and(|d| d < KEY_DEBOUNCE) {
            return KeyOutcome::default();
        }
        let held = repeated && key == KeyInput::Backspace && since_last.is_some_and(|d| d < HELD_BACKSPACE);
        self.last_key = Some(key);
        self.last_key_at = Some(now);

        match key {
            KeyInput::Enter => self.commit(),
            KeyInput::Backspace => self.backspace(held),
            KeyInput::Char(ch) if (' '..='~').contains(&ch) => self.type_char(ch),
            KeyInput::Char(_) => KeyOutcome::default(),
            KeyInput::Escape => {
                self.buffer.clear();
                self.animations.clear();
                self.clear_selection();
                self.active = false;
                KeyOutcome { handled: true, snapshot: false }
            }
            KeyInput::Undo => {
                let live = self.edits();
                if let Some(prev) = self.history.undo(&live) {
                    self.restore_edits(prev);
                }
                KeyOutcome { handled: true, snapshot: false }
            }
            KeyInput::Redo => {
                let live = self.edits();
                if let Some(next) = self.history.redo(&live) {
                    self.restore_edits(next);
                }
                KeyOutcome { handled: true, snapshot: false }
            }
        }
    }

    fn commit(&mut self) -> KeyOutcome {
        if self.selected_index().is_some() {
            self.clear_selection();
            self.buffer.clear();
            return KeyOutcome { handled: true, snapshot: false };
        }
        if self.buffer.is_empty() {
            return KeyOutcome { handled: true, snapshot: false };
        }
        self.save_edit_state();
        let text = std::mem::take(&mut self.buffer);
        let position = Point::new(COMMIT_X, self.input_position.y);
        self.push_object(TextObject::new(text, position));
        self.animations.clear();
        self.input_position = self.home;
        // The first character of this buffer already took the snapshot
        KeyOutcome { handled: true, snapshot: false }
    }

    fn type_char(&mut self, ch: char) -> KeyOutcome {
        let mut snapshot = false;
        if let Some(i) = self.selected_index() {
            if !self.selection_edited {
                self.save_edit_state();
                self.selection_edited = true;
                snapshot = true;
            }
            self.objects[i].text.push(ch);
        } else {
            if self.buffer.is_empty() {
                self.save_edit_state();
                snapshot = true;
            }
            self.buffer.push(ch);
            if self.animations.len() >= MAX_ANIMATIONS {
                self.animations.pop_front();
            }
            let target_pos = self.buffer.chars().count() - 1;
            self.animations.push_back(CharAnimation { target_pos, elapsed: 0.0 });
        }
        KeyOutcome { handled: true, snapshot }
    }

    fn backspace(&mut self, held: bool) -> KeyOutcome {
        let count = |len: usize| if held { HELD_BACKSPACE_CHARS.min(len) } else { 1 };

        if let Some(i) = self.selected_index() {
            let len = self.objects[i].text.chars().count();
            if len == 0 {
                return KeyOutcome { handled: true, snapshot: false };
            }
            self.save_edit_state();
            let mut snapshot = !self.selection_edited;
            self.selection_edited = true;
            for _ in 0..count(len) {
                self.objects[i].text.pop();
            }
            if self.objects[i].text.is_empty() {
                self.objects.remove(i);
                self.drag = Drag::Idle;
                snapshot = true;
            }
            return KeyOutcome { handled: true, snapshot };
        }

        let len = self.buffer.chars().count();
        if len == 0 {
            return KeyOutcome { handled: true, snapshot: false };
        }
        self.save_edit_state();
        for _ in 0..count(len) {
            self.buffer.pop();
        }
        let remaining = self.buffer.chars().count();
        self.animations.retain(|a| a.target_pos < remaining);
        KeyOutcome { handled: true, snapshot: false }
    }

    /// Remove the selected object, if any.
    pub fn delete_selected(&mut self) -> bool {
        let Some(i) = self.selected_index() else { return false };
        self.save_edit_state();
        self.objects.remove(i);
        self.drag = Drag::Idle;
        true
    }

    /// Eraser contact: delete the topmost object under `p`.
    pub fn erase_at(&mut self, p: Point) -> bool {
        let Some(i) = self.topmost_at(p) else { return false };
        self.objects.remove(i);
        self.drag = Drag::Idle;
        true
    }

    fn topmost_at(&self, p: Point) -> Option<usize> {
        (0..self.objects.len()).rev().find(|&i| self.objects[i].bounds().contains(p))
    }

    fn caret_bounds(&self) -> Rect {
        let (w, h) = text_size(&self.buffer, DEFAULT_SCALE);
        Rect {
            left: self.input_position.x,
            top: self.input_position.y - h.max(CARET_HEIGHT),
            right: self.input_position.x + w.max(CARET_MIN_WIDTH),
            bottom: self.input_position.y,
        }
    }

    /// Try to grab something at `p`: the topmost object first, then the live
    /// caret. A miss clears the selection.
    pub fn begin_drag(&mut self, p: Point) -> bool {
        if let Some(i) = self.topmost_at(p) {
            for o in &mut self.objects {
                o.selected = false;
            }
            self.objects[i].selected = true;
            self.selection_edited = false;
            self.drag = Drag::Object { index: i, offset: p - self.objects[i].position };
            self.active = true;
            return true;
        }
        if self.active && self.caret_bounds().contains(p) {
            self.drag = Drag::Caret { offset: p - self.input_position };
            return true;
        }
        self.clear_selection();
        false
    }

    /// Move whatever is grabbed so the grab offset stays under `p`.
    pub fn drag_to(&mut self, p: Point) {
        match self.drag {
            Drag::Idle => {}
            Drag::Object { index, offset } => {
                if let Some(o) = self.objects.get_mut(index) {
                    o.position = p - offset;
                }
            }
            Drag::Caret { offset } => self.input_position = p - offset,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::Idle
    }

    /// Release the grab; the object stays where it was dropped and selected.
    pub fn end_drag(&mut self) {
        self.drag = Drag::Idle;
    }

    /// Advance caret blink and character animations by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.active {
            self.animations.clear();
            return;
        }
        self.cursor_timer += dt;
        if self.cursor_timer >= CURSOR_BLINK_SECS {
            self.cursor_timer = 0.0;
            self.cursor_visible = !self.cursor_visible;
        }
        for a in &mut self.animations {
            a.elapsed += dt;
        }
        self.animations.retain(|a| a.elapsed < ANIMATION_SECS);
    }

    /// Committed objects always; the live buffer and caret only while typing.
    pub fn render(&self, fb: &mut crate::types::FrameBuffer) {
        for o in &self.objects {
            o.render(fb);
        }
        if !self.active {
            return;
        }

        let s = DEFAULT_SCALE as f32;
        let (x0, base) = (self.input_position.x as f32, self.input_position.y as f32);
        for (i, ch) in self.buffer.chars().enumerate() {
            let cx = x0 + (i as i32 * ADVANCE) as f32 * s;
            match self.animations.iter().find(|a| a.target_pos == i) {
                Some(a) => {
                    // Fade in while growing from 90% and settling 5px down
                    let p = a.progress();
                    let px = s * (0.9 + 0.1 * p);
                    let y_offset = 5.0 * (1.0 - p);
                    draw_char(fb, cx, base + y_offset, ch, scale_color(DEFAULT_COLOR, p), px);
                }
                None => {
                    for bold in 0..DEFAULT_THICKNESS {
                        draw_char(fb, cx + bold as f32, base, ch, DEFAULT_COLOR, s);
                    }
                }
            }
        }

        if self.cursor_visible {
            let (w, _) = text_size(&self.buffer, DEFAULT_SCALE);
            let x = self.input_position.x + w + 2;
            let y = self.input_position.y;
            fill_rect(fb, Rect { left: x, top: y - CARET_HEIGHT, right: x + 1, bottom: y }, DEFAULT_COLOR);
        }
    }
}
