// Brush/eraser size panel in its own small window.
// `SettingsPanel` holds the slider state and draws itself; `SettingsWindow`
// feeds it mouse input once per frame from the main loop.
// Slider moves apply immediately, "Apply" writes the config file, and
// closing the window falls back to the sizes that were last applied.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use minifb::{MouseButton, MouseMode, Window, WindowOptions};

use crate::config::{SettingsSpec, SizeConfig};
use crate::draw::{draw_rect, fill_circle, fill_rect};
use crate::error::Error;
use crate::font::{draw_text, draw_text_5x7, text_size};
use crate::types::{FrameBuffer, Point, Rect};

pub const PANEL_WIDTH: usize = 400;
pub const PANEL_HEIGHT: usize = 300;

const TRACK_LEFT: i32 = 30;
const TRACK_RIGHT: i32 = 370;
const TRACK_THICKNESS: i32 = 8;
const KNOB_RADIUS: i32 = 10;
const BRUSH_TRACK_Y: i32 = 95;
const ERASER_TRACK_Y: i32 = 175;
const APPLY_BUTTON: Rect = Rect { left: 150, top: 230, right: 250, bottom: 270 };

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slider {
    pub label: &'static str,
    pub range: RangeInclusive<u32>,
    pub value: u32,
    /// Vertical center of the track.
    pub y: i32,
}

impl Slider {
    pub fn new(label: &'static str, range: RangeInclusive<u32>, value: u32, y: i32) -> Self {
        let value = value.clamp(*range.start(), *range.end());
        Self { label, range, value, y }
    }

    /// Value under pointer column `x`, clamped to the track ends.
    pub fn value_at(&self, x: i32) -> u32 {
        let (lo, hi) = (*self.range.start(), *self.range.end());
        let t = (x - TRACK_LEFT) as f32 / (TRACK_RIGHT - TRACK_LEFT) as f32;
        let t = t.clamp(0.0, 1.0);
        lo + ((hi - lo) as f32 * t).round() as u32
    }

    pub fn knob_x(&self) -> i32 {
        let (lo, hi) = (*self.range.start(), *self.range.end());
        if hi == lo {
            return TRACK_LEFT;
        }
        TRACK_LEFT + ((self.value - lo) as i64 * (TRACK_RIGHT - TRACK_LEFT) as i64 / (hi - lo) as i64) as i32
    }

    /// Grab area: the track widened to the knob.
    pub fn hit(&self, p: Point) -> bool {
        Rect { left: TRACK_LEFT - KNOB_RADIUS, top: self.y - KNOB_RADIUS, right: TRACK_RIGHT + KNOB_RADIUS, bottom: self.y + KNOB_RADIUS }
            .contains(p)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelEvent {
    /// A slider moved; apply the sizes live.
    Changed(SizeConfig),
    /// "Apply" clicked; persist these sizes.
    Applied(SizeConfig),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Grab {
    Brush,
    Eraser,
}

pub struct SettingsPanel {
    spec: SettingsSpec,
    brush: Slider,
    eraser: Slider,
    applied: SizeConfig,
    grab: Option<Grab>,
    was_down: bool,
}

impl SettingsPanel {
    pub fn new(spec: SettingsSpec, sizes: SizeConfig) -> Self {
        let sizes = sizes.clamped(&spec);
        Self {
            brush: Slider::new("Brush size", spec.brush_size_range.clone(), sizes.brush_size, BRUSH_TRACK_Y),
            eraser: Slider::new("Eraser size", spec.eraser_size_range.clone(), sizes.eraser_size, ERASER_TRACK_Y),
            spec,
            applied: sizes,
            grab: None,
            was_down: false,
        }
    }

    pub fn sizes(&self) -> SizeConfig {
        SizeConfig { brush_size: self.brush.value, eraser_size: self.eraser.value }
    }

    pub fn applied(&self) -> SizeConfig {
        self.applied
    }

    /// Feed the pointer position and left-button state for this frame.
    pub fn pointer(&mut self, pos: Option<Point>, down: bool) -> Option<PanelEvent> {
        let pressed = down && !self.was_down;
        self.was_down = down;
        if !down {
            self.grab = None;
            return None;
        }
        let p = pos?;

        if pressed {
            if APPLY_BUTTON.contains(p) {
                self.applied = self.sizes();
                return Some(PanelEvent::Applied(self.applied));
            }
            self.grab = if self.brush.hit(p) {
                Some(Grab::Brush)
            } else if self.eraser.hit(p) {
                Some(Grab::Eraser)
            } else {
                None
            };
        }

        let slider = match self.grab? {
            Grab::Brush => &mut self.brush,
            Grab::Eraser => &mut self.eraser,
        };
        let value = slider.value_at(p.x);
        if value == slider.value {
            return None;
        }
        slider.value = value;
        Some(PanelEvent::Changed(self.sizes()))
    }

    /// Put the sliders back to the last applied sizes and return them.
    pub fn revert(&mut self) -> SizeConfig {
        self.brush.value = self.applied.brush_size;
        self.eraser.value = self.applied.eraser_size;
        self.grab = None;
        self.applied
    }

    pub fn render(&self, fb: &mut FrameBuffer) {
        let theme = self.spec.theme;
        fb.pixels.fill(theme.background);
        draw_text(fb, TRACK_LEFT, 40, "SIZE SETTINGS", theme.text, 2, 1);

        for slider in [&self.brush, &self.eraser] {
            let label = format!("{}: {}", slider.label, slider.value);
            draw_text_5x7(fb, TRACK_LEFT, slider.y - 30, &label, theme.text);
            let track = Rect {
                left: TRACK_LEFT,
                top: slider.y - TRACK_THICKNESS / 2,
                right: TRACK_RIGHT,
                bottom: slider.y + TRACK_THICKNESS / 2,
            };
            fill_rect(fb, track, theme.track);
            fill_circle(fb, Point::new(slider.knob_x(), slider.y), KNOB_RADIUS, theme.knob);
        }

        fill_rect(fb, APPLY_BUTTON, theme.button);
        draw_rect(fb, APPLY_BUTTON, 1, theme.text);
        let (tw, th) = text_size("APPLY", 2);
        let cx = (APPLY_BUTTON.left + APPLY_BUTTON.right - tw) / 2;
        let cy = (APPLY_BUTTON.top + APPLY_BUTTON.bottom + th) / 2;
        draw_text(fb, cx, cy, "APPLY", theme.text, 2, 1);
    }
}

/// What the frame loop should do after polling the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEvent {
    Live(SizeConfig),
    Applied(SizeConfig),
    /// Window closed; sizes went back to the last applied ones.
    Closed(SizeConfig),
}

pub struct SettingsWindow {
    window: Window,
    panel: SettingsPanel,
    screen: FrameBuffer,
    config_path: PathBuf,
}

impl SettingsWindow {
    pub fn open(spec: SettingsSpec, sizes: SizeConfig, config_path: PathBuf) -> Result<Self, Error> {
        let mut window = Window::new("Size Settings", PANEL_WIDTH, PANEL_HEIGHT, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(0);
        Ok(Self { window, panel: SettingsPanel::new(spec, sizes), screen: FrameBuffer::new(PANEL_WIDTH, PANEL_HEIGHT), config_path })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Handle this frame's input and redraw. Never blocks.
    pub fn poll(&mut self) -> Option<SettingsEvent> {
        if !self.window.is_open() {
            return Some(SettingsEvent::Closed(self.panel.revert()));
        }

        let pos = self.window.get_mouse_pos(MouseMode::Discard).map(|(x, y)| Point::new(x as i32, y as i32));
        let down = self.window.get_mouse_down(MouseButton::Left);
        let event = match self.panel.pointer(pos, down) {
            Some(PanelEvent::Changed(sizes)) => Some(SettingsEvent::Live(sizes)),
            Some(PanelEvent::Applied(sizes)) => {
                if let Err(e) = sizes.save(&self.config_path) {
                    tracing::warn!("saving size config failed: {e}");
                }
                Some(SettingsEvent::Applied(sizes))
            }
            None => None,
        };

        self.panel.render(&mut self.screen);
        if let Err(e) = self.window.update_with_buffer(&self.screen.pixels, PANEL_WIDTH, PANEL_HEIGHT) {
            tracing::warn!("settings window update failed: {e}");
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> SettingsPanel {
        SettingsPanel::new(SettingsSpec::default(), SizeConfig { brush_size: 10, eraser_size: 100 })
    }

    #[test]
    fn slider_maps_track_to_range() {
        let s = Slider::new("Brush size", 1..=201, 1, BRUSH_TRACK_Y);
        assert_eq!(s.value_at(TRACK_LEFT - 50), 1);
        assert_eq!(s.value_at(TRACK_RIGHT + 50), 201);
        assert_eq!(s.value_at((TRACK_LEFT + TRACK_RIGHT) / 2), 101);
        let s = Slider { value: 201, ..s };
        assert_eq!(s.knob_x(), TRACK_RIGHT);
    }

    #[test]
    fn dragging_applies_live_and_close_reverts() {
        let mut p = panel();
        assert!(p.pointer(Some(Point::new(200, 20)), false).is_none());

        let ev = p.pointer(Some(Point::new(TRACK_RIGHT, BRUSH_TRACK_Y)), true);
        assert_eq!(ev, Some(PanelEvent::Changed(SizeConfig { brush_size: 200, eraser_size: 100 })));
        // Holding still is not a change
        assert!(p.pointer(Some(Point::new(TRACK_RIGHT, BRUSH_TRACK_Y)), true).is_none());
        // Drag leaves the track vertically but keeps the grab
        let ev = p.pointer(Some(Point::new(TRACK_LEFT, 5)), true);
        assert_eq!(ev, Some(PanelEvent::Changed(SizeConfig { brush_size: 1, eraser_size: 100 })));

        assert_eq!(p.revert(), SizeConfig { brush_size: 10, eraser_size: 100 });
        assert_eq!(p.sizes(), p.applied());
    }

    #[test]
    fn apply_commits_current_sizes() {
        let mut p = panel();
        p.pointer(Some(Point::new(TRACK_LEFT, ERASER_TRACK_Y)), true);
        p.pointer(None, false);
        let center = Point::new((APPLY_BUTTON.left + APPLY_BUTTON.right) / 2, APPLY_BUTTON.top + 5);
        let ev = p.pointer(Some(center), true);
        assert_eq!(ev, Some(PanelEvent::Applied(SizeConfig { brush_size: 10, eraser_size: 10 })));
        // A held button does not apply again
        assert!(p.pointer(Some(center), true).is_none());
        assert_eq!(p.revert().eraser_size, 10);
    }

    #[test]
    fn out_of_range_sizes_are_clamped() {
        let p = SettingsPanel::new(SettingsSpec::default(), SizeConfig { brush_size: 0, eraser_size: 999 });
        assert_eq!(p.sizes(), SizeConfig { brush_size: 1, eraser_size: 200 });
    }

    #[test]
    fn render_fills_background() {
        let p = panel();
        let mut fb = FrameBuffer::new(PANEL_WIDTH, PANEL_HEIGHT);
        p.render(&mut fb);
        assert_eq!(fb.get(2, 2), Some(SettingsSpec::default().theme.background));
        assert_eq!(fb.get(APPLY_BUTTON.left + 3, APPLY_BUTTON.top + 3), Some(SettingsSpec::default().theme.button));
    }
}
