// Header band geometry and the table of header buttons.

use crate::types::{BLUE, GREEN, PINK, Point, YELLOW};

/// Header artwork is drawn for a 1280-wide frame and 78 pixels tall.
pub const REFERENCE_WIDTH: usize = 1280;
pub const REFERENCE_HEADER_HEIGHT: usize = 78;
pub const BUTTON_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderAction {
    Save,
    SelectColor(u32),
    SelectEraser,
    Undo,
    Redo,
    ToggleGuide,
    ToggleKeyboard,
}

/// Left to right, one entry per button region.
pub const HEADER_ACTIONS: [HeaderAction; BUTTON_COUNT] = [
    HeaderAction::Save,
    HeaderAction::SelectColor(PINK),
    HeaderAction::SelectColor(BLUE),
    HeaderAction::SelectColor(GREEN),
    HeaderAction::SelectColor(YELLOW),
    HeaderAction::SelectEraser,
    HeaderAction::Undo,
    HeaderAction::Redo,
    HeaderAction::ToggleGuide,
    HeaderAction::ToggleKeyboard,
];

/// Frame size plus the header band scaled to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub header_height: usize,
}

impl Layout {
    pub fn new(width: usize, height: usize) -> Self {
        let scaled = (REFERENCE_HEADER_HEIGHT * width) as f64 / REFERENCE_WIDTH as f64;
        let header_height = (scaled.round() as usize).clamp(1, height.max(1));
        Self { width, height, header_height }
    }

    pub fn button_width(&self) -> usize {
        self.width / BUTTON_COUNT
    }

    pub fn in_header(&self, p: Point) -> bool {
        p.y < self.header_height as i32
    }

    /// Button under `p`. Region edges belong to no button.
    pub fn region_at(&self, p: Point) -> Option<usize> {
        if !self.in_header(p) {
            return None;
        }
        let bw = self.button_width() as i32;
        (0..BUTTON_COUNT).find(|&i| {
            let start = i as i32 * bw;
            start < p.x && p.x < start + bw
        })
    }
}

/// Header artwork to show after pressing button `region`: entry `region + 1`
/// when the header set has it, else unchanged (Undo falls back to entry 0).
pub fn header_for_region(region: usize, current: usize, header_count: usize) -> usize {
    if region + 1 < header_count {
        region + 1
    } else if HEADER_ACTIONS.get(region) == Some(&HeaderAction::Undo) {
        0
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_height_scales_with_width() {
        assert_eq!(Layout::new(1280, 720).header_height, 78);
        assert_eq!(Layout::new(640, 480).header_height, 39);
        assert_eq!(Layout::new(1024, 576).header_height, 62);
    }

    #[test]
    fn regions_are_exclusive_and_open() {
        let l = Layout::new(1280, 720);
        assert_eq!(l.region_at(Point::new(1, 10)), Some(0));
        assert_eq!(l.region_at(Point::new(128, 10)), None);
        assert_eq!(l.region_at(Point::new(129, 10)), Some(1));
        assert_eq!(l.region_at(Point::new(700, 10)), Some(5));
        assert_eq!(l.region_at(Point::new(700, 78)), None);
    }

    #[test]
    fn header_artwork_follows_region() {
        assert_eq!(header_for_region(5, 0, 11), 6);
        assert_eq!(header_for_region(6, 3, 7), 0);
        assert_eq!(header_for_region(8, 3, 7), 3);
    }

    #[test]
    fn table_covers_every_button() {
        assert_eq!(HEADER_ACTIONS[0], HeaderAction::Save);
        assert_eq!(HEADER_ACTIONS[5], HeaderAction::SelectEraser);
        assert_eq!(HEADER_ACTIONS[9], HeaderAction::ToggleKeyboard);
    }
}
