// Finger-state classification from hand landmarks.
// Landmark ids follow the 21-point hand model: 0 is the wrist, 4/8/12/16/20
// are the thumb, index, middle, ring and pinky tips.

use std::collections::VecDeque;

use crate::types::Point;

pub const LANDMARK_COUNT: usize = 21;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
/// Tip ids in finger order: thumb, index, middle, ring, pinky.
pub const TIP_IDS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, 16, 20];

/// One keypoint in frame pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Landmark {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

/// The ordered keypoints of one detected hand. Normally 21 entries; fewer
/// when the provider only delivered a partial hand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandLandmarks {
    pub points: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Build from (x, y) pairs, assigning ids by position.
    pub fn from_xy(xy: &[(i32, i32)]) -> Self {
        let points = xy.iter().enumerate().map(|(id, &(x, y))| Landmark { id, x, y }).collect();
        Self { points }
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }

    pub fn point(&self, id: usize) -> Option<Point> {
        self.points.get(id).map(|lm| Point::new(lm.x, lm.y))
    }
}

/// Up/down per finger: thumb, index, middle, ring, pinky.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    pub const NONE: FingerState = FingerState([false; 5]);

    pub fn thumb(&self) -> bool { self.0[0] }
    pub fn index(&self) -> bool { self.0[1] }
    pub fn middle(&self) -> bool { self.0[2] }
    pub fn ring(&self) -> bool { self.0[3] }
    pub fn pinky(&self) -> bool { self.0[4] }
}

/// What the classifier hands back for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub fingers: FingerState,
    /// Set when the hand was absent or partial; temporal smoothing must restart.
    pub reset_smoothing: bool,
}

/// Which fingers are raised.
///
/// The thumb counts as up when its tip lies to the right of the joint below
/// it (the camera image is mirrored, handedness is not considered). The other
/// fingers are up when the tip is strictly higher on screen than the joint two
/// below it. Partial or absent hands yield all-false and a smoothing reset.
pub fn classify(hand: Option<&HandLandmarks>) -> Classification {
    let Some(hand) = hand.filter(|h| h.is_complete()) else {
        return Classification { fingers: FingerState::NONE, reset_smoothing: true };
    };
    let p = &hand.points;
    let mut fingers = [false; 5];
    fingers[0] = p[THUMB_TIP].x > p[THUMB_TIP - 1].x;
    for (finger, &tip) in TIP_IDS.iter().enumerate().skip(1) {
        fingers[finger] = p[tip].y < p[tip - 2].y;
    }
    Classification { fingers: FingerState(fingers), reset_smoothing: false }
}

/// Rolling average over the last few fingertip positions to calm detector jitter.
pub struct TipSmoother {
    window: usize,
    index: VecDeque<Point>,
    middle: VecDeque<Point>,
}

impl TipSmoother {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), index: VecDeque::new(), middle: VecDeque::new() }
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.middle.clear();
    }

    /// Feed the raw tips, get the smoothed (index, middle) tips back.
    pub fn smooth(&mut self, index: Point, middle: Point) -> (Point, Point) {
        (
            Self::push_avg(&mut self.index, self.window, index),
            Self::push_avg(&mut self.middle, self.window, middle),
        )
    }

    fn push_avg(buf: &mut VecDeque<Point>, window: usize, p: Point) -> Point {
        if buf.len() == window {
            buf.pop_front();
        }
        buf.push_back(p);
        let n = buf.len() as i32;
        let (sx, sy) = buf.iter().fold((0, 0), |(sx, sy), q| (sx + q.x, sy + q.y));
        Point::new(sx / n, sy / n)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A synthetic open hand: every finger extended, thumb pointing right.
    pub(crate) fn hand_with(up: [bool; 5]) -> HandLandmarks {
        let mut xy = vec![(100, 300); LANDMARK_COUNT];
        // Thumb: joint 3 at x=100, tip at x=120 when up, x=80 when down
        xy[THUMB_TIP - 1] = (100, 250);
        xy[THUMB_TIP] = (if up[0] { 120 } else { 80 }, 250);
        for (finger, &tip) in TIP_IDS.iter().enumerate().skip(1) {
            let x = 100 + finger as i32 * 20;
            xy[tip - 2] = (x, 200);
            xy[tip] = (x, if up[finger] { 150 } else { 220 });
        }
        HandLandmarks::from_xy(&xy)
    }

    #[test]
    fn partial_hand_is_all_down_and_resets_smoothing() {
        for n in 0..LANDMARK_COUNT {
            let hand = HandLandmarks::from_xy(&vec![(0, 0); n]);
            let c = classify(Some(&hand));
            assert_eq!(c.fingers, FingerState::NONE);
            assert!(c.reset_smoothing);
        }
        assert!(classify(None).reset_smoothing);
    }

    #[test]
    fn reads_each_finger_independently() {
        let c = classify(Some(&hand_with([false, true, true, false, false])));
        assert!(!c.reset_smoothing);
        assert_eq!(c.fingers, FingerState([false, true, true, false, false]));

        let c = classify(Some(&hand_with([true, false, false, true, true])));
        assert_eq!(c.fingers, FingerState([true, false, false, true, true]));
    }

    #[test]
    fn equal_heights_count_as_down() {
        let mut hand = hand_with([false, true, false, false, false]);
        hand.points[INDEX_TIP].y = hand.points[INDEX_TIP - 2].y;
        assert!(!classify(Some(&hand)).fingers.index());
    }

    #[test]
    fn smoother_averages_and_resets() {
        let mut s = TipSmoother::new(2);
        s.smooth(Point::new(0, 0), Point::new(0, 0));
        let (i, _) = s.smooth(Point::new(10, 20), Point::new(0, 0));
        assert_eq!(i, Point::new(5, 10));
        let (i, _) = s.smooth(Point::new(30, 40), Point::new(0, 0));
        assert_eq!(i, Point::new(20, 30));
        s.reset();
        let (i, _) = s.smooth(Point::new(7, 7), Point::new(0, 0));
        assert_eq!(i, Point::new(7, 7));
    }
}
