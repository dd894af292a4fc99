// Hand landmark detection.
// The detector runs as a helper process. Per frame it reads a header of
// three little-endian u32 (width, height, channels) followed by raw RGB
// bytes on stdin, and answers with one JSON line on stdout:
// `{"hands":[{"score":0.9,"landmarks":[{"x":0.5,"y":0.4}, ...]}],"error":null}`.
// Coordinates are normalized to 0..1. The process prints `READY` once it
// has loaded its model.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;

use crate::error::Error;
use crate::gesture::{HandLandmarks, Landmark};
use crate::profile::SystemProfile;
use crate::types::{FrameBuffer, channels};

pub trait LandmarkProvider {
    /// Run detection on `frame`, replacing the previous result.
    fn detect(&mut self, frame: &FrameBuffer) -> Result<(), Error>;
    /// Landmarks of hand `hand_index` from the last detection.
    fn find(&self, hand_index: usize) -> Option<&HandLandmarks>;
    fn hand_count(&self) -> usize;
}

/// Used when no detector is configured: never sees a hand.
#[derive(Default)]
pub struct NoHands;

impl LandmarkProvider for NoHands {
    fn detect(&mut self, _frame: &FrameBuffer) -> Result<(), Error> {
        Ok(())
    }

    fn find(&self, _hand_index: usize) -> Option<&HandLandmarks> {
        None
    }

    fn hand_count(&self) -> usize {
        0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub max_hands: u32,
    pub detection_confidence: f32,
    pub tracking_confidence: f32,
    /// Send frames at this size instead of full resolution.
    pub downscale: Option<(u32, u32)>,
}

impl From<&SystemProfile> for DetectorConfig {
    fn from(p: &SystemProfile) -> Self {
        Self {
            max_hands: p.max_hands,
            detection_confidence: p.detection_confidence,
            tracking_confidence: p.tracking_confidence,
            downscale: p.detector_downscale,
        }
    }
}

#[derive(Deserialize, Debug)]
struct PointJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default = "full_score")]
    score: f32,
    landmarks: Vec<PointJson>,
}

fn full_score() -> f32 {
    1.0
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one reply line into hands in `width` x `height` pixel space.
/// Hands below `min_score` are dropped and at most `max_hands` are kept.
pub fn parse_detection(line: &str, width: usize, height: usize, cfg: &DetectorConfig) -> Result<Vec<HandLandmarks>, Error> {
    let reply: DetectionJson = serde_json::from_str(line.trim())?;
    if let Some(err) = reply.error {
        return Err(Error::Detector(err));
    }
    let (w, h) = (width as f32, height as f32);
    let hands = reply
        .hands
        .into_iter()
        .filter(|hand| hand.score >= cfg.detection_confidence)
        .take(cfg.max_hands as usize)
        .map(|hand| {
            let points = hand
                .landmarks
                .iter()
                .enumerate()
                .map(|(id, p)| Landmark { id, x: (p.x * w) as i32, y: (p.y * h) as i32 })
                .collect();
            HandLandmarks::new(points)
        })
        .collect();
    Ok(hands)
}

/// Nearest-neighbour RGB bytes of `frame` at `width` x `height`.
pub fn rgb_bytes(frame: &FrameBuffer, width: usize, height: usize) -> Vec<u8> {
    let scaled = frame.resized(width, height);
    let mut out = Vec::with_capacity(width * height * 3);
    for &px in &scaled.pixels {
        let (r, g, b) = channels(px);
        out.extend_from_slice(&[r, g, b]);
    }
    out
}

pub struct HelperProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    config: DetectorConfig,
    hands: Vec<HandLandmarks>,
}

impl HelperProcess {
    /// Start `command` (program followed by whitespace-separated arguments)
    /// and wait for it to report ready.
    pub fn spawn(command: &str, config: DetectorConfig) -> Result<Self, Error> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| Error::Detector("empty detector command".into()))?;
        tracing::info!("starting hand detector: {command}");

        let mut child = Command::new(program)
            .args(parts)
            .arg("--max-hands")
            .arg(config.max_hands.to_string())
            .arg("--detection-confidence")
            .arg(config.detection_confidence.to_string())
            .arg("--tracking-confidence")
            .arg(config.tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("spawn {program}: {e}")))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            abort(&mut child);
            return Err(Error::Detector("detector pipes unavailable".into()));
        };
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        if let Err(e) = stdout.read_line(&mut ready) {
            abort(&mut child);
            return Err(Error::Detector(format!("reading detector handshake: {e}")));
        }
        if ready.trim() != "READY" {
            abort(&mut child);
            return Err(Error::Detector(format!("detector did not signal ready, got {:?}", ready.trim())));
        }
        tracing::info!("hand detector ready");
        Ok(Self { child, stdin, stdout, config, hands: Vec::new() })
    }
}

/// Kill and reap a helper that failed its handshake.
fn abort(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("killing hand detector: {e}");
    }
    let _ = child.wait();
}

impl LandmarkProvider for HelperProcess {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        self.hands.clear();
        let (sw, sh) = match self.config.downscale {
            Some((w, h)) => (w as usize, h as usize),
            None => (frame.width, frame.height),
        };

        self.stdin.write_all(&(sw as u32).to_le_bytes())?;
        self.stdin.write_all(&(sh as u32).to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(&rgb_bytes(frame, sw, sh))?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(Error::Detector("detector closed its output".into()));
        }
        // Normalized coordinates map straight onto the full-size frame
        self.hands = parse_detection(&line, frame.width, frame.height, &self.config)?;
        Ok(())
    }

    fn find(&self, hand_index: usize) -> Option<&HandLandmarks> {
        self.hands.get(hand_index)
    }

    fn hand_count(&self) -> usize {
        self.hands.len()
    }
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
