// Persistent brush/eraser sizes and the description of the settings panel.

use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const CONFIG_FILE: &str = "size_config.json";
pub const DEFAULT_BRUSH_SIZE: u32 = 10;
pub const DEFAULT_ERASER_SIZE: u32 = 100;

fn default_brush_size() -> u32 {
    DEFAULT_BRUSH_SIZE
}

fn default_eraser_size() -> u32 {
    DEFAULT_ERASER_SIZE
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConfig {
    #[serde(default = "default_brush_size")]
    pub brush_size: u32,
    #[serde(default = "default_eraser_size")]
    pub eraser_size: u32,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self { brush_size: DEFAULT_BRUSH_SIZE, eraser_size: DEFAULT_ERASER_SIZE }
    }
}

impl SizeConfig {
    /// Read the config, falling back to defaults when the file is missing or
    /// unreadable. Out-of-range values are clamped into `spec`.
    pub fn load(path: &Path, spec: &SettingsSpec) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("no size config at {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<SizeConfig>(&content) {
            Ok(cfg) => cfg.clamped(spec),
            Err(e) => {
                tracing::warn!("size config {} is corrupt: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(brush = self.brush_size, eraser = self.eraser_size, "size config saved");
        Ok(())
    }

    pub fn clamped(self, spec: &SettingsSpec) -> Self {
        Self {
            brush_size: clamp_to(self.brush_size, &spec.brush_size_range),
            eraser_size: clamp_to(self.eraser_size, &spec.eraser_size_range),
        }
    }
}

fn clamp_to(v: u32, range: &RangeInclusive<u32>) -> u32 {
    v.clamp(*range.start(), *range.end())
}

/// Colors used by the settings panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub background: u32,
    pub track: u32,
    pub knob: u32,
    pub text: u32,
    pub button: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: 0x00_20_20_28,
            track: 0x00_50_50_60,
            knob: 0x00_FF_00_FF,
            text: 0x00_FF_FF_FF,
            button: 0x00_3C_8C_3C,
        }
    }
}

/// Which options the settings panel offers and how it looks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsSpec {
    pub brush_size_range: RangeInclusive<u32>,
    pub eraser_size_range: RangeInclusive<u32>,
    pub theme: Theme,
}

impl Default for SettingsSpec {
    fn default() -> Self {
        Self { brush_size_range: 1..=200, eraser_size_range: 10..=200, theme: Theme::default() }
    }
}
