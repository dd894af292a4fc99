// Pick capture/detection settings from the machine's RAM and core count.

use sysinfo::System;

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemClass {
    LowEnd,
    Medium,
    HighEnd,
}

/// Everything the frame loop and detector derive from the system class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemProfile {
    pub class: SystemClass,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub detection_confidence: f32,
    pub tracking_confidence: f32,
    pub max_hands: u32,
    /// Run detection on every n-th frame only.
    pub process_every: u32,
    /// Shrink frames to this size before handing them to the detector.
    pub detector_downscale: Option<(u32, u32)>,
}

impl SystemProfile {
    pub fn for_class(class: SystemClass) -> Self {
        match class {
            SystemClass::LowEnd => Self {
                class,
                fps: 30,
                width: 640,
                height: 480,
                detection_confidence: 0.6,
                tracking_confidence: 0.4,
                max_hands: 1,
                process_every: 2,
                detector_downscale: Some((320, 240)),
            },
            SystemClass::Medium => Self {
                class,
                fps: 45,
                width: 1024,
                height: 576,
                detection_confidence: 0.7,
                tracking_confidence: 0.5,
                max_hands: 1,
                process_every: 1,
                detector_downscale: None,
            },
            SystemClass::HighEnd => Self {
                class,
                fps: 60,
                width: 1280,
                height: 720,
                detection_confidence: 0.8,
                tracking_confidence: 0.6,
                max_hands: 1,
                process_every: 1,
                detector_downscale: None,
            },
        }
    }

    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    /// Probe this machine. A failed probe lands on the medium profile.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let ram = sys.total_memory();
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(0);
        let class = if ram == 0 || cores == 0 {
            tracing::warn!("system probe incomplete (ram={ram}, cores={cores}); assuming medium profile");
            SystemClass::Medium
        } else {
            classify(ram, cores)
        };
        let profile = Self::for_class(class);
        tracing::info!(
            ?class,
            ram_gib = ram as f64 / GIB as f64,
            cores,
            fps = profile.fps,
            width = profile.width,
            height = profile.height,
            "system profile"
        );
        profile
    }
}

/// `ram_bytes` total physical memory, `cores` logical CPUs.
pub fn classify(ram_bytes: u64, cores: usize) -> SystemClass {
    if ram_bytes < 4 * GIB || cores <= 2 {
        SystemClass::LowEnd
    } else if ram_bytes < 8 * GIB {
        SystemClass::Medium
    } else {
        SystemClass::HighEnd
    }
}
