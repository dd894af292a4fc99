// Crate-level error type.
// Every variant states *where* things went wrong; the frame loop logs these
// and decides whether to skip the frame or shut down.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("window init error: {0}")]
    WindowInit(String), // Creating a window failed
    #[error("window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed
    #[error("camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
    #[error("camera unavailable after {attempts} reinitialization attempt(s)")]
    CameraLost { attempts: u32 },
    #[error("hand detector error: {0}")]
    Detector(String),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("buffer size mismatch: {0}")]
    SizeMismatch(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
