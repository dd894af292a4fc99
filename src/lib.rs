// Beyond The Brush: draw in the air in front of a webcam.
// Hand landmarks from a detector are classified into raised fingers, which
// drive a small mode machine (select a tool in the header, draw, swipe
// through guide pages, drag text). Strokes land on a persistent canvas that
// is composited over the live camera image every frame.

pub mod assets;
pub mod auth;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod draw;
pub mod error;
pub mod export;
pub mod font;
pub mod gamma;
pub mod gesture;
pub mod header;
pub mod history;
pub mod landmarks;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod painter;
pub mod profile;
pub mod settings_window;
pub mod stroke;
pub mod text;
pub mod tracking;
pub mod types;
pub mod upload;

pub use error::Error;
