pub mod canvas;
pub mod image;
pub mod overlay;
pub mod palette;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::{Brush, Canvas, Color, DrawCommand, Ellipse, Rect, RecordingCanvas};
pub use image::{decode_color, Bitmap};
pub use overlay::{HandOverlay, OverlayRenderer, OverlayStats, TickOverlay};
pub use palette::ColorRamp;
#[cfg(feature = "desktop")]
pub use minifb::Key;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;
