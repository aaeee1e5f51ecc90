//! Collaborator seams provided by the host platform
//!
//! The viewer never decodes images or touches pixels itself. Decoding,
//! surface allocation and drawing, viewport metrics and control visibility
//! all live behind these traits so the same controller drives the terminal
//! frontend and the in-memory test platform.

use crate::controls::ChromeHost;
use crate::pages::PageSource;

/// Unique identifier for decode requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Result of a single decode reported by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded { width: u32, height: u32 },
    Failed { reason: String },
}

impl DecodeOutcome {
    pub fn decoded(width: u32, height: u32) -> Self {
        Self::Decoded { width, height }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Horizontal scroll policy for the page container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Content wider than the viewport can be scrolled
    #[default]
    Auto,
    /// Content is fitted, no horizontal scrolling
    Hidden,
}

/// Viewport dimensions in logical pixels plus the display density
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
}

impl ViewportMetrics {
    pub fn new(width: u32, height: u32, pixel_density: f32) -> Self {
        Self {
            width,
            height,
            pixel_density: if pixel_density.is_finite() && pixel_density > 0.0 {
                pixel_density
            } else {
                1.0
            },
        }
    }
}

/// Destination rectangle inside a surface, in device pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Asynchronous image decode primitive.
///
/// `decode` only starts the work. The platform reports completion later by
/// handing `(id, outcome)` to `Viewer::on_decoded`.
pub trait PageDecoder {
    fn decode(&mut self, id: RequestId, index: usize, source: &PageSource);
}

/// Drawable surface primitive
pub trait SurfaceHost {
    type Surface;

    /// Allocate a surface of the given device-pixel size, appended below
    /// any surfaces allocated earlier in the same draw
    fn allocate(&mut self, width: u32, height: u32) -> Self::Surface;

    /// Draw the decoded image of `page` scaled into `dst`
    fn draw_page(&mut self, surface: &mut Self::Surface, page: usize, dst: DrawRect);

    /// Remove a surface from the container
    fn release(&mut self, surface: Self::Surface);
}

/// Viewport metrics and scrolling
pub trait ViewportHost {
    fn metrics(&self) -> ViewportMetrics;

    fn scroll_y(&self) -> u32;

    fn scroll_to(&mut self, y: u32);

    fn set_horizontal_overflow(&mut self, _overflow: Overflow) {}
}

/// Everything the viewer controller needs from its host
pub trait Platform: PageDecoder + SurfaceHost + ViewportHost + ChromeHost {}

impl<T> Platform for T where T: PageDecoder + SurfaceHost + ViewportHost + ChromeHost {}
