//! Zoom modes and page layout
//!
//! `compute_layout` is a pure function of its request. The only state that
//! survives between draws, the sticky smart flag, is passed in and handed
//! back in the result for the caller to keep.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;
use crate::pages::PageSize;
use crate::platform::{Overflow, ViewportMetrics};

/// Pages taller than this many widths switch smart mode to original size
pub const DEFAULT_SMART_THRESHOLD: f32 = 2.5;

/// Modes visited by the cycle-zoom control, in order
pub const ZOOM_CYCLE: [ZoomMode; 3] = [ZoomMode::Smart, ZoomMode::OriginalSize, ZoomMode::FitWindow];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ZoomMode {
    /// User-chosen scale factor
    Manual,
    /// One image pixel per logical pixel
    OriginalSize,
    FitWidth,
    FitWindow,
    /// Fit window until a very tall page shows up, then original size for good
    #[default]
    Smart,
}

impl ZoomMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomMode::Manual => "manual",
            ZoomMode::OriginalSize => "originalSize",
            ZoomMode::FitWidth => "fitWidth",
            ZoomMode::FitWindow => "fitWindow",
            ZoomMode::Smart => "smart",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ZoomMode::Manual => "Manual",
            ZoomMode::OriginalSize => "Original Size",
            ZoomMode::FitWidth => "Fit Width",
            ZoomMode::FitWindow => "Fit Window",
            ZoomMode::Smart => "Smart",
        }
    }

    /// Next mode in the zoom cycle; modes outside it continue at the start
    pub fn cycle(self) -> ZoomMode {
        let next = ZOOM_CYCLE
            .iter()
            .position(|m| *m == self)
            .map_or(0, |i| (i + 1) % ZOOM_CYCLE.len());
        ZOOM_CYCLE[next]
    }
}

impl fmt::Display for ZoomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoomMode {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ZoomMode::Manual),
            "originalSize" | "original-size" => Ok(ZoomMode::OriginalSize),
            "fitWidth" | "fit-width" => Ok(ZoomMode::FitWidth),
            "fitWindow" | "fit-window" => Ok(ZoomMode::FitWindow),
            "smart" => Ok(ZoomMode::Smart),
            other => Err(ViewerError::UnknownZoomMode(other.to_string())),
        }
    }
}

/// Inputs to a single layout pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutRequest {
    pub mode: ZoomMode,
    pub viewport: ViewportMetrics,
    pub page: PageSize,
    pub manual_scale: f32,
    pub sticky_actual_size: bool,
    pub smart_threshold: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutResult {
    /// Scale applied to the page; callers keep it as the ambient manual scale
    pub scale: f32,
    pub draw_width: f32,
    pub draw_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Sticky smart flag after this pass
    pub sticky_actual_size: bool,
    pub overflow_x: Overflow,
}

/// Scale that grows or shrinks `page` towards `view` along one axis.
///
/// Shrinking divides exactly; growing uses `1 + (view - page) / view`, which
/// never overshoots the viewport.
fn fit_scale(view: f32, page: f32) -> f32 {
    if page <= 0.0 || view <= 0.0 {
        1.0
    } else if view > page {
        1.0 + (view - page) / view
    } else {
        view / page
    }
}

fn centered(view: f32, content: f32) -> f32 {
    if content < view {
        (view - content) / 2.0
    } else {
        0.0
    }
}

#[must_use]
pub fn compute_layout(req: &LayoutRequest) -> LayoutResult {
    let view_w = req.viewport.width as f32;
    let view_h = req.viewport.height as f32;
    let page_w = req.page.width as f32;
    let page_h = req.page.height as f32;

    let mut sticky = req.sticky_actual_size;
    let fit_window = || fit_scale(view_w, page_w).min(fit_scale(view_h, page_h));

    let (scale, overflow_x, center_vertically) = match req.mode {
        ZoomMode::Manual => (req.manual_scale, Overflow::Auto, false),
        ZoomMode::OriginalSize => (1.0, Overflow::Auto, false),
        ZoomMode::FitWidth => (fit_scale(view_w, page_w), Overflow::Hidden, false),
        ZoomMode::FitWindow => (fit_window(), Overflow::Hidden, true),
        ZoomMode::Smart => {
            if req.page.aspect_ratio() > req.smart_threshold {
                sticky = true;
            }
            if sticky {
                (1.0, Overflow::Auto, false)
            } else {
                (fit_window(), Overflow::Hidden, true)
            }
        }
    };

    let draw_width = page_w * scale;
    let draw_height = page_h * scale;

    LayoutResult {
        scale,
        draw_width,
        draw_height,
        offset_x: centered(view_w, draw_width),
        offset_y: if center_vertically {
            centered(view_h, draw_height)
        } else {
            0.0
        },
        sticky_actual_size: sticky,
        overflow_x,
    }
}
