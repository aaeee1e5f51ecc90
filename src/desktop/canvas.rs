//! Terminal frontend platform: decoded pages and surfaces as RGBA buffers

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, warn};

use super::decode_worker::{DecodeResponse, DecodeService};
use crate::controls::{ChromeHost, Control, ControlPanel, InfoPanel};
use crate::pages::PageSource;
use crate::platform::{
    DecodeOutcome, DrawRect, Overflow, PageDecoder, RequestId, SurfaceHost, ViewportHost,
    ViewportMetrics,
};
use crate::preload::Progress;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// One rendered chunk
#[derive(Debug, Clone)]
pub struct Canvas {
    pub id: usize,
    pub image: RgbaImage,
}

impl Canvas {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Scaled copy of the page drawn last, shared by every chunk of a draw
struct ScaledPage {
    page: usize,
    width: u32,
    height: u32,
    image: RgbaImage,
}

pub struct DesktopPlatform {
    decoder: DecodeService,
    images: HashMap<usize, RgbaImage>,
    completions: Vec<(RequestId, DecodeOutcome)>,
    metrics: ViewportMetrics,
    scroll_y: u32,
    overflow: Overflow,
    controls: ControlPanel,
    scaled: Option<ScaledPage>,
    next_surface: usize,
    live_surfaces: usize,
}

impl DesktopPlatform {
    pub fn new(metrics: ViewportMetrics) -> Self {
        Self {
            decoder: DecodeService::spawn(),
            images: HashMap::new(),
            completions: Vec::new(),
            metrics,
            scroll_y: 0,
            overflow: Overflow::default(),
            controls: ControlPanel::standard(),
            scaled: None,
            next_surface: 0,
            live_surfaces: 0,
        }
    }

    /// Collect finished decodes, keeping the pixels for drawing
    pub fn take_completions(&mut self) -> Vec<(RequestId, DecodeOutcome)> {
        for response in self.decoder.poll_responses() {
            self.accept(response);
        }
        std::mem::take(&mut self.completions)
    }

    /// Block until one decode finishes or `timeout` passes. The result is
    /// held for the next `take_completions`.
    pub fn wait_for_decode(&mut self, timeout: Duration) -> bool {
        match self.decoder.response_receiver().recv_timeout(timeout) {
            Ok(response) => {
                self.accept(response);
                true
            }
            Err(_) => false,
        }
    }

    fn accept(&mut self, response: DecodeResponse) {
        let completion = match response {
            DecodeResponse::Decoded { id, index, image } => {
                let outcome = DecodeOutcome::decoded(image.width(), image.height());
                self.images.insert(index, image);
                (id, outcome)
            }
            DecodeResponse::Failed { id, error, .. } => {
                (id, DecodeOutcome::failed(error.to_string()))
            }
        };
        self.completions.push(completion);
    }

    pub fn controls(&self) -> &ControlPanel {
        &self.controls
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.metrics = ViewportMetrics::new(width, height, self.metrics.pixel_density);
    }

    fn scaled_page(&mut self, page: usize, width: u32, height: u32) -> Option<&RgbaImage> {
        let cached = self
            .scaled
            .as_ref()
            .is_some_and(|s| s.page == page && s.width == width && s.height == height);
        if !cached {
            let source = self.images.get(&page)?;
            debug!("Scaling page {page} to {width}x{height}");
            self.scaled = Some(ScaledPage {
                page,
                width,
                height,
                image: imageops::resize(source, width, height, FilterType::Triangle),
            });
        }
        self.scaled.as_ref().map(|s| &s.image)
    }
}

impl PageDecoder for DesktopPlatform {
    fn decode(&mut self, id: RequestId, index: usize, source: &PageSource) {
        self.decoder.submit(id, index, source.clone());
    }
}

impl SurfaceHost for DesktopPlatform {
    type Surface = Canvas;

    fn allocate(&mut self, width: u32, height: u32) -> Canvas {
        let canvas = Canvas {
            id: self.next_surface,
            image: RgbaImage::from_pixel(width, height, BACKGROUND),
        };
        self.next_surface += 1;
        self.live_surfaces += 1;
        canvas
    }

    fn draw_page(&mut self, surface: &mut Canvas, page: usize, dst: DrawRect) {
        let width = dst.width.round().max(1.0) as u32;
        let height = dst.height.round().max(1.0) as u32;
        let Some(scaled) = self.scaled_page(page, width, height) else {
            warn!("No pixels for page {page}, surface {} left blank", surface.id);
            return;
        };
        imageops::overlay(
            &mut surface.image,
            scaled,
            dst.x.round() as i64,
            dst.y.round() as i64,
        );
    }

    fn release(&mut self, _surface: Canvas) {
        self.live_surfaces = self.live_surfaces.saturating_sub(1);
    }
}

impl ViewportHost for DesktopPlatform {
    fn metrics(&self) -> ViewportMetrics {
        self.metrics
    }

    fn scroll_y(&self) -> u32 {
        self.scroll_y
    }

    fn scroll_to(&mut self, y: u32) {
        self.scroll_y = y;
    }

    fn set_horizontal_overflow(&mut self, overflow: Overflow) {
        self.overflow = overflow;
    }
}

impl ChromeHost for DesktopPlatform {
    fn show_control(&mut self, control: Control) -> crate::Result<()> {
        self.controls.show_control(control)
    }

    fn hide_control(&mut self, control: Control) -> crate::Result<()> {
        self.controls.hide_control(control)
    }

    fn is_control_visible(&self, control: Control) -> bool {
        self.controls.is_control_visible(control)
    }

    fn update_progress(&mut self, progress: Progress) {
        self.controls.update_progress(progress);
    }

    fn update_info(&mut self, info: &InfoPanel) {
        self.controls.update_info(info);
    }
}

/// Write every chunk of the current draw as `page-NNN-chunk-K.png`
pub fn export_surfaces(surfaces: &[Canvas], page: usize, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {dir:?}"))?;
    surfaces
        .iter()
        .enumerate()
        .map(|(k, canvas)| {
            let path = dir.join(format!("page-{:03}-chunk-{k}.png", page + 1));
            canvas
                .image
                .save(&path)
                .with_context(|| format!("Failed to write {path:?}"))?;
            Ok(path)
        })
        .collect()
}
