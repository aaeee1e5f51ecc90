//! Chunked surface rendering
//!
//! A single surface has a maximum safe height, so a tall scaled page is
//! split into a stack of chunks. Every chunk draws the whole scaled page,
//! shifted up by the height of the chunks above it, so the stack reads as
//! one continuous image. The stack starts at the top of the viewport, so a
//! vertically centered page is drawn below its offset and the stack is tall
//! enough to hold it.

use log::debug;

use crate::platform::{DrawRect, SurfaceHost};

/// Maximum safe surface height in logical pixels
pub const MAX_CHUNK_HEIGHT: u32 = 1500;

/// One bounded-height slice of the rendered page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceChunk {
    pub index: usize,
    /// Logical height of this chunk
    pub height: u32,
    /// Vertical offset of the page image inside the chunk (never positive)
    pub image_offset_y: i64,
}

/// Split `draw_height` into chunks no taller than `max_chunk_height`
#[must_use]
pub fn plan_chunks(draw_height: u32, max_chunk_height: u32) -> Vec<SurfaceChunk> {
    let max = max_chunk_height.max(1);
    let mut chunks = Vec::with_capacity(draw_height.div_ceil(max) as usize);
    let mut remaining = draw_height;
    let mut consumed: i64 = 0;

    while remaining > 0 {
        let height = remaining.min(max);
        chunks.push(SurfaceChunk {
            index: chunks.len(),
            height,
            image_offset_y: -consumed,
        });
        consumed += i64::from(height);
        remaining -= height;
    }

    chunks
}

/// Where and how large to draw the page, in logical pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    pub offset_x: f32,
    pub offset_y: f32,
    pub draw_width: f32,
    pub draw_height: f32,
    pub viewport_width: u32,
    pub pixel_density: f32,
}

/// Owns the surfaces of the current draw and replaces them wholesale on
/// every render.
pub struct SurfaceRenderer<S> {
    max_chunk_height: u32,
    surfaces: Vec<S>,
    chunks: Vec<SurfaceChunk>,
}

impl<S> SurfaceRenderer<S> {
    #[must_use]
    pub fn new(max_chunk_height: u32) -> Self {
        Self {
            max_chunk_height: max_chunk_height.max(1),
            surfaces: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn max_chunk_height(&self) -> u32 {
        self.max_chunk_height
    }

    pub fn chunks(&self) -> &[SurfaceChunk] {
        &self.chunks
    }

    /// Surfaces of the last render, top to bottom
    pub fn surfaces(&self) -> &[S] {
        &self.surfaces
    }

    pub fn render<H>(&mut self, host: &mut H, page: usize, target: &RenderTarget) -> &[SurfaceChunk]
    where
        H: SurfaceHost<Surface = S>,
    {
        self.release_all(host);

        let density = target.pixel_density;
        let offset_y = target.offset_y.max(0.0);
        let content_height = if target.draw_height > 0.0 {
            (offset_y + target.draw_height).round() as u32
        } else {
            0
        };
        let logical_width = target.draw_width.max(target.viewport_width as f32);
        let device_width = ((logical_width * density).ceil() as u32).max(1);

        self.chunks = plan_chunks(content_height, self.max_chunk_height);
        for chunk in &self.chunks {
            let device_height = ((chunk.height as f32 * density).round() as u32).max(1);
            let mut surface = host.allocate(device_width, device_height);
            let dst = DrawRect {
                x: target.offset_x * density,
                y: (offset_y + chunk.image_offset_y as f32) * density,
                width: target.draw_width * density,
                height: target.draw_height * density,
            };
            host.draw_page(&mut surface, page, dst);
            self.surfaces.push(surface);
        }

        debug!(
            "Rendered page {page} as {} chunk(s) at {:.0}x{:.0}",
            self.chunks.len(),
            target.draw_width,
            target.draw_height
        );
        &self.chunks
    }

    /// Release every surface from the previous draw
    pub fn release_all<H>(&mut self, host: &mut H)
    where
        H: SurfaceHost<Surface = S>,
    {
        for surface in self.surfaces.drain(..) {
            host.release(surface);
        }
        self.chunks.clear();
    }
}
