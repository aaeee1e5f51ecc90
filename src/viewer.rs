//! The viewer controller
//!
//! `Viewer` owns every piece of mutable cross-cutting state: the pointer, the
//! zoom state, the preload session and the surfaces of the current draw. All
//! operations take `&mut self`, so a redraw triggered by a decode completion
//! can never re-enter a running operation.

use log::{debug, info};

use crate::actions::{Action, ActionTable, Trigger};
use crate::controls::{Control, InfoPanel};
use crate::error::{Result, ViewerError};
use crate::layout::{DEFAULT_SMART_THRESHOLD, LayoutRequest, LayoutResult, ZoomMode, compute_layout};
use crate::locator::LocatorStore;
use crate::navigation::{
    InputEvent, KeyBindings, NavCommand, NavigationStateMachine, ReadingDirection,
    reconcile_locator,
};
use crate::pages::{PageSize, PageSource, PageStore};
use crate::platform::{DecodeOutcome, Platform, RequestId};
use crate::preload::{Availability, DEFAULT_FORWARD_BUFFER, PreloadEffect, PreloadScheduler, Progress};
use crate::surface::{MAX_CHUNK_HEIGHT, RenderTarget, SurfaceChunk, SurfaceRenderer};

/// Manual zoom step for zoom in/out
pub const ZOOM_STEP: f32 = 0.1;
/// Smallest manual scale
pub const MIN_MANUAL_SCALE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub zoom_mode: ZoomMode,
    pub reading_direction: ReadingDirection,
    pub forward_buffer: i32,
    pub key_bindings: KeyBindings,
    pub smart_threshold: f32,
    pub max_chunk_height: u32,
    /// Shown in the info panel
    pub file_name: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom_mode: ZoomMode::default(),
            reading_direction: ReadingDirection::default(),
            forward_buffer: DEFAULT_FORWARD_BUFFER,
            key_bindings: KeyBindings::default(),
            smart_threshold: DEFAULT_SMART_THRESHOLD,
            max_chunk_height: MAX_CHUNK_HEIGHT,
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    pub pointer: usize,
    pub zoom_mode: ZoomMode,
    /// Scale of the last layout; the starting point for manual zoom
    pub manual_scale: f32,
    pub reading_direction: ReadingDirection,
    /// Set once smart mode meets a very tall page, cleared only by a new viewer
    pub sticky_actual_size: bool,
}

/// What a draw request ended up doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOutcome {
    /// The page was laid out and rendered
    Drawn(LayoutResult),
    /// The page is still decoding; it is drawn once it lands
    Pending,
    /// The page failed to decode and the unavailable state is shown
    Unavailable,
    /// Nothing changed (boundary step, dropped command, no-op toggle)
    Unchanged,
    /// No pages, or the viewer was destroyed
    Empty,
}

pub struct Viewer<P: Platform> {
    platform: P,
    config: ViewerConfig,
    state: ViewerState,
    scheduler: PreloadScheduler,
    renderer: SurfaceRenderer<P::Surface>,
    navigation: NavigationStateMachine,
    actions: ActionTable,
    locator: Option<Box<dyn LocatorStore>>,
    last_layout: Option<LayoutResult>,
    destroyed: bool,
}

impl<P: Platform> Viewer<P> {
    pub fn new(pages: Vec<PageSource>, config: ViewerConfig, platform: P) -> Self {
        let state = ViewerState {
            pointer: 0,
            zoom_mode: config.zoom_mode,
            manual_scale: 1.0,
            reading_direction: config.reading_direction,
            sticky_actual_size: false,
        };
        let scheduler = PreloadScheduler::new(PageStore::new(pages), config.forward_buffer);
        info!(
            "Viewer created: {} pages, zoom {}, {} reading",
            scheduler.page_count(),
            state.zoom_mode,
            state.reading_direction.as_str()
        );
        Self {
            platform,
            renderer: SurfaceRenderer::new(config.max_chunk_height),
            navigation: NavigationStateMachine::new(config.key_bindings.clone()),
            actions: ActionTable::new(),
            config,
            state,
            scheduler,
            locator: None,
            last_layout: None,
            destroyed: false,
        }
    }

    /// Attach a persisted locator. A valid stored page becomes the starting
    /// pointer.
    pub fn with_locator(mut self, locator: Box<dyn LocatorStore>) -> Self {
        if let Some(page_number) = locator.read_locator() {
            match page_number.checked_sub(1) {
                Some(index) if index < self.page_count() => {
                    debug!("Starting at stored page {page_number}");
                    self.state.pointer = index;
                }
                _ => debug!("Ignoring stored page {page_number}"),
            }
        }
        self.locator = Some(locator);
        self
    }

    pub fn with_actions(mut self, actions: ActionTable) -> Self {
        self.actions = actions;
        self
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn pointer(&self) -> usize {
        self.state.pointer
    }

    pub fn page_count(&self) -> usize {
        self.scheduler.page_count()
    }

    pub fn pages(&self) -> &PageStore {
        self.scheduler.pages()
    }

    pub fn scheduler(&self) -> &PreloadScheduler {
        &self.scheduler
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn last_layout(&self) -> Option<&LayoutResult> {
        self.last_layout.as_ref()
    }

    pub fn chunks(&self) -> &[SurfaceChunk] {
        self.renderer.chunks()
    }

    pub fn surfaces(&self) -> &[P::Surface] {
        self.renderer.surfaces()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Start preloading if needed and draw the current page
    pub fn draw(&mut self) -> Result<DrawOutcome> {
        if self.destroyed || self.page_count() == 0 {
            return Ok(DrawOutcome::Empty);
        }
        let effects = self.scheduler.ensure(self.state.pointer);
        self.apply_effects(effects)?;
        self.render_pointer(false)
    }

    /// Draw a 1-based page number, or the current page when `None`
    pub fn draw_page(&mut self, page_number: Option<usize>, reset_scroll: bool) -> Result<DrawOutcome> {
        if self.destroyed {
            return Ok(DrawOutcome::Empty);
        }
        if let Some(page_number) = page_number {
            let count = self.page_count();
            if page_number == 0 || page_number > count {
                return Err(ViewerError::invalid_page(page_number, count));
            }
            self.set_pointer(page_number - 1);
            let effects = self.scheduler.ensure(self.state.pointer);
            self.apply_effects(effects)?;
        }
        if self.page_count() == 0 {
            return Ok(DrawOutcome::Empty);
        }
        self.render_pointer(reset_scroll)
    }

    pub fn draw_next_page(&mut self) -> Result<DrawOutcome> {
        let target = self.state.pointer.checked_add(1);
        self.step(target)
    }

    pub fn draw_prev_page(&mut self) -> Result<DrawOutcome> {
        let target = self.state.pointer.checked_sub(1);
        self.step(target)
    }

    pub fn set_zoom_mode(&mut self, mode: ZoomMode) -> Result<DrawOutcome> {
        debug!("Zoom mode {} -> {}", self.state.zoom_mode, mode);
        self.state.zoom_mode = mode;
        self.redraw()
    }

    /// Switch to manual zoom at `factor`
    pub fn set_manual_scale(&mut self, factor: f32) -> Result<DrawOutcome> {
        let factor = if factor.is_finite() {
            factor.max(MIN_MANUAL_SCALE)
        } else {
            1.0
        };
        self.state.manual_scale = factor;
        self.state.zoom_mode = ZoomMode::Manual;
        self.redraw()
    }

    pub fn zoom_in(&mut self) -> Result<DrawOutcome> {
        self.set_manual_scale(self.state.manual_scale + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Result<DrawOutcome> {
        self.set_manual_scale(self.state.manual_scale - ZOOM_STEP)
    }

    pub fn cycle_zoom_mode(&mut self) -> Result<DrawOutcome> {
        self.set_zoom_mode(self.state.zoom_mode.cycle())
    }

    pub fn toggle_reading_direction(&mut self) -> Result<()> {
        self.state.reading_direction = self.state.reading_direction.toggled();
        info!("Reading direction: {}", self.state.reading_direction.as_str());
        self.update_navigation_controls()
    }

    /// Show or hide the toolbar together with both status bars
    pub fn toggle_ui_overlay(&mut self) -> Result<()> {
        let show = !self.platform.is_control_visible(Control::Toolbar);
        for control in [Control::Toolbar, Control::StatusLeft, Control::StatusRight] {
            self.set_control_visible(control, show)?;
        }
        Ok(())
    }

    pub fn toggle_thumbnails(&mut self) -> Result<()> {
        let show = !self.platform.is_control_visible(Control::Thumbnails);
        self.set_control_visible(Control::Thumbnails, show)
    }

    /// Single-page layout is the only layout; the binding is accepted and
    /// leaves the view untouched.
    pub fn toggle_layout(&mut self) -> Result<DrawOutcome> {
        debug!("Layout toggle ignored: single page layout only");
        Ok(DrawOutcome::Unchanged)
    }

    /// Resolve and apply a raw input event
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<DrawOutcome> {
        if self.destroyed {
            return Ok(DrawOutcome::Empty);
        }
        let loading = self.platform.is_control_visible(Control::LoadingOverlay);
        let command = self
            .navigation
            .resolve(event, loading, self.state.reading_direction)?;

        match command {
            None => Ok(DrawOutcome::Unchanged),
            Some(NavCommand::PrevPage) => self.draw_prev_page(),
            Some(NavCommand::NextPage) => self.draw_next_page(),
            Some(NavCommand::CycleZoom) => self.cycle_zoom_mode(),
            Some(NavCommand::ToggleLayout) => self.toggle_layout(),
            Some(NavCommand::ToggleChrome) => {
                self.toggle_ui_overlay()?;
                Ok(DrawOutcome::Unchanged)
            }
            Some(NavCommand::ToggleThumbnails) => {
                self.toggle_thumbnails()?;
                Ok(DrawOutcome::Unchanged)
            }
        }
    }

    /// Feed a decode completion from the platform
    pub fn on_decoded(&mut self, id: RequestId, outcome: DecodeOutcome) -> Result<()> {
        if self.destroyed {
            debug!("Ignoring decode {id:?} on destroyed viewer");
            return Ok(());
        }
        let effects = self.scheduler.complete(id, outcome, self.state.pointer);
        self.apply_effects(effects)
    }

    /// The persisted locator changed outside the viewer
    pub fn on_locator_changed(&mut self, page_number: usize) -> Result<DrawOutcome> {
        if self.destroyed {
            return Ok(DrawOutcome::Empty);
        }
        match reconcile_locator(page_number, self.state.pointer, self.scheduler.pages()) {
            Some(target) => {
                debug!("Locator moved to page {page_number}");
                self.set_pointer(target);
                self.render_pointer(true)
            }
            None => Ok(DrawOutcome::Unchanged),
        }
    }

    /// Run the action bound to `trigger`, if any
    pub fn dispatch(&mut self, trigger: &Trigger) -> Result<DrawOutcome> {
        match self.actions.lookup(trigger) {
            Some(action) => self.apply_action(action),
            None => Ok(DrawOutcome::Unchanged),
        }
    }

    pub fn apply_action(&mut self, action: Action) -> Result<DrawOutcome> {
        debug!("Action {action}");
        match action {
            Action::ZoomIn => self.zoom_in(),
            Action::ZoomOut => self.zoom_out(),
            Action::FitWidth => self.set_zoom_mode(ZoomMode::FitWidth),
            Action::FitWindow => self.set_zoom_mode(ZoomMode::FitWindow),
            Action::OriginalSize => self.set_zoom_mode(ZoomMode::OriginalSize),
            Action::SmartZoom => self.set_zoom_mode(ZoomMode::Smart),
            Action::CycleZoom => self.cycle_zoom_mode(),
            Action::ToggleLayout => self.toggle_layout(),
            Action::NextPage => self.draw_next_page(),
            Action::PrevPage => self.draw_prev_page(),
            Action::ToggleReadingDirection => {
                self.toggle_reading_direction()?;
                Ok(DrawOutcome::Unchanged)
            }
            Action::ToggleToolbar => {
                self.toggle_ui_overlay()?;
                Ok(DrawOutcome::Unchanged)
            }
            Action::ToggleThumbnails => {
                self.toggle_thumbnails()?;
                Ok(DrawOutcome::Unchanged)
            }
        }
    }

    pub fn progress(&self) -> Progress {
        self.scheduler.progress()
    }

    pub fn info(&self) -> InfoPanel {
        InfoPanel {
            file_name: self.config.file_name.clone(),
            zoom_mode: self.state.zoom_mode,
            image_size: self.scheduler.pages().size(self.state.pointer).ok(),
        }
    }

    /// Stop observing decodes and release every surface. In-flight decodes
    /// are left to finish and ignored.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.scheduler.detach();
        self.renderer.release_all(&mut self.platform);
        self.last_layout = None;
        if let Err(e) = self.set_control_visible(Control::LoadingOverlay, false) {
            debug!("Loading overlay not hidden on destroy: {e}");
        }
        self.destroyed = true;
        info!("Viewer destroyed at page {}", self.state.pointer + 1);
    }

    fn step(&mut self, target: Option<usize>) -> Result<DrawOutcome> {
        if self.destroyed || self.page_count() == 0 {
            return Ok(DrawOutcome::Empty);
        }
        // Any page turn puts the chrome away, even one that goes nowhere
        for control in [Control::Toolbar, Control::StatusLeft, Control::StatusRight] {
            self.set_control_visible(control, false)?;
        }
        let Some(target) = target.filter(|t| *t < self.page_count()) else {
            self.platform.scroll_to(0);
            return Ok(DrawOutcome::Unchanged);
        };

        match self.scheduler.request(target) {
            Ok(Availability::Ready(size)) => {
                self.set_pointer(target);
                self.render_page(target, size, true)
            }
            Ok(Availability::Pending) => {
                self.set_control_visible(Control::LoadingOverlay, true)?;
                Ok(DrawOutcome::Pending)
            }
            Err(e) => {
                debug!("Dropping step to page {target}: {e}");
                Ok(DrawOutcome::Unchanged)
            }
        }
    }

    /// Redraw after a zoom change without touching the preload session
    fn redraw(&mut self) -> Result<DrawOutcome> {
        self.publish_info();
        if self.destroyed || !self.scheduler.pages().is_loaded(self.state.pointer) {
            return Ok(DrawOutcome::Unchanged);
        }
        self.render_pointer(false)
    }

    fn render_pointer(&mut self, reset_scroll: bool) -> Result<DrawOutcome> {
        let pointer = self.state.pointer;
        match self.scheduler.request(pointer) {
            Ok(Availability::Ready(size)) => self.render_page(pointer, size, reset_scroll),
            Ok(Availability::Pending) => {
                if self.scheduler.is_started() {
                    self.set_control_visible(Control::LoadingOverlay, true)?;
                }
                self.update_navigation_controls()?;
                Ok(DrawOutcome::Pending)
            }
            Err(ViewerError::DecodeFailed { index, reason }) => {
                debug!("Page {index} unavailable: {reason}");
                self.present_unavailable()?;
                Ok(DrawOutcome::Unavailable)
            }
            Err(e) => Err(e),
        }
    }

    fn render_page(&mut self, index: usize, size: PageSize, reset_scroll: bool) -> Result<DrawOutcome> {
        self.set_control_visible(Control::PageUnavailable, false)?;

        let metrics = self.platform.metrics();
        let layout = compute_layout(&LayoutRequest {
            mode: self.state.zoom_mode,
            viewport: metrics,
            page: size,
            manual_scale: self.state.manual_scale,
            sticky_actual_size: self.state.sticky_actual_size,
            smart_threshold: self.config.smart_threshold,
        });
        if layout.sticky_actual_size && !self.state.sticky_actual_size {
            info!("Page {index} ({size}) switched smart zoom to original size");
        }
        self.state.sticky_actual_size = layout.sticky_actual_size;
        self.state.manual_scale = layout.scale;

        self.platform.set_horizontal_overflow(layout.overflow_x);
        let target = RenderTarget {
            offset_x: layout.offset_x,
            offset_y: layout.offset_y,
            draw_width: layout.draw_width,
            draw_height: layout.draw_height,
            viewport_width: metrics.width,
            pixel_density: metrics.pixel_density,
        };
        self.renderer.render(&mut self.platform, index, &target);
        if reset_scroll {
            self.platform.scroll_to(0);
        }

        self.last_layout = Some(layout);
        self.update_navigation_controls()?;
        self.publish_info();
        Ok(DrawOutcome::Drawn(layout))
    }

    fn present_unavailable(&mut self) -> Result<()> {
        self.renderer.release_all(&mut self.platform);
        self.last_layout = None;
        self.set_control_visible(Control::PageUnavailable, true)?;
        self.update_navigation_controls()?;
        self.publish_info();
        Ok(())
    }

    fn apply_effects(&mut self, effects: Vec<PreloadEffect>) -> Result<()> {
        for effect in effects {
            match effect {
                PreloadEffect::ShowLoading => {
                    self.set_control_visible(Control::LoadingOverlay, true)?;
                }
                PreloadEffect::HideLoading => {
                    self.set_control_visible(Control::LoadingOverlay, false)?;
                }
                PreloadEffect::Decode { id, index, source } => {
                    self.platform.decode(id, index, &source);
                }
                PreloadEffect::Progress(progress) => {
                    self.platform.update_progress(progress);
                }
                PreloadEffect::Reveal(page) => {
                    self.set_pointer(page);
                    self.render_pointer(true)?;
                }
                PreloadEffect::Complete => {
                    info!("All {} pages preloaded", self.page_count());
                    self.set_control_visible(Control::StatusLeft, false)?;
                    self.set_control_visible(Control::StatusRight, false)?;
                }
            }
        }
        Ok(())
    }

    fn set_pointer(&mut self, index: usize) {
        if self.state.pointer != index {
            debug!("Pointer {} -> {}", self.state.pointer, index);
            self.state.pointer = index;
        }
        if let Some(locator) = self.locator.as_mut() {
            let page_number = index + 1;
            if locator.read_locator() != Some(page_number) {
                locator.write_locator(page_number);
            }
        }
    }

    fn set_control_visible(&mut self, control: Control, visible: bool) -> Result<()> {
        if visible {
            self.platform.show_control(control)
        } else {
            self.platform.hide_control(control)
        }
    }

    /// Hide the button that would step past either end of the book
    fn update_navigation_controls(&mut self) -> Result<()> {
        let pointer = self.state.pointer;
        let has_prev = pointer > 0;
        let has_next = pointer + 1 < self.page_count();
        let (prev_control, next_control) = match self.state.reading_direction {
            ReadingDirection::Western => (Control::NavigateLeft, Control::NavigateRight),
            ReadingDirection::Manga => (Control::NavigateRight, Control::NavigateLeft),
        };
        self.set_control_visible(prev_control, has_prev)?;
        self.set_control_visible(next_control, has_next)
    }

    fn publish_info(&mut self) {
        let info = self.info();
        self.platform.update_info(&info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ChromeHost;
    use crate::locator::MemoryLocator;
    use crate::navigation::{RawKey, Side};
    use crate::platform::{Overflow, ViewportHost};
    use crate::test_utils::test_helpers::{FakePlatform, complete_next, decode_all, sources};

    fn viewer(n: usize) -> Viewer<FakePlatform> {
        Viewer::new(sources(n), ViewerConfig::default(), FakePlatform::new(800, 600))
    }

    fn loaded_viewer(n: usize) -> Viewer<FakePlatform> {
        let mut v = viewer(n);
        v.draw().unwrap();
        decode_all(&mut v, |_| DecodeOutcome::decoded(1000, 1500));
        v
    }

    #[test]
    fn empty_book_draws_nothing() {
        let mut v = viewer(0);
        assert_eq!(v.draw().unwrap(), DrawOutcome::Empty);
        assert!(!v.platform().is_control_visible(Control::LoadingOverlay));
        assert!(v.platform().decode_requests.is_empty());
        assert_eq!(v.draw_next_page().unwrap(), DrawOutcome::Empty);
    }

    #[test]
    fn first_draw_shows_loading_until_pointer_decodes() {
        let mut v = viewer(3);
        assert_eq!(v.draw().unwrap(), DrawOutcome::Pending);
        assert!(v.platform().is_control_visible(Control::LoadingOverlay));
        assert_eq!(v.platform().decode_requests.len(), 1);

        assert_eq!(complete_next(&mut v, DecodeOutcome::decoded(1000, 1500)), Some(0));
        assert!(!v.platform().is_control_visible(Control::LoadingOverlay));
        assert_eq!(v.chunks().len(), 1);
        assert_eq!(v.platform().progress().loaded, 1);
        assert_eq!(v.platform().decode_requests.len(), 2);
    }

    #[test]
    fn second_draw_does_not_restart_preload() {
        let mut v = viewer(2);
        v.draw().unwrap();
        v.draw().unwrap();
        assert_eq!(v.platform().decode_requests.len(), 1);
    }

    #[test]
    fn next_and_prev_follow_loaded_pages() {
        let mut v = loaded_viewer(3);
        assert!(matches!(v.draw_next_page().unwrap(), DrawOutcome::Drawn(_)));
        assert_eq!(v.pointer(), 1);
        assert!(matches!(v.draw_prev_page().unwrap(), DrawOutcome::Drawn(_)));
        assert_eq!(v.pointer(), 0);
    }

    #[test]
    fn prev_at_first_page_scrolls_to_top_only() {
        let mut v = loaded_viewer(3);
        v.platform_mut().scroll_to(250);
        assert_eq!(v.draw_prev_page().unwrap(), DrawOutcome::Unchanged);
        assert_eq!(v.pointer(), 0);
        assert_eq!(v.platform().scroll_y(), 0);
    }

    #[test]
    fn next_at_last_page_is_a_no_op() {
        let mut v = loaded_viewer(2);
        v.draw_next_page().unwrap();
        assert_eq!(v.draw_next_page().unwrap(), DrawOutcome::Unchanged);
        assert_eq!(v.pointer(), 1);
    }

    #[test]
    fn step_to_pending_page_waits_for_decode() {
        let mut v = viewer(3);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::decoded(100, 100));

        assert_eq!(v.draw_next_page().unwrap(), DrawOutcome::Pending);
        assert_eq!(v.pointer(), 0);
        assert!(v.platform().is_control_visible(Control::LoadingOverlay));

        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        assert_eq!(v.pointer(), 1);
        assert!(!v.platform().is_control_visible(Control::LoadingOverlay));
    }

    #[test]
    fn step_onto_failed_page_is_dropped() {
        let mut v = viewer(3);
        v.draw().unwrap();
        decode_all(&mut v, |i| {
            if i == 1 {
                DecodeOutcome::failed("corrupt")
            } else {
                DecodeOutcome::decoded(100, 100)
            }
        });
        assert_eq!(v.draw_next_page().unwrap(), DrawOutcome::Unchanged);
        assert_eq!(v.pointer(), 0);
    }

    #[test]
    fn failed_pointer_page_presents_unavailable_state() {
        let mut v = viewer(2);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::failed("404"));

        assert!(v.platform().is_control_visible(Control::PageUnavailable));
        assert!(v.surfaces().is_empty());
        assert!(!v.platform().is_control_visible(Control::LoadingOverlay));

        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        assert!(matches!(v.draw_next_page().unwrap(), DrawOutcome::Drawn(_)));
        assert!(!v.platform().is_control_visible(Control::PageUnavailable));
    }

    #[test]
    fn draw_page_validates_range() {
        let mut v = loaded_viewer(3);
        assert_eq!(v.draw_page(Some(0), true), Err(ViewerError::invalid_page(0, 3)));
        assert_eq!(v.draw_page(Some(4), true), Err(ViewerError::invalid_page(4, 3)));
        assert!(matches!(v.draw_page(Some(3), true).unwrap(), DrawOutcome::Drawn(_)));
        assert_eq!(v.pointer(), 2);
    }

    #[test]
    fn draw_page_before_decode_is_revealed_later() {
        let mut v = viewer(5);
        assert_eq!(v.draw_page(Some(3), false).unwrap(), DrawOutcome::Pending);
        assert_eq!(v.pointer(), 2);
        assert_eq!(v.platform().decode_requests[0].1, 2);
        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        assert_eq!(v.chunks().len(), 1);
        assert_eq!(v.pointer(), 2);
    }

    #[test]
    fn sticky_smart_mode_survives_page_changes() {
        let mut v = viewer(2);
        v.draw().unwrap();
        decode_all(&mut v, |i| {
            if i == 0 {
                DecodeOutcome::decoded(400, 1200)
            } else {
                DecodeOutcome::decoded(1000, 1500)
            }
        });
        assert!(v.state().sticky_actual_size);

        let DrawOutcome::Drawn(layout) = v.draw_next_page().unwrap() else {
            panic!("expected a draw");
        };
        assert_eq!(layout.scale, 1.0);
        assert_eq!(v.platform().overflow, Overflow::Auto);
    }

    #[test]
    fn manual_zoom_continues_from_ambient_scale() {
        let mut v = loaded_viewer(1);
        v.set_zoom_mode(ZoomMode::FitWidth).unwrap();
        assert!((v.state().manual_scale - 0.8).abs() < 1e-4);

        let DrawOutcome::Drawn(layout) = v.zoom_in().unwrap() else {
            panic!("expected a draw");
        };
        assert_eq!(v.state().zoom_mode, ZoomMode::Manual);
        assert!((layout.scale - 0.9).abs() < 1e-4);
    }

    #[test]
    fn manual_scale_has_a_floor() {
        let mut v = loaded_viewer(1);
        v.set_manual_scale(0.0).unwrap();
        assert_eq!(v.state().manual_scale, MIN_MANUAL_SCALE);
    }

    #[test]
    fn bottom_click_cycles_zoom() {
        let mut v = loaded_viewer(1);
        v.handle_event(&InputEvent::Click(Side::Bottom)).unwrap();
        assert_eq!(v.state().zoom_mode, ZoomMode::OriginalSize);
        v.handle_event(&InputEvent::Click(Side::Bottom)).unwrap();
        assert_eq!(v.state().zoom_mode, ZoomMode::FitWindow);
        v.handle_event(&InputEvent::Click(Side::Bottom)).unwrap();
        assert_eq!(v.state().zoom_mode, ZoomMode::Smart);
    }

    #[test]
    fn manga_click_right_goes_back() {
        let mut v = loaded_viewer(3);
        v.draw_page(Some(2), true).unwrap();
        v.toggle_reading_direction().unwrap();
        v.handle_event(&InputEvent::Click(Side::Right)).unwrap();
        assert_eq!(v.pointer(), 0);
    }

    #[test]
    fn input_is_ignored_while_loading() {
        let mut v = viewer(3);
        v.draw().unwrap();
        assert_eq!(
            v.handle_event(&InputEvent::KeyDown(RawKey::RIGHT)).unwrap(),
            DrawOutcome::Unchanged
        );
        assert_eq!(v.pointer(), 0);
    }

    #[test]
    fn center_click_toggles_toolbar_and_step_hides_it() {
        let mut v = loaded_viewer(2);
        v.handle_event(&InputEvent::Click(Side::Center)).unwrap();
        assert!(v.platform().is_control_visible(Control::Toolbar));
        assert!(v.platform().is_control_visible(Control::StatusLeft));

        v.draw_next_page().unwrap();
        assert!(!v.platform().is_control_visible(Control::Toolbar));
        assert!(!v.platform().is_control_visible(Control::StatusRight));
    }

    #[test]
    fn boundary_step_still_hides_chrome() {
        let mut v = loaded_viewer(2);
        v.handle_event(&InputEvent::Click(Side::Center)).unwrap();
        assert!(v.platform().is_control_visible(Control::Toolbar));

        assert_eq!(v.draw_prev_page().unwrap(), DrawOutcome::Unchanged);
        assert!(!v.platform().is_control_visible(Control::Toolbar));
        assert!(!v.platform().is_control_visible(Control::StatusLeft));
        assert!(!v.platform().is_control_visible(Control::StatusRight));
    }

    #[test]
    fn pending_step_still_hides_chrome() {
        let mut v = viewer(3);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        v.handle_event(&InputEvent::Click(Side::Center)).unwrap();
        assert!(v.platform().is_control_visible(Control::Toolbar));

        assert_eq!(v.draw_next_page().unwrap(), DrawOutcome::Pending);
        assert!(!v.platform().is_control_visible(Control::Toolbar));
        assert!(!v.platform().is_control_visible(Control::StatusRight));
    }

    #[test]
    fn finished_preload_hides_status_bars() {
        let mut v = viewer(2);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        v.handle_event(&InputEvent::Click(Side::Center)).unwrap();
        assert!(v.platform().is_control_visible(Control::StatusLeft));

        complete_next(&mut v, DecodeOutcome::decoded(100, 100));
        assert!(v.scheduler().in_flight().is_none());
        assert!(!v.platform().is_control_visible(Control::StatusLeft));
        assert!(!v.platform().is_control_visible(Control::StatusRight));
    }

    #[test]
    fn navigation_buttons_follow_boundaries_and_direction() {
        let mut v = loaded_viewer(2);
        assert!(!v.platform().is_control_visible(Control::NavigateLeft));
        assert!(v.platform().is_control_visible(Control::NavigateRight));

        v.toggle_reading_direction().unwrap();
        assert!(v.platform().is_control_visible(Control::NavigateLeft));
        assert!(!v.platform().is_control_visible(Control::NavigateRight));
    }

    #[test]
    fn locator_is_written_back_and_reconciled() {
        let mut v = loaded_viewer(4).with_locator(Box::new(MemoryLocator::default()));
        v.draw_page(Some(3), true).unwrap();
        assert_eq!(v.locator.as_ref().and_then(|l| l.read_locator()), Some(3));

        assert!(matches!(v.on_locator_changed(1).unwrap(), DrawOutcome::Drawn(_)));
        assert_eq!(v.pointer(), 0);
        assert_eq!(v.on_locator_changed(9).unwrap(), DrawOutcome::Unchanged);
    }

    #[test]
    fn stored_locator_sets_starting_page() {
        let mut v = viewer(5).with_locator(Box::new(MemoryLocator::new(Some(4))));
        assert_eq!(v.pointer(), 3);
        v.draw().unwrap();
        assert_eq!(v.platform().decode_requests[0].1, 3);
    }

    #[test]
    fn actions_dispatch_through_table() {
        let mut table = ActionTable::new();
        table.register(Trigger::Key('w'), "fitWidth").unwrap();
        let mut v = loaded_viewer(1).with_actions(table);

        v.dispatch(&Trigger::Key('w')).unwrap();
        assert_eq!(v.state().zoom_mode, ZoomMode::FitWidth);
        assert_eq!(v.dispatch(&Trigger::Key('q')).unwrap(), DrawOutcome::Unchanged);
    }

    #[test]
    fn info_panel_reports_current_page() {
        let mut v = viewer(1);
        assert_eq!(v.info().image_size, None);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::decoded(640, 960));
        assert_eq!(v.info().image_size, Some(PageSize::new(640, 960)));
        assert_eq!(
            v.platform().info().map(|i| i.zoom_mode),
            Some(ZoomMode::Smart)
        );
    }

    #[test]
    fn destroy_releases_surfaces_and_ignores_late_decodes() {
        let mut v = viewer(3);
        v.draw().unwrap();
        complete_next(&mut v, DecodeOutcome::decoded(100, 4000));
        assert!(!v.surfaces().is_empty());
        let (id, _) = v.scheduler().in_flight().unwrap();

        v.destroy();
        assert!(v.surfaces().is_empty());
        assert_eq!(v.platform().live_surfaces(), 0);
        v.on_decoded(id, DecodeOutcome::decoded(1, 1)).unwrap();
        assert_eq!(v.progress().loaded, 1);
    }
}
