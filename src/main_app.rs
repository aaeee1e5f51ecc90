//! Terminal application: owns the viewer and routes terminal events to it

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, error, info, warn};
use ratatui::{Frame, Terminal};

use crate::actions::{ActionTable, Trigger};
use crate::desktop::{DesktopPlatform, export_surfaces};
use crate::error::ViewerError;
use crate::input::{EventSource, PointerTracker, raw_key};
use crate::navigation::InputEvent;
use crate::platform::ViewportHost;
use crate::ui::{self, ViewSnapshot};
use crate::viewer::{DrawOutcome, Viewer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

pub struct App {
    pub viewer: Viewer<DesktopPlatform>,
    shortcuts: ActionTable,
    pointer_tracker: PointerTracker,
    page_input: String,
    show_help: bool,
    export_dir: PathBuf,
}

impl App {
    pub fn new(viewer: Viewer<DesktopPlatform>, shortcuts: ActionTable, export_dir: PathBuf) -> Self {
        Self {
            viewer: viewer.with_actions(shortcuts.clone()),
            shortcuts,
            pointer_tracker: PointerTracker::new(80, 24),
            page_input: String::new(),
            show_help: false,
            export_dir,
        }
    }

    /// First draw, at a 1-based page when given
    pub fn start(&mut self, page_number: Option<usize>) -> Result<DrawOutcome> {
        let outcome = match page_number {
            Some(n) => self.viewer.draw_page(Some(n), true)?,
            None => self.viewer.draw()?,
        };
        debug!("Initial draw: {outcome:?}");
        Ok(outcome)
    }

    pub fn page_input(&self) -> &str {
        &self.page_input
    }

    pub fn is_help_visible(&self) -> bool {
        self.show_help
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.pointer_tracker.resize(width, height);
    }

    /// Feed finished decodes to the viewer. Returns how many landed.
    pub fn pump_decodes(&mut self) -> Result<usize> {
        let completions = self.viewer.platform_mut().take_completions();
        let count = completions.len();
        for (id, outcome) in completions {
            self.viewer.on_decoded(id, outcome)?;
        }
        Ok(count)
    }

    /// Pump decodes until the preload queue drains or `timeout` passes
    pub fn wait_until_settled(&mut self, timeout: Duration) -> Result<bool> {
        self.wait_for(timeout, |viewer| viewer.scheduler().in_flight().is_none())
    }

    /// Pump decodes until the current page is decoded or failed
    pub fn wait_for_current_page(&mut self, timeout: Duration) -> Result<bool> {
        self.wait_for(timeout, |viewer| {
            viewer
                .pages()
                .page(viewer.pointer())
                .is_some_and(|page| page.state.is_resolved())
        })
    }

    fn wait_for(
        &mut self,
        timeout: Duration,
        done: impl Fn(&Viewer<DesktopPlatform>) -> bool,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump_decodes()?;
            if done(&self.viewer) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!("Gave up waiting for decodes after {timeout:?}");
                return Ok(false);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            self.viewer.platform_mut().wait_for_decode(left);
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(*key),
            Event::Mouse(mouse) => {
                if let Some(input) = self.pointer_tracker.handle(mouse) {
                    self.send_input(&input);
                }
                None
            }
            Event::Resize(width, height) => {
                self.resize(*width, *height);
                None
            }
            _ => None,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(AppAction::Quit);
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char(c) if c.is_ascii_digit() => self.page_input.push(c),
            KeyCode::Backspace => {
                self.page_input.pop();
            }
            KeyCode::Esc => self.page_input.clear(),
            KeyCode::Enter if !self.page_input.is_empty() => self.jump_to_typed_page(),
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('e') => match self.export_current() {
                Ok(written) => info!("Exported {} chunks to {:?}", written.len(), self.export_dir),
                Err(e) => error!("Export failed: {e:#}"),
            },
            KeyCode::Char(c) if self.shortcuts.lookup(&Trigger::Key(c)).is_some() => {
                let result = self.viewer.dispatch(&Trigger::Key(c));
                report("shortcut", result);
            }
            code => match raw_key(code) {
                Some(raw) => self.send_input(&InputEvent::KeyDown(raw)),
                None => debug!("Unmapped key {code:?}"),
            },
        }
        None
    }

    fn send_input(&mut self, input: &InputEvent) {
        let result = self.viewer.handle_event(input);
        report("input", result);
    }

    /// A typed page number acts like an external locator change; pages that
    /// have not landed yet are requested directly.
    fn jump_to_typed_page(&mut self) {
        let typed = std::mem::take(&mut self.page_input);
        let Ok(page_number) = typed.parse::<usize>() else {
            warn!("Ignoring page number {typed:?}");
            return;
        };
        let count = self.viewer.page_count();
        if page_number == 0 || page_number > count {
            warn!("{}", ViewerError::invalid_page(page_number, count));
            return;
        }
        let result = if self.viewer.pages().is_loaded(page_number - 1) {
            self.viewer.on_locator_changed(page_number)
        } else {
            self.viewer.draw_page(Some(page_number), true)
        };
        report("jump", result);
    }

    fn scroll_by(&mut self, direction: i64) {
        let metrics = self.viewer.platform().metrics();
        let step = i64::from((metrics.height / 10).max(1));
        let content = self
            .viewer
            .last_layout()
            .map_or(0, |layout| layout.draw_height.ceil() as u32);
        let max_scroll = i64::from(content.saturating_sub(metrics.height));
        let current = i64::from(self.viewer.platform().scroll_y());
        let target = (current + direction * step).clamp(0, max_scroll);
        self.viewer.platform_mut().scroll_to(target as u32);
    }

    /// Save the chunks of the current page as PNG files
    pub fn export_current(&self) -> Result<Vec<PathBuf>> {
        let surfaces = self.viewer.surfaces();
        if surfaces.is_empty() {
            anyhow::bail!("page {} has nothing rendered", self.viewer.pointer() + 1);
        }
        export_surfaces(surfaces, self.viewer.pointer(), &self.export_dir)
    }

    pub fn draw(&self, frame: &mut Frame) {
        let platform = self.viewer.platform();
        let state = self.viewer.state();
        let snapshot = ViewSnapshot {
            surfaces: self.viewer.surfaces(),
            pages: self.viewer.pages(),
            controls: platform.controls(),
            metrics: platform.metrics(),
            scroll_y: platform.scroll_y(),
            pointer: self.viewer.pointer(),
            zoom_mode: state.zoom_mode,
            direction: state.reading_direction,
            page_input: &self.page_input,
            show_help: self.show_help,
        };
        ui::draw(frame, &snapshot);
    }

    pub fn shutdown(&mut self) {
        self.viewer.destroy();
    }
}

fn report<T>(context: &str, result: crate::Result<T>) -> Option<T> {
    result
        .map_err(|e| error!("{context}: {e}"))
        .ok()
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    loop {
        app.pump_decodes()?;
        terminal.draw(|frame| app.draw(frame))?;

        if event_source.poll(tick_rate)? {
            let event = event_source.read()?;
            if app.handle_event(&event) == Some(AppAction::Quit) {
                info!("Quit requested");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ViewportMetrics;
    use crate::test_utils::test_helpers::sources;
    use crate::viewer::ViewerConfig;

    fn app(pages: usize) -> App {
        let platform = DesktopPlatform::new(ViewportMetrics::new(200, 100, 1.0));
        let viewer = Viewer::new(sources(pages), ViewerConfig::default(), platform);
        App::new(viewer, ActionTable::new(), PathBuf::from("unused"))
    }

    fn press(app: &mut App, code: KeyCode) -> Option<AppAction> {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn digits_collect_into_page_input() {
        let mut app = app(3);
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.page_input(), "12");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.page_input(), "1");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.page_input(), "");
    }

    #[test]
    fn out_of_range_jump_is_ignored() {
        let mut app = app(3);
        press(&mut app, KeyCode::Char('9'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.page_input(), "");
        assert_eq!(app.viewer.pointer(), 0);
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut app = app(1);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.is_help_visible());
        assert_eq!(press(&mut app, KeyCode::Char('q')), None);
        assert!(!app.is_help_visible());
        assert_eq!(press(&mut app, KeyCode::Char('q')), Some(AppAction::Quit));
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app(1);
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key_event(key), Some(AppAction::Quit));
    }

    #[test]
    fn export_without_rendered_page_fails() {
        let app = app(1);
        assert!(app.export_current().is_err());
    }
}
