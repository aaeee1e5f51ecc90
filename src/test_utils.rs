pub mod test_helpers {
    use std::collections::HashSet;

    use crate::controls::{ChromeHost, Control, ControlPanel, InfoPanel};
    use crate::error::Result;
    use crate::input::{Event, KeyCode, KeyModifiers, SimulatedEventSource};
    use crate::pages::PageSource;
    use crate::platform::{
        DecodeOutcome, DrawRect, Overflow, PageDecoder, RequestId, SurfaceHost, ViewportHost,
        ViewportMetrics,
    };
    use crate::preload::Progress;
    use crate::viewer::Viewer;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Surface handle handed out by `FakePlatform`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FakeSurface {
        pub id: usize,
        pub width: u32,
        pub height: u32,
    }

    /// In-memory platform that records every request the viewer makes.
    ///
    /// Decodes are never answered on their own; tests complete them with
    /// `complete_next` or `decode_all`.
    pub struct FakePlatform {
        pub metrics: ViewportMetrics,
        pub scroll_y: u32,
        pub overflow: Overflow,
        pub decode_requests: Vec<(RequestId, usize, PageSource)>,
        pub allocations: Vec<FakeSurface>,
        pub draws: Vec<(usize, usize, DrawRect)>,
        pub controls: ControlPanel,
        next_surface: usize,
        live: HashSet<usize>,
    }

    impl FakePlatform {
        pub fn new(width: u32, height: u32) -> Self {
            Self::with_metrics(ViewportMetrics::new(width, height, 1.0))
        }

        pub fn with_metrics(metrics: ViewportMetrics) -> Self {
            Self {
                metrics,
                scroll_y: 0,
                overflow: Overflow::default(),
                decode_requests: Vec::new(),
                allocations: Vec::new(),
                draws: Vec::new(),
                controls: ControlPanel::standard(),
                next_surface: 0,
                live: HashSet::new(),
            }
        }

        /// Surfaces allocated and not yet released
        pub fn live_surfaces(&self) -> usize {
            self.live.len()
        }

        pub fn progress(&self) -> Progress {
            self.controls.progress()
        }

        pub fn info(&self) -> Option<&InfoPanel> {
            self.controls.info()
        }
    }

    impl PageDecoder for FakePlatform {
        fn decode(&mut self, id: RequestId, index: usize, source: &PageSource) {
            self.decode_requests.push((id, index, source.clone()));
        }
    }

    impl SurfaceHost for FakePlatform {
        type Surface = FakeSurface;

        fn allocate(&mut self, width: u32, height: u32) -> FakeSurface {
            let surface = FakeSurface {
                id: self.next_surface,
                width,
                height,
            };
            self.next_surface += 1;
            self.live.insert(surface.id);
            self.allocations.push(surface);
            surface
        }

        fn draw_page(&mut self, surface: &mut FakeSurface, page: usize, dst: DrawRect) {
            self.draws.push((surface.id, page, dst));
        }

        fn release(&mut self, surface: FakeSurface) {
            self.live.remove(&surface.id);
        }
    }

    impl ViewportHost for FakePlatform {
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

    impl ChromeHost for FakePlatform {
        fn show_control(&mut self, control: Control) -> Result<()> {
            self.controls.show_control(control)
        }

        fn hide_control(&mut self, control: Control) -> Result<()> {
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

    /// `n` page sources named `page-000.png`, `page-001.png`, ...
    pub fn sources(n: usize) -> Vec<PageSource> {
        (0..n)
            .map(|i| PageSource(format!("page-{i:03}.png")))
            .collect()
    }

    /// Answer the in-flight decode; returns the page it was for
    pub fn complete_next(viewer: &mut Viewer<FakePlatform>, outcome: DecodeOutcome) -> Option<usize> {
        let (id, index) = viewer.scheduler().in_flight()?;
        viewer.on_decoded(id, outcome).unwrap();
        Some(index)
    }

    /// Answer decodes until the preload queue is exhausted
    pub fn decode_all(viewer: &mut Viewer<FakePlatform>, outcome: impl Fn(usize) -> DecodeOutcome) {
        while let Some((id, index)) = viewer.scheduler().in_flight() {
            viewer.on_decoded(id, outcome(index)).unwrap();
        }
    }

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events
                .push(SimulatedEventSource::key_event(code, KeyModifiers::empty()));
            self
        }

        /// Press the right arrow n times
        pub fn next_page(mut self, times: usize) -> Self {
            for _ in 0..times {
                self = self.press_key(KeyCode::Right);
            }
            self
        }

        /// Press the left arrow n times
        pub fn prev_page(self) -> Self {
            self.press_key(KeyCode::Left)
        }

        /// Type a page number and confirm it
        pub fn go_to_page(mut self, page_number: usize) -> Self {
            for c in page_number.to_string().chars() {
                self = self.press_char(c);
            }
            self.press_key(KeyCode::Enter)
        }

        /// Left-click at a cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse_down(column, row));
            self.events.push(SimulatedEventSource::mouse_up(column, row));
            self
        }

        /// Drag horizontally from `from` to `to` along `row`
        pub fn swipe(mut self, from: u16, to: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse_down(from, row));
            self.events.push(SimulatedEventSource::mouse_up(to, row));
            self
        }

        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[test]
    fn test_scenario_builder() {
        let scenario = TestScenarioBuilder::new()
            .next_page(2)
            .prev_page()
            .go_to_page(12)
            .click(10, 10)
            .quit()
            .build();

        // 3 arrows, "1" "2" Enter, press+release, q
        assert_eq!(scenario.events.len(), 9);
    }
}
