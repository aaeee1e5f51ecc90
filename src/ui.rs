//! Terminal presentation of the viewer chrome
//!
//! The page itself is previewed from the rendered chunks with half-block
//! cells: each cell shows two vertically stacked viewport samples.

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};

use crate::controls::{ChromeHost, Control, ControlPanel};
use crate::desktop::Canvas;
use crate::layout::ZoomMode;
use crate::navigation::ReadingDirection;
use crate::pages::{DecodeState, PageStore};
use crate::platform::ViewportMetrics;

const BASE_00: Color = Color::Rgb(0x1B, 0x2B, 0x34);
const BASE_02: Color = Color::Rgb(0x4F, 0x5B, 0x66);
const BASE_05: Color = Color::Rgb(0xC0, 0xC5, 0xCE);
const BASE_08: Color = Color::Rgb(0xEC, 0x5F, 0x67);
const BASE_0B: Color = Color::Rgb(0x99, 0xC7, 0x94);
const BASE_0C: Color = Color::Rgb(0x5F, 0xB3, 0xB3);
const BASE_0D: Color = Color::Rgb(0x66, 0x99, 0xCC);

/// Everything one frame needs, borrowed from the viewer and its platform
pub struct ViewSnapshot<'a> {
    pub surfaces: &'a [Canvas],
    pub pages: &'a PageStore,
    pub controls: &'a ControlPanel,
    pub metrics: ViewportMetrics,
    pub scroll_y: u32,
    pub pointer: usize,
    pub zoom_mode: ZoomMode,
    pub direction: ReadingDirection,
    pub page_input: &'a str,
    pub show_help: bool,
}

pub fn draw(frame: &mut Frame, view: &ViewSnapshot) {
    let area = frame.area();
    let toolbar_visible = view.controls.is_control_visible(Control::Toolbar);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if toolbar_visible { 1 } else { 0 }),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    if toolbar_visible {
        frame.render_widget(toolbar_line(view), chunks[0]);
    }

    let page_area = chunks[1];
    if view.controls.is_control_visible(Control::PageUnavailable) {
        render_unavailable(frame, page_area, view);
    } else {
        frame.render_widget(
            PagePreview {
                surfaces: view.surfaces,
                metrics: view.metrics,
                scroll_y: view.scroll_y,
            },
            page_area,
        );
    }
    render_navigation_markers(frame, page_area, view.controls);

    if view.controls.is_control_visible(Control::Thumbnails) {
        render_thumbnails(frame, page_area, view);
    }
    if toolbar_visible {
        render_info_panel(frame, page_area, view.controls);
    }
    if view.controls.is_control_visible(Control::LoadingOverlay) {
        render_loading(frame, page_area, view.controls);
    }
    if view.show_help {
        render_help(frame, page_area);
    }

    frame.render_widget(status_line(view), chunks[2]);
}

fn toolbar_line(view: &ViewSnapshot) -> Paragraph<'static> {
    let style = Style::default().fg(BASE_05).bg(BASE_02);
    let active = Style::default()
        .fg(BASE_00)
        .bg(BASE_0D)
        .add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled(" ", style)];
    for (mode, key) in [
        (ZoomMode::FitWidth, 'w'),
        (ZoomMode::FitWindow, 'f'),
        (ZoomMode::OriginalSize, 'o'),
        (ZoomMode::Smart, 's'),
    ] {
        let label = format!(" {} [{key}] ", mode.label());
        spans.push(Span::styled(
            label,
            if mode == view.zoom_mode { active } else { style },
        ));
    }
    spans.push(Span::styled(
        format!(" zoom +/- | {} [m] ", view.direction.as_str()),
        style,
    ));
    Paragraph::new(Line::from(spans)).style(style)
}

fn status_line(view: &ViewSnapshot) -> Paragraph<'static> {
    let style = Style::default().fg(BASE_05).bg(BASE_00);
    let left = if view.controls.is_control_visible(Control::StatusLeft) {
        format!(" {} ", view.zoom_mode.label())
    } else {
        String::new()
    };
    let right = if !view.page_input.is_empty() {
        format!(" Go to page: {} ", view.page_input)
    } else if view.pages.is_empty() {
        String::from(" no pages ")
    } else if view.controls.is_control_visible(Control::StatusRight) {
        format!(" page {} of {} ", view.pointer + 1, view.pages.len())
    } else {
        format!(" {} / {} ", view.pointer + 1, view.pages.len())
    };
    Paragraph::new(Line::from(vec![
        Span::styled(left, style.fg(BASE_0C)),
        Span::styled(right, style),
    ]))
    .style(style)
}

fn render_unavailable(frame: &mut Frame, area: Rect, view: &ViewSnapshot) {
    let reason = match view.pages.page(view.pointer).map(|p| &p.state) {
        Some(DecodeState::Failed(reason)) => reason.clone(),
        _ => String::from("unknown error"),
    };
    let popup = centered_rect(60, 5, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(format!("Page {} is unavailable", view.pointer + 1)),
            Line::from(Span::styled(reason, Style::default().fg(BASE_08))),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BASE_08)),
        ),
        popup,
    );
}

fn render_navigation_markers(frame: &mut Frame, area: Rect, controls: &ControlPanel) {
    if area.width < 3 || area.height == 0 {
        return;
    }
    let row = area.y + area.height / 2;
    let style = Style::default().fg(BASE_05).bg(BASE_02);
    if controls.is_control_visible(Control::NavigateLeft) {
        frame.render_widget(
            Paragraph::new("◀").style(style),
            Rect::new(area.x, row, 1, 1),
        );
    }
    if controls.is_control_visible(Control::NavigateRight) {
        frame.render_widget(
            Paragraph::new("▶").style(style),
            Rect::new(area.x + area.width - 1, row, 1, 1),
        );
    }
}

fn render_info_panel(frame: &mut Frame, area: Rect, controls: &ControlPanel) {
    let Some(info) = controls.info() else {
        return;
    };
    let lines: Vec<Line> = info.lines().into_iter().map(Line::from).collect();
    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 4;
    let height = lines.len() as u16 + 2;
    if area.width < width || area.height < height {
        return;
    }
    let popup = Rect::new(area.x + area.width - width, area.y, width, height);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Info ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BASE_0C))
                .style(Style::default().bg(BASE_00).fg(BASE_05)),
        ),
        popup,
    );
}

fn render_thumbnails(frame: &mut Frame, area: Rect, view: &ViewSnapshot) {
    let width = area.width.min(40);
    let popup = Rect::new(area.x, area.y, width, area.height);
    let visible = popup.height.saturating_sub(2) as usize;
    let first = view.pointer.saturating_sub(visible / 2);

    let lines: Vec<Line> = (first..view.pages.len())
        .take(visible)
        .filter_map(|i| view.pages.page(i).map(|p| (i, p)))
        .map(|(i, page)| {
            let (mark, color) = match page.state {
                DecodeState::Ready(_) => ("●", BASE_0B),
                DecodeState::Failed(_) => ("✗", BASE_08),
                DecodeState::Loading => ("◌", BASE_0D),
                DecodeState::Unrequested => (" ", BASE_02),
            };
            let style = if i == view.pointer {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(color)),
                Span::styled(format!("{:>4} {}", i + 1, page.source), style),
            ])
        })
        .collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Pages ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BASE_0D))
                .style(Style::default().bg(BASE_00).fg(BASE_05)),
        ),
        popup,
    );
}

fn render_loading(frame: &mut Frame, area: Rect, controls: &ControlPanel) {
    let progress = controls.progress();
    let popup = centered_rect(50, 3, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Gauge::default()
            .block(
                Block::default()
                    .title(" Loading ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(BASE_0D)),
            )
            .gauge_style(Style::default().fg(BASE_0D).bg(BASE_00))
            .ratio(progress.ratio().clamp(0.0, 1.0))
            .label(format!("{}/{} ({}%)", progress.loaded, progress.total, progress.percent())),
        popup,
    );
}

const HELP_TEXT: &str = "\
←/→  previous / next page (swapped in manga mode)
↑/↓  scroll
click left/right  page step, center  toolbar, bottom  cycle zoom
drag  swipe
+ -  zoom in / out
w f o s  fit width, fit window, original size, smart
z  cycle zoom     m  reading direction
b  toolbar        t  page list
digits + Enter  go to page
e  export rendered chunks
?  help           q  quit";

fn render_help(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = HELP_TEXT.lines().map(|l| Line::from(format!("  {l}"))).collect();
    let popup = centered_rect(70, lines.len() as u16 + 2, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Help - Press ? or ESC to close ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BASE_0C))
                .style(Style::default().bg(BASE_00).fg(BASE_05)),
        ),
        popup,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Half-block preview of the rendered chunks
pub struct PagePreview<'a> {
    pub surfaces: &'a [Canvas],
    pub metrics: ViewportMetrics,
    pub scroll_y: u32,
}

impl PagePreview<'_> {
    /// Color of the page at a logical viewport position, if anything is drawn
    /// there
    fn sample(&self, x: f32, y: f32) -> Option<Color> {
        let density = self.metrics.pixel_density;
        let page_y = y + self.scroll_y as f32;
        if page_y < 0.0 || x < 0.0 {
            return None;
        }
        let mut device_y = (page_y * density) as u32;
        let device_x = (x * density) as u32;
        for canvas in self.surfaces {
            if device_y < canvas.height() {
                if device_x >= canvas.width() {
                    return None;
                }
                let px = canvas.image.get_pixel(device_x, device_y);
                return (px[3] > 0).then_some(Color::Rgb(px[0], px[1], px[2]));
            }
            device_y -= canvas.height();
        }
        None
    }
}

impl Widget for PagePreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let cell_w = self.metrics.width as f32 / f32::from(area.width);
        let half_h = self.metrics.height as f32 / (f32::from(area.height) * 2.0);

        for row in 0..area.height {
            for col in 0..area.width {
                let x = (f32::from(col) + 0.5) * cell_w;
                let top_y = (f32::from(row) * 2.0 + 0.5) * half_h;
                let bottom_y = (f32::from(row) * 2.0 + 1.5) * half_h;
                let top = self.sample(x, top_y).unwrap_or(Color::Reset);
                let bottom = self.sample(x, bottom_y).unwrap_or(Color::Reset);
                buf[(area.x + col, area.y + row)]
                    .set_symbol("▀")
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
    }
}
