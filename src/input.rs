//! Terminal input: event sources and mapping to viewer input events

use anyhow::Result;
pub use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

use crate::navigation::{InputEvent, RawKey, Side};

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Poll for events with a timeout
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<Event>;
}

/// Real keyboard and mouse event source using crossterm
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Simulated event source for testing
pub struct SimulatedEventSource {
    pub(crate) events: Vec<Event>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: crossterm::event::KeyEventKind::Press,
            state: crossterm::event::KeyEventState::empty(),
        })
    }

    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    pub fn mouse_event(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    pub fn mouse_down(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::Down(MouseButton::Left), column, row)
    }

    pub fn mouse_up(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::Up(MouseButton::Left), column, row)
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<Event> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(event)
        } else {
            // Return a quit event if we've exhausted all events
            Ok(SimulatedEventSource::char_key('q'))
        }
    }
}

/// Key code the navigation bindings understand, if the key has one
pub fn raw_key(code: KeyCode) -> Option<RawKey> {
    match code {
        KeyCode::Left => Some(RawKey::LEFT),
        KeyCode::Up => Some(RawKey::UP),
        KeyCode::Right => Some(RawKey::RIGHT),
        KeyCode::Down => Some(RawKey::DOWN),
        KeyCode::Enter => Some(RawKey(13)),
        KeyCode::Esc => Some(RawKey(27)),
        KeyCode::PageUp => Some(RawKey(33)),
        KeyCode::PageDown => Some(RawKey(34)),
        KeyCode::Char(' ') => Some(RawKey(32)),
        KeyCode::Char(c) if c.is_ascii_alphanumeric() => Some(RawKey::from_char(c)),
        _ => None,
    }
}

/// Horizontal travel, in cells, that turns a press/release into a swipe
pub const SWIPE_MIN_DISTANCE: u16 = 6;

/// Share of the rows at the bottom that cycles the zoom mode
pub const BOTTOM_REGION_RATIO: f32 = 0.15;

/// Turns left-button press/release pairs into clicks and swipes.
///
/// The page area is split into a bottom strip and, above it, left, center
/// and right thirds.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    width: u16,
    height: u16,
    pressed_at: Option<(u16, u16)>,
}

impl PointerTracker {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pressed_at: None,
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.pressed_at = None;
    }

    pub fn handle(&mut self, mouse: &MouseEvent) -> Option<InputEvent> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pressed_at = Some((mouse.column, mouse.row));
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let (start_column, start_row) = self.pressed_at.take()?;
                let dx = i32::from(mouse.column) - i32::from(start_column);
                if dx.unsigned_abs() >= u32::from(SWIPE_MIN_DISTANCE) {
                    return Some(if dx < 0 {
                        InputEvent::SwipeLeft
                    } else {
                        InputEvent::SwipeRight
                    });
                }
                Some(InputEvent::Click(self.click_side(start_column, start_row)))
            }
            _ => None,
        }
    }

    pub fn click_side(&self, column: u16, row: u16) -> Side {
        let bottom_rows = ((f32::from(self.height) * BOTTOM_REGION_RATIO).ceil() as u16).max(1);
        if row >= self.height.saturating_sub(bottom_rows) {
            return Side::Bottom;
        }
        let third = (self.width / 3).max(1);
        if column < third {
            Side::Left
        } else if column >= self.width.saturating_sub(third) {
            Side::Right
        } else {
            Side::Center
        }
    }
}
