//! Input event resolution
//!
//! Raw input is reduced to a physical side first (left/right), and only then
//! turned into a page step according to the reading direction. Resolution is
//! pure: the controller applies the resulting command.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::pages::PageStore;

/// Platform key code (DOM `keyCode` numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawKey(pub u32);

impl RawKey {
    pub const LEFT: RawKey = RawKey(37);
    pub const UP: RawKey = RawKey(38);
    pub const RIGHT: RawKey = RawKey(39);
    pub const DOWN: RawKey = RawKey(40);

    /// Letter and digit keys use their uppercase ASCII code
    pub fn from_char(c: char) -> RawKey {
        RawKey(c.to_ascii_uppercase() as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub previous: RawKey,
    pub next: RawKey,
    pub toggle_layout: RawKey,
    pub thumbnails: RawKey,
    pub toolbar: Option<RawKey>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            previous: RawKey::LEFT,
            next: RawKey::RIGHT,
            toggle_layout: RawKey::from_char('l'),
            thumbnails: RawKey::from_char('t'),
            toolbar: Some(RawKey::from_char('b')),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingDirection {
    /// Left to right
    #[default]
    Western,
    /// Right to left
    Manga,
}

impl ReadingDirection {
    pub fn toggled(self) -> Self {
        match self {
            ReadingDirection::Western => ReadingDirection::Manga,
            ReadingDirection::Manga => ReadingDirection::Western,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingDirection::Western => "Western",
            ReadingDirection::Manga => "Manga",
        }
    }

    /// Page step for a physical side
    pub fn step(self, side: Side) -> Option<NavCommand> {
        match (self, side) {
            (ReadingDirection::Western, Side::Left) | (ReadingDirection::Manga, Side::Right) => {
                Some(NavCommand::PrevPage)
            }
            (ReadingDirection::Western, Side::Right) | (ReadingDirection::Manga, Side::Left) => {
                Some(NavCommand::NextPage)
            }
            _ => None,
        }
    }
}

/// Clickable navigation region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Center,
    Bottom,
}

impl FromStr for Side {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "center" => Ok(Side::Center),
            "bottom" => Ok(Side::Bottom),
            other => Err(ViewerError::UnrecognizedNavigationEvent(format!(
                "click on {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(RawKey),
    Click(Side),
    SwipeLeft,
    SwipeRight,
    /// Event kind the platform could not classify
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    PrevPage,
    NextPage,
    ToggleChrome,
    CycleZoom,
    ToggleLayout,
    ToggleThumbnails,
}

#[derive(Debug, Clone, Default)]
pub struct NavigationStateMachine {
    bindings: KeyBindings,
}

impl NavigationStateMachine {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    /// Map an input event to a command.
    ///
    /// Every event is swallowed while the loading overlay is up so input
    /// cannot race the preloader.
    pub fn resolve(
        &self,
        event: &InputEvent,
        loading_visible: bool,
        direction: ReadingDirection,
    ) -> Result<Option<NavCommand>> {
        if loading_visible {
            return Ok(None);
        }

        let side = match event {
            InputEvent::Click(side) => *side,
            InputEvent::SwipeLeft => Side::Right,
            InputEvent::SwipeRight => Side::Left,
            InputEvent::KeyDown(key) => match self.key_command(*key) {
                KeyResolution::Side(side) => side,
                KeyResolution::Command(cmd) => return Ok(Some(cmd)),
                KeyResolution::Unbound => return Ok(None),
            },
            InputEvent::Unknown(kind) => {
                return Err(ViewerError::UnrecognizedNavigationEvent(kind.clone()));
            }
        };

        Ok(match side {
            Side::Center => Some(NavCommand::ToggleChrome),
            Side::Bottom => Some(NavCommand::CycleZoom),
            Side::Left | Side::Right => direction.step(side),
        })
    }

    fn key_command(&self, key: RawKey) -> KeyResolution {
        let b = &self.bindings;
        if key == b.previous {
            KeyResolution::Side(Side::Left)
        } else if key == b.next {
            KeyResolution::Side(Side::Right)
        } else if Some(key) == b.toolbar {
            KeyResolution::Command(NavCommand::ToggleChrome)
        } else if key == b.toggle_layout {
            KeyResolution::Command(NavCommand::ToggleLayout)
        } else if key == b.thumbnails {
            KeyResolution::Command(NavCommand::ToggleThumbnails)
        } else {
            KeyResolution::Unbound
        }
    }
}

enum KeyResolution {
    Side(Side),
    Command(NavCommand),
    Unbound,
}

/// Target pointer for an externally changed 1-based page locator.
///
/// Returns `None` when the locator is out of range, already matches the
/// pointer, or names a page that has not finished loading.
pub fn reconcile_locator(locator: usize, pointer: usize, pages: &PageStore) -> Option<usize> {
    let target = locator.checked_sub(1)?;
    if target >= pages.len() || target == pointer || !pages.is_loaded(target) {
        return None;
    }
    Some(target)
}
