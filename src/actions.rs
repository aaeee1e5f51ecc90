//! Toolbar actions and their dispatch table
//!
//! Controls declare their behaviour by action name. Names are resolved to
//! `Action` once, when the table is built, so a typo fails at startup rather
//! than on the first click.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ZoomIn,
    ZoomOut,
    FitWidth,
    FitWindow,
    OriginalSize,
    SmartZoom,
    CycleZoom,
    ToggleReadingDirection,
    ToggleToolbar,
    ToggleThumbnails,
    ToggleLayout,
    NextPage,
    PrevPage,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::ZoomIn,
        Action::ZoomOut,
        Action::FitWidth,
        Action::FitWindow,
        Action::OriginalSize,
        Action::SmartZoom,
        Action::CycleZoom,
        Action::ToggleReadingDirection,
        Action::ToggleToolbar,
        Action::ToggleThumbnails,
        Action::ToggleLayout,
        Action::NextPage,
        Action::PrevPage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::ZoomIn => "zoomIn",
            Action::ZoomOut => "zoomOut",
            Action::FitWidth => "fitWidth",
            Action::FitWindow => "fitWindow",
            Action::OriginalSize => "originalSize",
            Action::SmartZoom => "smart",
            Action::CycleZoom => "cycleZoom",
            Action::ToggleReadingDirection => "toggleReadingMode",
            Action::ToggleToolbar => "toggleToolbar",
            Action::ToggleThumbnails => "thumbs",
            Action::ToggleLayout => "toggleLayout",
            Action::NextPage => "drawNextPage",
            Action::PrevPage => "drawPrevPage",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| ViewerError::UnknownAction(s.to_string()))
    }
}

/// What fires an action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Shortcut character
    Key(char),
    /// Click on a named control element
    Click(String),
}

#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    bindings: HashMap<Trigger, Action>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `trigger` to the action called `action_name`
    pub fn register(&mut self, trigger: Trigger, action_name: &str) -> Result<()> {
        let action = action_name.parse::<Action>()?;
        self.bindings.insert(trigger, action);
        Ok(())
    }

    /// Build a table from `shortcut -> action name` pairs
    pub fn from_shortcuts(shortcuts: &BTreeMap<char, String>) -> Result<Self> {
        let mut table = Self::new();
        for (key, name) in shortcuts {
            table.register(Trigger::Key(*key), name)?;
        }
        Ok(table)
    }

    pub fn lookup(&self, trigger: &Trigger) -> Option<Action> {
        self.bindings.get(trigger).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Default keyboard shortcuts for toolbar actions
pub fn default_shortcuts() -> BTreeMap<char, String> {
    [
        ('+', Action::ZoomIn),
        ('=', Action::ZoomIn),
        ('-', Action::ZoomOut),
        ('w', Action::FitWidth),
        ('f', Action::FitWindow),
        ('o', Action::OriginalSize),
        ('s', Action::SmartZoom),
        ('z', Action::CycleZoom),
        ('m', Action::ToggleReadingDirection),
    ]
    .into_iter()
    .map(|(key, action)| (key, action.name().to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rejects_unknown_names() {
        let mut table = ActionTable::new();
        assert!(table.register(Trigger::Key('+'), "zoomIn").is_ok());
        assert_eq!(
            table.register(Trigger::Click("toolbar-bogus".into()), "explode"),
            Err(ViewerError::UnknownAction("explode".to_string()))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lookup_by_trigger() {
        let mut table = ActionTable::new();
        table
            .register(Trigger::Click("cb-fit-width".into()), "fitWidth")
            .unwrap();
        assert_eq!(
            table.lookup(&Trigger::Click("cb-fit-width".into())),
            Some(Action::FitWidth)
        );
        assert_eq!(table.lookup(&Trigger::Key('x')), None);
    }

    #[test]
    fn default_shortcuts_are_valid() {
        let table = ActionTable::from_shortcuts(&default_shortcuts()).unwrap();
        assert_eq!(table.lookup(&Trigger::Key('m')), Some(Action::ToggleReadingDirection));
        assert_eq!(table.len(), default_shortcuts().len());
    }

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>(), Ok(action));
        }
    }
}
