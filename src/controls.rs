//! Named UI controls and the show/hide interface to them

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ViewerError};
use crate::layout::ZoomMode;
use crate::pages::PageSize;
use crate::preload::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Toolbar,
    LoadingOverlay,
    Thumbnails,
    StatusLeft,
    StatusRight,
    NavigateLeft,
    NavigateRight,
    PageUnavailable,
}

impl Control {
    pub const ALL: [Control; 8] = [
        Control::Toolbar,
        Control::LoadingOverlay,
        Control::Thumbnails,
        Control::StatusLeft,
        Control::StatusRight,
        Control::NavigateLeft,
        Control::NavigateRight,
        Control::PageUnavailable,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Control::Toolbar => "toolbar",
            Control::LoadingOverlay => "loadingOverlay",
            Control::Thumbnails => "thumbnails",
            Control::StatusLeft => "statusLeft",
            Control::StatusRight => "statusRight",
            Control::NavigateLeft => "navigateLeft",
            Control::NavigateRight => "navigateRight",
            Control::PageUnavailable => "pageUnavailable",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Control {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        Control::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ViewerError::UnrecognizedControl(s.to_string()))
    }
}

/// Text shown in the info panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPanel {
    pub file_name: Option<String>,
    pub zoom_mode: ZoomMode,
    pub image_size: Option<PageSize>,
}

impl InfoPanel {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(name) = &self.file_name {
            lines.push(format!("File: {name}"));
        }
        lines.push(format!("Zoom Mode: {}", self.zoom_mode.label()));
        match self.image_size {
            Some(size) => lines.push(format!("Image Size: {size}")),
            None => lines.push("Images loading!".to_string()),
        }
        lines
    }
}

/// Control visibility collaborator
pub trait ChromeHost {
    fn show_control(&mut self, control: Control) -> Result<()>;

    fn hide_control(&mut self, control: Control) -> Result<()>;

    fn is_control_visible(&self, control: Control) -> bool;

    fn update_progress(&mut self, _progress: Progress) {}

    fn update_info(&mut self, _info: &InfoPanel) {}
}

/// In-memory control state.
///
/// Only registered controls may be shown or hidden; anything else is a
/// wiring mistake and reported as `UnrecognizedControl`.
#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    registered: HashSet<Control>,
    visible: HashSet<Control>,
    progress: Progress,
    info: Option<InfoPanel>,
}

impl ControlPanel {
    pub fn with_controls(controls: impl IntoIterator<Item = Control>) -> Self {
        Self {
            registered: controls.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every known control registered, all hidden
    pub fn standard() -> Self {
        Self::with_controls(Control::ALL)
    }

    pub fn register(&mut self, control: Control) {
        self.registered.insert(control);
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn info(&self) -> Option<&InfoPanel> {
        self.info.as_ref()
    }

    fn check(&self, control: Control) -> Result<()> {
        if self.registered.contains(&control) {
            Ok(())
        } else {
            Err(ViewerError::UnrecognizedControl(control.name().to_string()))
        }
    }
}

impl ChromeHost for ControlPanel {
    fn show_control(&mut self, control: Control) -> Result<()> {
        self.check(control)?;
        self.visible.insert(control);
        Ok(())
    }

    fn hide_control(&mut self, control: Control) -> Result<()> {
        self.check(control)?;
        self.visible.remove(&control);
        Ok(())
    }

    fn is_control_visible(&self, control: Control) -> bool {
        self.visible.contains(&control)
    }

    fn update_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    fn update_info(&mut self, info: &InfoPanel) {
        self.info = Some(info.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_control_is_rejected() {
        let mut panel = ControlPanel::with_controls([Control::Toolbar]);
        assert!(panel.show_control(Control::Toolbar).is_ok());
        assert!(panel.is_control_visible(Control::Toolbar));
        assert_eq!(
            panel.show_control(Control::Thumbnails),
            Err(ViewerError::UnrecognizedControl("thumbnails".to_string()))
        );
    }

    #[test]
    fn control_names_round_trip() {
        for control in Control::ALL {
            assert_eq!(control.name().parse::<Control>(), Ok(control));
        }
        assert!(matches!(
            "sidebar".parse::<Control>(),
            Err(ViewerError::UnrecognizedControl(_))
        ));
    }

    #[test]
    fn info_panel_lines() {
        let info = InfoPanel {
            file_name: Some("vol1.cbz".to_string()),
            zoom_mode: ZoomMode::FitWindow,
            image_size: None,
        };
        assert_eq!(
            info.lines(),
            vec!["File: vol1.cbz", "Zoom Mode: Fit Window", "Images loading!"]
        );
    }
}
