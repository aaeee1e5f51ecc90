//! Viewer error taxonomy

/// Errors surfaced by the viewer and its components.
///
/// `InvalidPageIndex`, `UnknownZoomMode`, `UnknownAction` and
/// `UnrecognizedControl` indicate a caller or configuration defect and are
/// propagated immediately. `PageNotReady` and `DecodeFailed` are runtime
/// conditions the controller handles locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error("invalid page {index} (page count {page_count})")]
    InvalidPageIndex { index: usize, page_count: usize },

    #[error("page {0} is not decoded yet")]
    PageNotReady(usize),

    #[error("page {index} failed to decode: {reason}")]
    DecodeFailed { index: usize, reason: String },

    #[error("invalid zoom mode {0}")]
    UnknownZoomMode(String),

    #[error("undefined control {0}")]
    UnrecognizedControl(String),

    #[error("invalid navigation event {0}")]
    UnrecognizedNavigationEvent(String),

    #[error("invalid action {0}")]
    UnknownAction(String),
}

impl ViewerError {
    pub fn invalid_page(index: usize, page_count: usize) -> Self {
        Self::InvalidPageIndex { index, page_count }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
