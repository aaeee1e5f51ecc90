//! Page list, decode states and load bookkeeping

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::platform::DecodeOutcome;

/// Reference to a page image (path or URL), opaque to the viewer
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageSource(pub String);

impl PageSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageSource {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PageSource {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Path> for PageSource {
    fn from(value: &Path) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Intrinsic page dimensions in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl PageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height over width; zero-width pages report 0
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DecodeState {
    #[default]
    Unrequested,
    Loading,
    Ready(PageSize),
    Failed(String),
}

impl DecodeState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }
}

#[derive(Clone, Debug)]
pub struct Page {
    pub source: PageSource,
    pub state: DecodeState,
}

/// Answer to "can I draw page N right now"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageLookup<'a> {
    Ready(PageSize),
    Pending,
    Failed(&'a str),
    NotFound,
}

/// Ordered pages plus the set of indices whose decode has completed
#[derive(Debug)]
pub struct PageStore {
    pages: Vec<Page>,
    loaded: Vec<bool>,
    loaded_count: usize,
}

impl PageStore {
    #[must_use]
    pub fn new(sources: Vec<PageSource>) -> Self {
        let loaded = vec![false; sources.len()];
        let pages = sources
            .into_iter()
            .map(|source| Page {
                source,
                state: DecodeState::Unrequested,
            })
            .collect();
        Self {
            pages,
            loaded,
            loaded_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn source(&self, index: usize) -> Option<&PageSource> {
        self.pages.get(index).map(|p| &p.source)
    }

    #[must_use]
    pub fn lookup(&self, index: usize) -> PageLookup<'_> {
        match self.pages.get(index).map(|p| &p.state) {
            None => PageLookup::NotFound,
            Some(DecodeState::Ready(size)) => PageLookup::Ready(*size),
            Some(DecodeState::Failed(reason)) => PageLookup::Failed(reason),
            Some(DecodeState::Unrequested | DecodeState::Loading) => PageLookup::Pending,
        }
    }

    /// Page size for a decoded page.
    pub fn size(&self, index: usize) -> crate::Result<PageSize> {
        match self.lookup(index) {
            PageLookup::Ready(size) => Ok(size),
            PageLookup::Pending => Err(crate::ViewerError::PageNotReady(index)),
            PageLookup::Failed(reason) => Err(crate::ViewerError::DecodeFailed {
                index,
                reason: reason.to_string(),
            }),
            PageLookup::NotFound => Err(crate::ViewerError::invalid_page(index, self.len())),
        }
    }

    pub fn mark_loading(&mut self, index: usize) {
        if let Some(page) = self.pages.get_mut(index) {
            if page.state == DecodeState::Unrequested {
                page.state = DecodeState::Loading;
            }
        }
    }

    /// Record a decode completion. Resolved pages never change again;
    /// returns false when the outcome was ignored.
    pub fn record(&mut self, index: usize, outcome: &DecodeOutcome) -> bool {
        let Some(page) = self.pages.get_mut(index) else {
            return false;
        };
        if page.state.is_resolved() {
            return false;
        }

        page.state = match outcome {
            DecodeOutcome::Decoded { width, height } => {
                DecodeState::Ready(PageSize::new(*width, *height))
            }
            DecodeOutcome::Failed { reason } => DecodeState::Failed(reason.clone()),
        };

        if !self.loaded[index] {
            self.loaded[index] = true;
            self.loaded_count += 1;
        }
        true
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.loaded.get(index).copied().unwrap_or(false)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }
}
