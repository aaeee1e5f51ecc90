// Export modules for use in tests
pub mod actions;
pub mod controls;
pub mod desktop;
pub mod error;
pub mod input;
pub mod layout;
pub mod locator;
pub mod main_app;
pub mod navigation;
pub mod pages;
pub mod panic_handler;
pub mod platform;
pub mod preload;
pub mod settings;
pub mod sources;
pub mod surface;
pub mod ui;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Result, ViewerError};
pub use main_app::{App, run_app_with_event_source};
pub use viewer::{DrawOutcome, Viewer, ViewerConfig};
