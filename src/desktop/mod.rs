//! Platform used by the terminal binary

pub mod canvas;
pub mod decode_worker;

pub use canvas::{Canvas, DesktopPlatform, export_surfaces};
pub use decode_worker::{DecodeFault, DecodeRequest, DecodeResponse, DecodeService};
