//! Expanding command line paths into an ordered page list

use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::pages::PageSource;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Extensions the enabled image codecs can open
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions = IMAGE_EXTENSIONS.to_vec();
    if cfg!(feature = "image-bmp") {
        extensions.push("bmp");
    }
    if cfg!(feature = "image-tiff") {
        extensions.extend(["tif", "tiff"]);
    }
    if cfg!(feature = "image-avif") {
        extensions.push("avif");
    }
    extensions
}

pub fn is_page_image(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    supported_extensions().contains(&ext.as_str())
}

/// Pages in argument order. Directories contribute their images in natural
/// order (`page2` before `page10`); plain files are taken as given.
pub fn collect_page_sources(paths: &[PathBuf]) -> Vec<PageSource> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable entry under {path:?}: {e}");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && is_page_image(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
            debug!("{} page images in {path:?}", found.len());
            sources.extend(found.iter().map(|p| PageSource::from(p.as_path())));
        } else {
            sources.push(PageSource::from(path.as_path()));
        }
    }
    sources
}

/// Name shown in the info panel for a list of arguments
pub fn display_name(paths: &[PathBuf]) -> Option<String> {
    let first = paths.first()?;
    first
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
