//! Persisted page locator
//!
//! The locator is a 1-based page number kept outside the viewer (a bookmark
//! file, a URL fragment). The viewer writes it back after every page change
//! and reconciles against it when it changes externally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub trait LocatorStore {
    fn read_locator(&self) -> Option<usize>;

    fn write_locator(&mut self, page_number: usize);
}

/// Locator that lives only as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryLocator {
    page: Option<usize>,
}

impl MemoryLocator {
    pub fn new(page: Option<usize>) -> Self {
        Self { page }
    }
}

impl LocatorStore for MemoryLocator {
    fn read_locator(&self) -> Option<usize> {
        self.page
    }

    fn write_locator(&mut self, page_number: usize) {
        self.page = Some(page_number);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Bookmark {
    pub page: usize,
    pub last_read: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub total_pages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Bookmarks {
    books: HashMap<String, Bookmark>,
    #[serde(skip)]
    file_path: Option<String>,
}

impl Bookmarks {
    pub fn ephemeral() -> Self {
        Self {
            books: HashMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &str) -> Self {
        Self {
            books: HashMap::new(),
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&str>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load bookmarks from {}: {}", path, e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(file_path);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut bookmarks: Self = serde_json::from_str(&content)?;
            bookmarks.file_path = Some(file_path.to_string());
            Ok(bookmarks)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                let content = serde_json::to_string_pretty(self)?;
                fs::write(path, content)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn get(&self, book: &str) -> Option<&Bookmark> {
        self.books.get(book)
    }

    pub fn update(&mut self, book: &str, page: usize, total_pages: usize) {
        self.books.insert(
            book.to_string(),
            Bookmark {
                page,
                last_read: chrono::Utc::now(),
                total_pages,
            },
        );
        if self.file_path.is_some() {
            if let Err(e) = self.save() {
                log::error!("Failed to save bookmark: {}", e);
            }
        }
    }
}

/// Locator backed by one book's entry in the bookmarks file
pub struct BookmarkLocator {
    bookmarks: Bookmarks,
    book: String,
    total_pages: usize,
}

impl BookmarkLocator {
    pub fn new(bookmarks: Bookmarks, book: impl Into<String>, total_pages: usize) -> Self {
        Self {
            bookmarks,
            book: book.into(),
            total_pages,
        }
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }
}

impl LocatorStore for BookmarkLocator {
    fn read_locator(&self) -> Option<usize> {
        self.bookmarks.get(&self.book).map(|b| b.page)
    }

    fn write_locator(&mut self, page_number: usize) {
        self.bookmarks
            .update(&self.book, page_number, self.total_pages);
    }
}
