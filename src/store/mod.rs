//! Content collaborators consumed by the renderer.
//!
//! The renderer never touches files or sockets itself. Page bodies, uploaded
//! file records and media dimensions all come through these traits.

mod fs;

pub use fs::{FsStore, ImageInspector};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    #[default]
    Normal,
    Redirect,
    /// An uploaded file that is not an image, video or audio clip.
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub name: String,
    pub body: String,
    pub kind: PageKind,
}

impl Page {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let kind = if is_redirect_body(&body) {
            PageKind::Redirect
        } else {
            PageKind::Normal
        };
        Self {
            name: name.into(),
            body,
            kind,
        }
    }

    pub fn with_kind(mut self, kind: PageKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Record of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Public URL, relative to the context path.
    pub url: String,
    /// Absolute path on disk, handed to the [`MediaInspector`].
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
}

impl FileRecord {
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

pub trait ContentStore {
    fn lookup_page(
        &self,
        site: &str,
        name: &str,
        include_deleted: bool,
    ) -> Result<Option<Page>, StoreError>;

    fn lookup_file(&self, site: &str, name: &str) -> Result<Option<FileRecord>, StoreError>;

    fn page_exists(&self, site: &str, name: &str) -> Result<bool, StoreError> {
        Ok(self.lookup_page(site, name, false)?.is_some())
    }
}

pub trait MediaInspector {
    fn image_dimensions(&self, path: &Path) -> Option<Dimensions>;
    fn video_dimensions(&self, path: &Path) -> Option<Dimensions>;
}

/// Inspector that never knows any dimensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMedia;

impl MediaInspector for NoMedia {
    fn image_dimensions(&self, _path: &Path) -> Option<Dimensions> {
        None
    }

    fn video_dimensions(&self, _path: &Path) -> Option<Dimensions> {
        None
    }
}

/// In-memory store keyed by (site, page name).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pages: HashMap<(String, String), Page>,
    files: HashMap<(String, String), FileRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(&mut self, site: &str, page: Page) {
        self.pages
            .insert((site.to_string(), page.name.clone()), page);
    }

    /// Convenience for `insert_page(site, Page::new(name, body))`.
    pub fn with_page(mut self, site: &str, name: &str, body: &str) -> Self {
        self.insert_page(site, Page::new(name, body));
        self
    }

    pub fn insert_file(&mut self, site: &str, name: &str, file: FileRecord) {
        self.files.insert((site.to_string(), name.to_string()), file);
    }
}

impl ContentStore for MemoryStore {
    fn lookup_page(
        &self,
        site: &str,
        name: &str,
        _include_deleted: bool,
    ) -> Result<Option<Page>, StoreError> {
        Ok(self
            .pages
            .get(&(site.to_string(), name.to_string()))
            .cloned())
    }

    fn lookup_file(&self, site: &str, name: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self
            .files
            .get(&(site.to_string(), name.to_string()))
            .cloned())
    }
}

/// Inspector with fixed dimensions per path, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct FixedMedia {
    dims: HashMap<PathBuf, Dimensions>,
}

impl FixedMedia {
    pub fn with(mut self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        self.dims.insert(path.into(), Dimensions { width, height });
        self
    }
}

impl MediaInspector for FixedMedia {
    fn image_dimensions(&self, path: &Path) -> Option<Dimensions> {
        self.dims.get(path).copied()
    }

    fn video_dimensions(&self, path: &Path) -> Option<Dimensions> {
        self.dims.get(path).copied()
    }
}

pub(crate) fn is_redirect_body(body: &str) -> bool {
    body.trim_start().to_ascii_uppercase().starts_with("#REDIRECT")
}

/// Guess a MIME type from a file name extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_body_sets_kind() {
        assert_eq!(Page::new("A", "#REDIRECT [[B]]").kind, PageKind::Redirect);
        assert_eq!(Page::new("A", "  #redirect [[B]]").kind, PageKind::Redirect);
        assert_eq!(Page::new("A", "text").kind, PageKind::Normal);
    }

    #[test]
    fn memory_store_is_keyed_by_site() {
        let store = MemoryStore::new().with_page("en", "Main", "hello");
        assert!(store.page_exists("en", "Main").unwrap());
        assert!(!store.page_exists("de", "Main").unwrap());
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_type_for("a.PNG"), "image/png");
        assert_eq!(mime_type_for("clip.webm"), "video/webm");
        assert_eq!(mime_type_for("noext"), "application/octet-stream");
    }
}
