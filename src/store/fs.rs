//! Directory-backed content store.
//!
//! Layout under the store root:
//!
//! - `pages/{site}/{Name}.wiki` for main-namespace pages
//! - `pages/{site}/{Namespace}/{Name}.wiki` for namespaced pages
//! - `files/{site}/{h}/{hh}/{File_name.ext}` for uploads, where `h` and `hh`
//!   are the first one and two hex digits of the md5 of the file name
//!
//! Spaces in names are stored as underscores; other reserved characters
//! (notably `/` in subpage names) are percent-encoded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use walkdir::WalkDir;

use super::{ContentStore, Dimensions, FileRecord, MediaInspector, Page, PageKind, mime_type_for};
use crate::error::StoreError;

const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'(')
    .remove(b')')
    .remove(b',');

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    index: HashMap<(String, String), PathBuf>,
}

impl FsStore {
    /// Open a store and index every `.wiki` page below `root/pages`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::MissingRoot(root));
        }
        let pages_root = root.join("pages");
        let mut index = HashMap::new();

        for entry in WalkDir::new(&pages_root)
            .min_depth(2)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "wiki")
            })
        {
            let Ok(relative) = entry.path().strip_prefix(&pages_root) else {
                continue;
            };
            if let Some((site, name)) = page_key_for(relative) {
                index.insert((site, name), entry.path().to_path_buf());
            }
        }

        tracing::debug!(root = %root.display(), pages = index.len(), "Indexed page store");
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All (site, page name) pairs, sorted.
    pub fn pages(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.index.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Where a page with this name is (or would be) stored.
    pub fn page_path(&self, site: &str, name: &str) -> PathBuf {
        let mut path = self.root.join("pages").join(site);
        let (ns, article) = match name.split_once(':') {
            Some((ns, article)) if !ns.is_empty() => (Some(ns), article),
            _ => (None, name),
        };
        if let Some(ns) = ns {
            path.push(encode_file_name(ns));
        }
        path.push(format!("{}.wiki", encode_file_name(article)));
        path
    }

    fn upload_path(&self, site: &str, file_name: &str) -> (PathBuf, String) {
        let hash = format!("{:x}", md5::compute(file_name.as_bytes()));
        let rel = format!("files/{}/{}/{}/{}", site, &hash[..1], &hash[..2], file_name);
        (self.root.join(&rel), format!("/{}", rel))
    }

    fn read_page(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(&e.into_bytes()).to_string()))
    }
}

impl ContentStore for FsStore {
    fn lookup_page(
        &self,
        site: &str,
        name: &str,
        _include_deleted: bool,
    ) -> Result<Option<Page>, StoreError> {
        let upload = self.lookup_file(site, name)?;
        let page = match self.index.get(&(site.to_string(), name.to_string())) {
            Some(path) => Some(Page::new(name, self.read_page(path)?)),
            // an upload without a description page still has a page.
            None => upload.as_ref().map(|_| Page::new(name, "")),
        };
        let Some(page) = page else {
            return Ok(None);
        };
        match upload {
            Some(file) if !(file.is_image() || file.is_video() || file.is_audio()) => {
                Ok(Some(page.with_kind(PageKind::File)))
            }
            _ => Ok(Some(page)),
        }
    }

    fn lookup_file(&self, site: &str, name: &str) -> Result<Option<FileRecord>, StoreError> {
        let article = name.split_once(':').map_or(name, |(_, a)| a);
        let file_name = article.trim().replace(' ', "_");
        // upload names are a single path component under `files/`.
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
            return Ok(None);
        }
        let (path, url) = self.upload_path(site, &file_name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(FileRecord {
            url,
            mime_type: mime_type_for(&file_name).to_string(),
            path,
            file_name,
        }))
    }

    fn page_exists(&self, site: &str, name: &str) -> Result<bool, StoreError> {
        if self.index.contains_key(&(site.to_string(), name.to_string())) {
            return Ok(true);
        }
        Ok(self.lookup_file(site, name)?.is_some())
    }
}

/// Measures images with the `image` crate. Video dimensions are unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageInspector;

impl MediaInspector for ImageInspector {
    fn image_dimensions(&self, path: &Path) -> Option<Dimensions> {
        match image::image_dimensions(path) {
            Ok((width, height)) => Some(Dimensions { width, height }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to measure image");
                None
            }
        }
    }

    fn video_dimensions(&self, _path: &Path) -> Option<Dimensions> {
        None
    }
}

fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(&name.trim().replace(' ', "_"), FILE_NAME_SET).to_string()
}

fn decode_file_name(stem: &str) -> String {
    percent_decode_str(stem)
        .decode_utf8_lossy()
        .replace('_', " ")
}

/// `site/Name.wiki` or `site/Namespace/Name.wiki` to (site, page name).
fn page_key_for(relative: &Path) -> Option<(String, String)> {
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    let stem = |file: &str| file.strip_suffix(".wiki").map(decode_file_name);
    match parts.as_slice() {
        [site, file] => Some((site.to_string(), stem(file)?)),
        [site, ns, file] => Some((
            site.to_string(),
            format!("{}:{}", decode_file_name(ns), stem(file)?),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn indexes_main_and_namespaced_pages() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("pages/en/Main_Page.wiki"), "hello");
        write(&dir.path().join("pages/en/Template/Welcome.wiki"), "Hi");
        write(&dir.path().join("pages/en/A%2FB.wiki"), "sub");

        let store = FsStore::open(dir.path()).unwrap();
        assert_eq!(
            store.pages(),
            vec![
                ("en".to_string(), "A/B".to_string()),
                ("en".to_string(), "Main Page".to_string()),
                ("en".to_string(), "Template:Welcome".to_string()),
            ]
        );
        let page = store.lookup_page("en", "Template:Welcome", false).unwrap().unwrap();
        assert_eq!(page.body, "Hi");
        assert_eq!(store.page_path("en", "A/B"), dir.path().join("pages/en/A%2FB.wiki"));
    }

    #[test]
    fn upload_names_cannot_leave_the_files_directory() {
        let dir = tempdir().unwrap();
        let name = "../../../../secret.txt";
        let hash = format!("{:x}", md5::compute(name.as_bytes()));
        fs::create_dir_all(dir.path().join(format!("files/en/{}/{}", &hash[..1], &hash[..2]))).unwrap();
        write(&dir.path().join("secret.txt"), "top secret");
        write(&dir.path().join("files/en/x/y.png"), "png");

        let store = FsStore::open(dir.path()).unwrap();
        assert!(store.lookup_file("en", &format!("Image:{name}")).unwrap().is_none());
        assert!(store.lookup_file("en", "Image:x/y.png").unwrap().is_none());
        assert!(store.lookup_file("en", "Image:x\\y.png").unwrap().is_none());
        assert!(store.lookup_file("en", "Image:..").unwrap().is_none());
        assert!(!store.page_exists("en", &format!("Image:{name}")).unwrap());
    }

    #[test]
    fn uploads_use_hashed_directories() {
        let dir = tempdir().unwrap();
        let hash = format!("{:x}", md5::compute(b"Notes.pdf"));
        let rel = format!("files/en/{}/{}/Notes.pdf", &hash[..1], &hash[..2]);
        write(&dir.path().join(&rel), "%PDF");

        let store = FsStore::open(dir.path()).unwrap();
        let file = store.lookup_file("en", "Image:Notes.pdf").unwrap().unwrap();
        assert_eq!(file.url, format!("/{}", rel));
        assert_eq!(file.mime_type, "application/pdf");

        let page = store.lookup_page("en", "Image:Notes.pdf", false).unwrap().unwrap();
        assert_eq!(page.kind, PageKind::File);
        assert!(store.page_exists("en", "Image:Notes.pdf").unwrap());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            FsStore::open(dir.path().join("nope")),
            Err(StoreError::MissingRoot(_))
        ));
    }
}
