//! Static asset lookup.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use mezze_cache::ContentEncoding;

use crate::error::SiteError;

/// A static file ready to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// Encoding the body is already stored in.
    pub encoding: ContentEncoding,
}

/// Source of static files.
pub trait AssetStore {
    /// Look up `path`, preferring a variant stored in `encoding`.
    fn load(&self, path: &str, encoding: ContentEncoding) -> Result<Option<StaticAsset>, SiteError>;
}

/// Content type from the file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Files under a root directory, with `.br` / `.gz` siblings written by
/// `mezze compress`.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path to a file below the root. Rejects traversal.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }

    fn read(path: &Path) -> Result<Option<Vec<u8>>, SiteError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(_) if path.is_dir() => Ok(None),
            Err(source) => Err(SiteError::Asset {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

impl AssetStore for FsAssetStore {
    fn load(&self, path: &str, encoding: ContentEncoding) -> Result<Option<StaticAsset>, SiteError> {
        let Some(file) = self.resolve(path) else {
            return Ok(None);
        };
        let content_type = content_type_for(path);

        if let Some(ext) = encoding.file_extension() {
            let mut sibling = file.clone().into_os_string();
            sibling.push(".");
            sibling.push(ext);
            if let Some(body) = Self::read(Path::new(&sibling))? {
                return Ok(Some(StaticAsset {
                    body,
                    content_type,
                    encoding,
                }));
            }
        }

        Ok(Self::read(&file)?.map(|body| StaticAsset {
            body,
            content_type,
            encoding: ContentEncoding::Identity,
        }))
    }
}
