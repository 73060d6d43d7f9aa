//! Purpose: Define the document-store seam and the local directory store.
//! Exports: `DocumentStore`, `DirStore`.
//! Role: Stable boundary between the screen pipeline and document transports.
//! Invariants: Stores return whole raw documents; they never partially decode.
//! Invariants: Screen keys are validated before touching the filesystem.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::decode::RawDocument;
use crate::core::error::{Error, ErrorKind};
use crate::screen_paths::{ScreenKeyError, default_screens_dir, resolve_screen_path};

pub type ApiResult<T> = Result<T, Error>;

/// Asynchronous source of raw screen documents, fetched by key.
pub trait DocumentStore: Send + Sync + 'static {
    fn fetch_document(&self, key: &str) -> impl Future<Output = ApiResult<RawDocument>> + Send;

    fn list_keys(&self) -> impl Future<Output = ApiResult<Vec<String>>> + Send;
}

/// Store backed by a directory of `<key>.json` files. Serves as the dev and
/// test collaborator and as the backing store of `screenbrew serve`.
#[derive(Clone, Debug)]
pub struct DirStore {
    screens_dir: PathBuf,
}

impl DirStore {
    pub fn new() -> Self {
        Self {
            screens_dir: default_screens_dir(),
        }
    }

    pub fn with_screens_dir(mut self, screens_dir: impl Into<PathBuf>) -> Self {
        self.screens_dir = screens_dir.into();
        self
    }

    pub fn screens_dir(&self) -> &Path {
        &self.screens_dir
    }

    /// Synchronous read used by the trait impl and by the serve handlers.
    pub fn read_document(&self, key: &str) -> ApiResult<RawDocument> {
        let path = self.resolve(key)?;
        let text = std::fs::read_to_string(&path).map_err(|err| {
            Error::new(io_kind(&err))
                .with_message("failed to read screen document")
                .with_key(key)
                .with_path(&path)
                .with_source(err)
        })?;
        document_from_str(&text).map_err(|err| err.with_key(key).with_path(&path))
    }

    pub fn write_document(&self, key: &str, document: &RawDocument) -> ApiResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(io_kind(&err))
                    .with_message("failed to create screens directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(document.clone())).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode screen document")
                .with_key(key)
                .with_source(err)
        })?;
        std::fs::write(&path, text).map_err(|err| {
            Error::new(io_kind(&err))
                .with_message("failed to write screen document")
                .with_key(key)
                .with_path(&path)
                .with_source(err)
        })
    }

    pub fn remove_document(&self, key: &str) -> ApiResult<()> {
        let path = self.resolve(key)?;
        std::fs::remove_file(&path).map_err(|err| {
            Error::new(io_kind(&err))
                .with_message("failed to delete screen document")
                .with_key(key)
                .with_path(&path)
                .with_source(err)
        })
    }

    pub fn screen_keys(&self) -> ApiResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.screens_dir).map_err(|err| {
            Error::new(io_kind(&err))
                .with_message("failed to read screens directory")
                .with_path(&self.screens_dir)
                .with_source(err)
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read screens directory entry")
                        .with_path(&self.screens_dir)
                        .with_source(err)
                })?
                .path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn resolve(&self, key: &str) -> ApiResult<PathBuf> {
        resolve_screen_path(key, &self.screens_dir).map_err(|err| map_screen_key_error(err, key))
    }
}

impl Default for DirStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for DirStore {
    async fn fetch_document(&self, key: &str) -> ApiResult<RawDocument> {
        self.read_document(key)
    }

    async fn list_keys(&self) -> ApiResult<Vec<String>> {
        self.screen_keys()
    }
}

/// Parse a raw document from JSON text; the root must be an object.
pub fn document_from_str(text: &str) -> ApiResult<RawDocument> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("screen document is not valid json")
            .with_source(err)
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::new(ErrorKind::Corrupt)
            .with_message("screen document root must be a json object")),
    }
}

fn io_kind(err: &std::io::Error) -> ErrorKind {
    use std::io::ErrorKind as Io;
    match err.kind() {
        Io::NotFound => ErrorKind::NotFound,
        Io::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn map_screen_key_error(err: ScreenKeyError, key: &str) -> Error {
    match err {
        ScreenKeyError::Empty => {
            Error::new(ErrorKind::Usage).with_message("screen key must not be empty")
        }
        ScreenKeyError::ContainsPathSeparator => Error::new(ErrorKind::Usage)
            .with_message("screen key must not contain path separators")
            .with_key(key),
    }
}
