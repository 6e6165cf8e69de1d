use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Error;
use crate::model::{Encoding, EnvMapping, FileContent, ResolvedFile};

/// Files probed when none are configured, relative to the base directory.
pub const DEFAULT_FILES: [&str; 4] = [".env", "config/.env", "env", "config/env"];

/// Suffixes tried, in order, when a configured path does not exist as given.
const PROBE_SUFFIXES: [&str; 2] = [".env", ".json"];

/// Locates configured files and reads each one into a [`FileContent`].
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    files: Vec<PathBuf>,
    dir: Option<PathBuf>,
    encoding: Encoding,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.files
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Base directory for relative paths. Defaults to the current directory.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Configured files, or [`DEFAULT_FILES`] when none were given.
    pub fn effective_paths(&self) -> Vec<PathBuf> {
        if self.files.is_empty() {
            DEFAULT_FILES.iter().map(PathBuf::from).collect()
        } else {
            self.files.clone()
        }
    }

    /// Resolve every configured file, keeping configuration order.
    pub fn resolve(&self) -> Vec<ResolvedFile> {
        self.effective_paths()
            .into_iter()
            .map(|original| match self.resolve_path_if_exists(&original) {
                Ok(path) => {
                    let content = self.read(&path);
                    ResolvedFile {
                        original,
                        path: Some(path),
                        content,
                    }
                }
                Err(err) => ResolvedFile {
                    original,
                    path: None,
                    content: FileContent::LoadError(err),
                },
            })
            .collect()
    }

    /// Expand a leading `~` and anchor relative paths at the base directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        let expanded = expand_home(path);
        if expanded.is_absolute() {
            return expanded;
        }

        match &self.dir {
            Some(dir) => dir.join(expanded),
            None => expanded,
        }
    }

    /// [`Self::resolve_path`], then probe the result as given and with each
    /// known suffix appended.
    pub fn resolve_path_if_exists(&self, path: &Path) -> Result<PathBuf, Error> {
        let resolved = self.resolve_path(path);
        if resolved.is_file() {
            return Ok(resolved);
        }

        for suffix in PROBE_SUFFIXES {
            let mut candidate = resolved.clone().into_os_string();
            candidate.push(suffix);
            let candidate = PathBuf::from(candidate);
            if candidate.is_file() {
                tracing::trace!(path = %candidate.display(), "envkit: resolved by suffix");
                return Ok(candidate);
            }
        }

        Err(Error::FileNotFound { path: resolved })
    }

    /// Read one located file according to its kind.
    pub fn read(&self, path: &Path) -> FileContent {
        let result = match FileKind::of(path) {
            FileKind::Text => self.read_text(path).map(FileContent::Text),
            FileKind::Json => read_json(path).map(FileContent::Structured),
            FileKind::Unsupported => Err(Error::UnsupportedFileType {
                path: path.to_path_buf(),
            }),
        };

        result.unwrap_or_else(FileContent::LoadError)
    }

    fn read_text(&self, path: &Path) -> Result<String, Error> {
        let bytes = read_bytes(path)?;
        decode(&bytes, self.encoding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Text,
    Json,
    Unsupported,
}

impl FileKind {
    fn of(path: &Path) -> Self {
        let is_dotenv = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(".env"));
        if is_dotenv {
            return Self::Text;
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            None | Some("env") => Self::Text,
            Some("json") => Self::Json,
            Some(_) => Self::Unsupported,
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, Error> {
    match encoding {
        Encoding::Utf8 => Ok(std::str::from_utf8(bytes)?.to_owned()),
        Encoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

fn read_json(path: &Path) -> Result<EnvMapping, Error> {
    let bytes = read_bytes(path)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(object) => Ok(mapping_from_json(object)),
        _ => Err(Error::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Flatten a JSON object into string values: strings verbatim, `null`
/// dropped so the key stays unset, everything else as its compact JSON text.
pub(crate) fn mapping_from_json(object: Map<String, Value>) -> EnvMapping {
    object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((key, text)),
            other => Some((key, other.to_string())),
        })
        .collect()
}

/// Replace a leading `~` component with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
