use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::Error;

/// Ordered key/value mapping produced by the parser.
///
/// The first assignment of a key fixes its position; later assignments
/// overwrite the value in place.
pub type EnvMapping = IndexMap<String, String>;

/// Summary of a load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_existing: usize,
    pub files_read: usize,
    pub files_failed: usize,
}

impl LoadReport {
    pub(crate) fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.skipped_existing += other.skipped_existing;
        self.files_read += other.files_read;
        self.files_failed += other.files_failed;
    }
}

/// Encoding choice for file input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 text input.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
}

/// Variable expansion behavior for parsed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionMode {
    /// Expand `$VAR` and `${VAR}` placeholders.
    #[default]
    Expand,
    /// Keep values as parsed with no expansion.
    Disabled,
}

/// What to emit for a reference that resolves nowhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingVarPolicy {
    /// Substitute the given string.
    Replace(String),
    /// Leave the original `$NAME` or `${NAME}` text in place.
    Keep,
}

impl Default for MissingVarPolicy {
    fn default() -> Self {
        Self::Replace(String::new())
    }
}

/// Options for [`crate::parse_env`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub substitution_mode: SubstitutionMode,
    pub missing: MissingVarPolicy,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn substitution_mode(mut self, substitution_mode: SubstitutionMode) -> Self {
        self.substitution_mode = substitution_mode;
        self
    }

    pub fn missing(mut self, missing: MissingVarPolicy) -> Self {
        self.missing = missing;
        self
    }
}

/// How collaborators report recoverable failures such as a missing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the error to the caller.
    Throw,
    /// Log the error at `warn` level and continue.
    Warn,
    /// Continue; the error is only visible at `debug` level.
    #[default]
    Silent,
}

/// Contents of one configured file, resolved once by the file resolver.
#[derive(Debug)]
pub enum FileContent {
    /// Raw `.env` text, still to be parsed.
    Text(String),
    /// Key/value data from a structured file such as JSON.
    Structured(EnvMapping),
    /// The file could not be located or read.
    LoadError(Error),
}

/// One entry of the resolver's output, in configuration order.
#[derive(Debug)]
pub struct ResolvedFile {
    /// The path as configured.
    pub original: PathBuf,
    /// The path that was actually read, when one was found.
    pub path: Option<PathBuf>,
    pub content: FileContent,
}
