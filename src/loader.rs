use std::path::{Path, PathBuf};

use crate::args::scan_args;
use crate::coerce::{NativeValue, coerce};
use crate::env::TargetEnv;
use crate::error::Error;
use crate::expand::{Expander, ProcessEnv, UNSET_SENTINEL};
use crate::model::{
    Encoding, EnvMapping, ErrorPolicy, FileContent, LoadReport, MissingVarPolicy, ParseOptions,
    SubstitutionMode,
};
use crate::parser::parse_env;
use crate::resolver::FileResolver;
use crate::vault::{VaultOptions, fetch_secret};

/// Variable that names the running mode, e.g. `development`.
pub const DEFAULT_MODE_KEY: &str = "NODE_ENV";

/// Helper flags derived from the mode variable by [`EnvLoader::apply_mode_helpers`].
pub const DEFAULT_HELPERS: [&str; 2] = ["DEVELOPMENT", "PRODUCTION"];

/// Load the default files into the process environment.
///
/// # Safety
///
/// The caller must ensure no other threads concurrently read or write the
/// process environment while this runs.
pub unsafe fn dotenv() -> Result<LoadReport, Error> {
    let mut loader = EnvLoader::new().target(unsafe { TargetEnv::process() });
    loader.resolve()
}

/// Load one file into the process environment.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_path(path: impl AsRef<Path>) -> Result<LoadReport, Error> {
    unsafe { from_paths([path]) }
}

/// Load several files, in order, into the process environment.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_paths<I, P>(paths: I) -> Result<LoadReport, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut loader = EnvLoader::new()
        .paths(paths)
        .target(unsafe { TargetEnv::process() });
    loader.resolve()
}

/// Builder-style loader and accessor for an environment.
///
/// Values are written only for keys the target does not hold yet, unless
/// [`Self::override_existing`] is set. Reads go through [`coerce`] when
/// native typing is on.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    paths: Vec<PathBuf>,
    dir: Option<PathBuf>,
    encoding: Encoding,
    override_existing: bool,
    native_type: bool,
    substitution_mode: SubstitutionMode,
    missing: MissingVarPolicy,
    error_policy: ErrorPolicy,
    enable_args: bool,
    default_mode: Option<String>,
    helpers: Vec<String>,
    mode_key: String,
    vault: VaultOptions,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn native_type(mut self, native_type: bool) -> Self {
        self.native_type = native_type;
        self
    }

    pub fn substitution_mode(mut self, substitution_mode: SubstitutionMode) -> Self {
        self.substitution_mode = substitution_mode;
        self
    }

    pub fn missing(mut self, missing: MissingVarPolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Read `--node-env` and `--env` during [`Self::bootstrap`].
    pub fn enable_args(mut self, enable_args: bool) -> Self {
        self.enable_args = enable_args;
        self
    }

    /// Mode written to the mode key during bootstrap when it is still unset.
    pub fn default_mode(mut self, mode: impl Into<String>) -> Self {
        self.default_mode = Some(mode.into());
        self
    }

    /// Flags set during bootstrap: each one is `true` when it equals the
    /// upper-cased mode, `false` otherwise. Pass an empty list to disable.
    pub fn helpers<I, S>(mut self, helpers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.helpers = helpers.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode_key(mut self, mode_key: impl Into<String>) -> Self {
        self.mode_key = mode_key.into();
        self
    }

    /// Vault secret loaded during bootstrap. Unset fields fall back to the
    /// `VAULT_*` variables.
    pub fn vault(mut self, vault: VaultOptions) -> Self {
        self.vault = vault;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Read a value, coerced to its native type when native typing is on.
    pub fn get(&self, key: &str) -> NativeValue {
        let raw = self.target.get_var(key);
        if self.native_type {
            coerce(raw.as_deref())
        } else {
            raw.map_or(NativeValue::Undefined, NativeValue::String)
        }
    }

    /// Read a value exactly as stored.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.target.get_var(key)
    }

    /// Expand `value` and write it under `key` unless the key is already set.
    ///
    /// References resolve against the target first, then `fallback`. Returns
    /// whether the value was written.
    pub fn set(&mut self, key: &str, value: &str, fallback: Option<&EnvMapping>) -> bool {
        let expanded = Expander::new(&self.target, &self.missing)
            .fallback(fallback)
            .expand(value);
        self.write(key, &expanded)
    }

    /// [`Self::set`] every pair, with `mapping` itself as the fallback.
    pub fn set_all(&mut self, mapping: &EnvMapping) -> LoadReport {
        let mut report = LoadReport::default();
        for (key, value) in mapping {
            if self.set(key, value, Some(mapping)) {
                report.loaded += 1;
            } else {
                report.skipped_existing += 1;
            }
        }
        report
    }

    /// Resolve the configured files in order and merge each into the target.
    ///
    /// Text files are parsed against the target as it stands after the
    /// previous file, so later files can reference earlier ones.
    pub fn resolve(&mut self) -> Result<LoadReport, Error> {
        let mut report = LoadReport::default();

        for file in self.resolver().resolve() {
            match file.content {
                FileContent::Text(text) => {
                    let parsed = parse_env(&text, &self.parse_options(), &self.target);
                    tracing::debug!(
                        path = ?file.path,
                        entries = parsed.len(),
                        "envkit: parsed env file"
                    );
                    report.merge(self.write_all(&parsed));
                    report.files_read += 1;
                }
                FileContent::Structured(mapping) => {
                    tracing::debug!(
                        path = ?file.path,
                        entries = mapping.len(),
                        "envkit: read structured config"
                    );
                    report.merge(self.set_all(&mapping));
                    report.files_read += 1;
                }
                FileContent::LoadError(err) => {
                    report.files_failed += 1;
                    self.handle_error(err)?;
                }
            }
        }

        Ok(report)
    }

    /// Fetch a Vault secret and merge it like a structured file.
    ///
    /// Unset fields of `options` fall back to the loader's vault options and
    /// then to the `VAULT_*` variables of the process environment. Failures go
    /// through the error policy.
    pub fn load_from_vault(&mut self, options: VaultOptions) -> Result<LoadReport, Error> {
        let options = options
            .or(&self.vault)
            .or(&VaultOptions::from_env(&ProcessEnv));

        match fetch_secret(&options) {
            Ok(mapping) => {
                tracing::debug!(entries = mapping.len(), "envkit: loaded Vault secret");
                Ok(self.set_all(&mapping))
            }
            Err(err) => {
                self.handle_error(err)?;
                Ok(LoadReport::default())
            }
        }
    }

    /// Apply `--node-env` and `--env` from a command line.
    pub fn apply_args<I, A>(&mut self, args: I) -> LoadReport
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let overrides = scan_args(args);
        let mut report = LoadReport::default();

        if let Some(mode) = overrides.mode {
            let key = self.mode_key.clone();
            if self.set(&key, &mode, None) {
                report.loaded += 1;
            } else {
                report.skipped_existing += 1;
            }
        }

        report.merge(self.set_all(&overrides.vars));
        report
    }

    /// Write the default mode if configured, then the helper flags.
    pub fn apply_mode_helpers(&mut self) {
        let key = self.mode_key.clone();

        if let Some(mode) = self.default_mode.clone() {
            self.write(&key, &mode);
        }

        let mode = self
            .target
            .get_var(&key)
            .unwrap_or_default()
            .to_ascii_uppercase();
        for helper in self.helpers.clone() {
            let flag = mode == helper;
            self.write(&helper, if flag { "true" } else { "false" });
        }
    }

    /// Full start-up sequence: command-line overrides (when enabled), the
    /// Vault secret (when one is configured), files, then the default mode and
    /// helper flags, so the flags see a mode set by any of the sources.
    pub fn bootstrap<I, A>(&mut self, args: I) -> Result<LoadReport, Error>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let mut report = LoadReport::default();

        if self.enable_args {
            report.merge(self.apply_args(args));
        }

        let vault = self.vault.clone().or(&VaultOptions::from_env(&ProcessEnv));
        if vault.secret.is_some() {
            report.merge(self.load_from_vault(vault)?);
        }

        report.merge(self.resolve()?);
        self.apply_mode_helpers();
        Ok(report)
    }

    fn resolver(&self) -> FileResolver {
        let resolver = FileResolver::new()
            .paths(&self.paths)
            .encoding(self.encoding);
        match &self.dir {
            Some(dir) => resolver.dir(dir),
            None => resolver,
        }
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions::new()
            .substitution_mode(self.substitution_mode)
            .missing(self.missing.clone())
    }

    fn write_all(&mut self, mapping: &EnvMapping) -> LoadReport {
        let mut report = LoadReport::default();
        for (key, value) in mapping {
            if self.write(key, value) {
                report.loaded += 1;
            } else {
                report.skipped_existing += 1;
            }
        }
        report
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        let occupied = self
            .target
            .get_var(key)
            .is_some_and(|existing| existing != UNSET_SENTINEL);
        if occupied && !self.override_existing {
            tracing::trace!(key, "envkit: skipping existing key");
            return false;
        }

        self.target.set_var(key, value);
        true
    }

    fn handle_error(&self, err: Error) -> Result<(), Error> {
        match self.error_policy {
            ErrorPolicy::Throw => Err(err),
            ErrorPolicy::Warn => {
                tracing::warn!(error = %err, "envkit: continuing after load failure");
                Ok(())
            }
            ErrorPolicy::Silent => {
                tracing::debug!(error = %err, "envkit: ignoring load failure");
                Ok(())
            }
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            dir: None,
            encoding: Encoding::Utf8,
            override_existing: false,
            native_type: true,
            substitution_mode: SubstitutionMode::Expand,
            missing: MissingVarPolicy::default(),
            error_policy: ErrorPolicy::Silent,
            enable_args: false,
            default_mode: None,
            helpers: Vec::from(DEFAULT_HELPERS.map(String::from)),
            mode_key: DEFAULT_MODE_KEY.to_owned(),
            vault: VaultOptions::default(),
            target: TargetEnv::snapshot(),
        }
    }
}
