use std::collections::BTreeMap;

use crate::expand::VarSource;

/// Where [`crate::EnvLoader`] stores loaded variables.
///
/// The same target is also the live source for expansion: while files load,
/// `$NAME` first resolves against whatever the target already holds, so
/// values written by earlier files, arguments or Vault are visible to later
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetEnvKind {
    /// Variables live in the process environment and are visible to child
    /// processes and to any other reader of `std::env`.
    Process,
    /// Variables live only in this map, e.g. for handing to `Command::envs`.
    Memory(BTreeMap<String, String>),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Target that loads straight into the process environment.
    ///
    /// # Safety
    ///
    /// Loading calls `std::env::set_var`. No other thread may touch the
    /// process environment while a loader owns this target.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Target with no variables, so nothing counts as already set.
    pub fn memory() -> Self {
        Self::from_memory(BTreeMap::new())
    }

    /// Target pre-populated with `map`; its keys are kept unless the loader
    /// overrides existing values.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: TargetEnvKind::Memory(map),
        }
    }

    /// Copy of the current process environment. This is what
    /// [`crate::EnvLoader::new`] uses, so inherited variables still win over
    /// file values without the process environment being written.
    /// Non-UTF-8 entries are converted lossily.
    pub fn snapshot() -> Self {
        let map = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self::from_memory(map)
    }

    pub fn is_process(&self) -> bool {
        matches!(self.kind, TargetEnvKind::Process)
    }

    pub fn as_memory(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn as_memory_mut(&mut self) -> Option<&mut BTreeMap<String, String>> {
        match &mut self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match &self.kind {
            TargetEnvKind::Process => std::env::var_os(key).is_some(),
            TargetEnvKind::Memory(map) => map.contains_key(key),
        }
    }

    /// Stored value, including the literal `undefined`; callers decide how to
    /// treat that sentinel.
    pub fn get_var(&self, key: &str) -> Option<String> {
        match &self.kind {
            TargetEnvKind::Process => {
                std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
            }
            TargetEnvKind::Memory(map) => map.get(key).cloned(),
        }
    }

    pub(crate) fn set_var(&mut self, key: &str, value: &str) {
        match &mut self.kind {
            // SAFETY: exclusive access was promised to `TargetEnv::process`.
            TargetEnvKind::Process => unsafe { std::env::set_var(key, value) },
            TargetEnvKind::Memory(map) => {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
    }
}

impl VarSource for TargetEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.get_var(name)
    }
}
