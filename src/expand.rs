use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;

use crate::model::{EnvMapping, MissingVarPolicy};

/// A value read back as `undefined` is treated as never having been set.
pub const UNSET_SENTINEL: &str = "undefined";

/// Read access to a live environment.
pub trait VarSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Read-only view of the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

impl<S: BuildHasher> VarSource for HashMap<String, String, S> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VarSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: BuildHasher> VarSource for IndexMap<String, String, S> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: VarSource + ?Sized> VarSource for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Expand `$NAME` and `${NAME}` references in `value`.
///
/// Shorthand for [`Expander::new`] followed by [`Expander::expand`].
pub fn expand<S: VarSource + ?Sized>(
    value: &str,
    env: &S,
    fallback: Option<&EnvMapping>,
    missing: &MissingVarPolicy,
) -> String {
    Expander::new(env, missing).fallback(fallback).expand(value)
}

/// Resolves variable references against a live environment, then a fallback
/// mapping of values parsed earlier.
///
/// Lookup order for a reference `NAME`:
///
/// 1. the live environment, unless it holds [`UNSET_SENTINEL`];
/// 2. the fallback mapping, whose value is expanded recursively;
/// 3. the [`MissingVarPolicy`].
///
/// A name that is reached again while its own fallback value is still being
/// expanded counts as missing, so cyclic mappings terminate.
pub struct Expander<'a, S: ?Sized> {
    env: &'a S,
    fallback: Option<&'a EnvMapping>,
    missing: &'a MissingVarPolicy,
}

impl<'a, S: VarSource + ?Sized> Expander<'a, S> {
    pub fn new(env: &'a S, missing: &'a MissingVarPolicy) -> Self {
        Self {
            env,
            fallback: None,
            missing,
        }
    }

    pub fn fallback(mut self, fallback: Option<&'a EnvMapping>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn expand(&self, value: &str) -> String {
        self.expand_guarded(value, &mut Vec::new())
    }

    fn expand_guarded(&self, value: &str, active: &mut Vec<String>) -> String {
        if !value.contains('$') {
            return value.to_owned();
        }

        let bytes = value.as_bytes();
        let mut out = String::with_capacity(value.len());
        let mut cursor = 0usize;
        let mut idx = 0usize;

        while idx < bytes.len() {
            match bytes[idx] {
                b'\\' if bytes.get(idx + 1) == Some(&b'$') => {
                    let reference = scan_reference(bytes, idx + 1);
                    out.push_str(&value[cursor..idx]);
                    out.push_str(&value[idx + 1..reference.end]);
                    idx = reference.end;
                    cursor = idx;
                }
                b'$' => {
                    let reference = scan_reference(bytes, idx);
                    let name = &value[reference.name_start..reference.name_end];
                    let token = &value[idx..reference.end];
                    out.push_str(&value[cursor..idx]);
                    out.push_str(&self.resolve(name, token, active));
                    idx = reference.end;
                    cursor = idx;
                }
                _ => idx += 1,
            }
        }

        out.push_str(&value[cursor..]);
        out
    }

    fn resolve(&self, name: &str, token: &str, active: &mut Vec<String>) -> String {
        if !name.is_empty()
            && let Some(live) = self.env.var(name)
            && live != UNSET_SENTINEL
        {
            return live;
        }

        let nested = self.fallback.and_then(|fallback| fallback.get(name));
        if let Some(raw) = nested
            && !active.iter().any(|item| item == name)
        {
            active.push(name.to_owned());
            let expanded = self.expand_guarded(raw, active);
            active.pop();
            return expanded;
        }

        match self.missing {
            MissingVarPolicy::Replace(default) => default.clone(),
            MissingVarPolicy::Keep => token.to_owned(),
        }
    }
}

/// Byte offsets of one `$NAME` or `${NAME}` reference.
struct Reference {
    name_start: usize,
    name_end: usize,
    end: usize,
}

/// Scan the reference whose `$` sits at `dollar`. The braced form needs a
/// closing `}` right after the name; otherwise the unbraced form applies and
/// its name may be empty.
fn scan_reference(bytes: &[u8], dollar: usize) -> Reference {
    let after = dollar + 1;

    if bytes.get(after) == Some(&b'{') {
        let name_start = after + 1;
        let name_end = word_end(bytes, name_start);
        if bytes.get(name_end) == Some(&b'}') {
            return Reference {
                name_start,
                name_end,
                end: name_end + 1,
            };
        }
    }

    let name_end = word_end(bytes, after);
    Reference {
        name_start: after,
        name_end,
        end: name_end,
    }
}

fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    end
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
