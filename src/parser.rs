use std::io::BufRead;

use crate::error::Error;
use crate::escape::decode;
use crate::expand::{Expander, ProcessEnv, VarSource};
use crate::model::{EnvMapping, ParseOptions, SubstitutionMode};
use crate::strip::strip_comment_and_quotes;

/// Parse env-file text with default options, expanding against the process
/// environment.
pub fn parse_str(input: &str) -> EnvMapping {
    parse_env(input, &ParseOptions::default(), &ProcessEnv)
}

/// Parse env-file bytes. Input that is not valid UTF-8 yields an empty
/// mapping.
pub fn parse_bytes<S: VarSource + ?Sized>(
    input: &[u8],
    options: &ParseOptions,
    env: &S,
) -> EnvMapping {
    match std::str::from_utf8(input) {
        Ok(text) => parse_env(text, options, env),
        Err(err) => {
            tracing::debug!(error = %err, "envkit: ignoring input that is not valid UTF-8");
            EnvMapping::new()
        }
    }
}

/// Parse env-file text from a buffered reader.
pub fn parse_reader<R: BufRead, S: VarSource + ?Sized>(
    mut reader: R,
    options: &ParseOptions,
    env: &S,
) -> Result<EnvMapping, Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(parse_bytes(&buf, options, env))
}

/// Parse env-file text into an ordered mapping.
///
/// Each non-blank, non-comment line is expanded as a whole (with the mapping
/// built so far as fallback), split at the first `=`, stripped of a trailing
/// comment and surrounding quotes, then unescaped. A line without any `=` is
/// appended to the previous key's value on a new line. Later duplicates
/// overwrite earlier ones.
pub fn parse_env<S: VarSource + ?Sized>(
    input: &str,
    options: &ParseOptions,
    env: &S,
) -> EnvMapping {
    let mut mapping = EnvMapping::new();
    let mut current: Option<String> = None;

    for raw_line in lines(input) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let line = match options.substitution_mode {
            SubstitutionMode::Expand => Expander::new(env, &options.missing)
                .fallback(Some(&mapping))
                .expand(trimmed),
            SubstitutionMode::Disabled => trimmed.to_owned(),
        };

        match line.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                let value = decode(strip_comment_and_quotes(value.trim()));
                mapping.insert(key.to_owned(), value);
                current = Some(key.to_owned());
            }
            None => {
                let value = decode(strip_comment_and_quotes(&line));
                let Some(existing) = current.as_ref().and_then(|key| mapping.get_mut(key)) else {
                    continue;
                };
                if !existing.is_empty() {
                    existing.push('\n');
                }
                existing.push_str(&value);
            }
        }
    }

    mapping
}

/// Split on `\r\n`, `\r` or `\n`.
fn lines(input: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(input);
    std::iter::from_fn(move || {
        let text = rest?;
        match text.find(['\r', '\n']) {
            Some(idx) => {
                let skip = if text[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&text[idx + skip..]);
                Some(&text[..idx])
            }
            None => {
                rest = None;
                Some(text)
            }
        }
    })
}
