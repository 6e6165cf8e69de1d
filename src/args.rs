use serde_json::Value;

use crate::model::EnvMapping;
use crate::resolver::mapping_from_json;

/// Values picked out of a command line by [`scan_args`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgOverrides {
    /// Value of `--node-env`.
    pub mode: Option<String>,
    /// Pairs from every `--env` flag, in order.
    pub vars: EnvMapping,
}

/// Pick `--node-env <value>` and `--env <params>` out of a command line.
///
/// Both flags also accept the `--flag=value` form. Anything else is ignored.
pub fn scan_args<I, A>(args: I) -> ArgOverrides
where
    I: IntoIterator<Item = A>,
    A: AsRef<str>,
{
    let mut overrides = ArgOverrides::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg.as_ref();
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_owned())),
            None => (arg, None),
        };

        match flag {
            "--node-env" => {
                if let Some(value) = inline.or_else(|| args.next().map(|a| a.as_ref().to_owned())) {
                    overrides.mode = Some(value);
                }
            }
            "--env" => {
                if let Some(value) = inline.or_else(|| args.next().map(|a| a.as_ref().to_owned())) {
                    overrides.vars.extend(parse_param_string(&value));
                }
            }
            _ => {}
        }
    }

    overrides
}

/// Parse a parameter string: a JSON object, or else comma-separated
/// `key=value` pairs split at the first `=`.
pub fn parse_param_string(raw: &str) -> EnvMapping {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw) {
        return mapping_from_json(object);
    }

    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_owned(), value.trim().to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_params() {
        let parsed = parse_param_string(r#"{"A":"1","B":2}"#);
        assert_eq!(parsed["A"], "1");
        assert_eq!(parsed["B"], "2");
    }

    #[test]
    fn parses_comma_pairs() {
        let parsed = parse_param_string("A=1, B=x=y,FLAG,,");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["A"], "1");
        assert_eq!(parsed["B"], "x=y");
        assert_eq!(parsed["FLAG"], "");
    }

    #[test]
    fn scans_separate_and_inline_values() {
        let overrides = scan_args([
            "serve",
            "--node-env",
            "production",
            "--env=A=1,B=2",
            "--env",
            r#"{"C":"3"}"#,
            "--other",
        ]);

        assert_eq!(overrides.mode.as_deref(), Some("production"));
        assert_eq!(overrides.vars["A"], "1");
        assert_eq!(overrides.vars["B"], "2");
        assert_eq!(overrides.vars["C"], "3");
    }

    #[test]
    fn flag_without_value_is_ignored() {
        let overrides = scan_args(["--node-env"]);
        assert_eq!(overrides, ArgOverrides::default());
    }
}
