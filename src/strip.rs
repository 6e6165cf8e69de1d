/// Remove a trailing `#` comment from a raw value and trim it.
///
/// Only the last `#` is considered. When the value opens with a quote and the
/// same quote character appears again after that `#`, the `#` sits inside the
/// quoted region and nothing is removed.
pub fn strip_comment(raw: &str) -> &str {
    let Some(hash_idx) = raw.rfind('#') else {
        return raw.trim();
    };

    let kept = match raw.as_bytes().first().copied() {
        Some(quote @ (b'"' | b'\'')) => {
            let closes_after_hash = raw
                .rfind(quote as char)
                .is_some_and(|quote_idx| quote_idx > hash_idx);
            if closes_after_hash {
                raw
            } else {
                &raw[..hash_idx]
            }
        }
        _ => &raw[..hash_idx],
    };

    kept.trim()
}

/// Remove at most one leading and one trailing `"` or `'`.
///
/// Quotes are not required to match.
pub fn strip_quotes(raw: &str) -> &str {
    let value = raw.strip_prefix(['"', '\'']).unwrap_or(raw);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

/// [`strip_comment`] followed by [`strip_quotes`].
pub fn strip_comment_and_quotes(raw: &str) -> &str {
    strip_quotes(strip_comment(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_comment_from_unquoted_value() {
        assert_eq!(strip_comment("a #b"), "a");
        assert_eq!(strip_comment("value with trailing #comment   "), "value with trailing");
        assert_eq!(strip_comment("test#test"), "test");
    }

    #[test]
    fn keeps_hash_inside_quotes() {
        assert_eq!(strip_comment("\"a#b\""), "\"a#b\"");
        assert_eq!(strip_comment("'test #comment'  "), "'test #comment'");
    }

    #[test]
    fn strips_comment_after_closed_quote() {
        assert_eq!(strip_comment("\"test \" #comment"), "\"test \"");
        assert_eq!(strip_comment("'open #comment"), "'open");
    }

    #[test]
    fn last_hash_wins_for_unquoted_values() {
        assert_eq!(strip_comment("a \"#b\" #c"), "a \"#b\"");
        assert_eq!(strip_comment("a 'b' #c"), "a 'b'");
    }

    #[test]
    fn no_hash_only_trims() {
        assert_eq!(strip_comment("  spaced  "), "spaced");
    }

    #[test]
    fn strips_one_quote_per_side() {
        assert_eq!(strip_quotes("\"quoted\""), "quoted");
        assert_eq!(strip_quotes("'single'"), "single");
        assert_eq!(strip_quotes("\"\"nested\"\""), "\"nested\"");
        assert_eq!(strip_quotes("\"mismatched'"), "mismatched");
        assert_eq!(strip_quotes("\"open"), "open");
        assert_eq!(strip_quotes("\""), "");
        assert_eq!(strip_quotes("bare"), "bare");
    }

    #[test]
    fn combined_stripping() {
        assert_eq!(strip_comment_and_quotes("\"test #comment\""), "test #comment");
        assert_eq!(strip_comment_and_quotes("\" test \""), " test ");
        assert_eq!(strip_comment_and_quotes("\"test \" # note"), "test ");
    }
}
