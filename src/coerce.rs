use std::fmt::{Display, Formatter};

/// Largest integer an `f64` represents exactly, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A stored string read back as a richer value.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Null,
    /// The key is absent, or its stored value is the literal `undefined`.
    Undefined,
    Number(f64),
    String(String),
}

impl NativeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl Display for NativeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
            Self::Number(value) if value.is_nan() => write!(f, "NaN"),
            Self::Number(value) if value.is_infinite() => {
                let sign = if value.is_sign_negative() { "-" } else { "" };
                write!(f, "{sign}Infinity")
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
        }
    }
}

/// Map a stored value to its native type.
///
/// Literal tokens (`true`, `false`, `null`, `undefined`, `NaN`, `Infinity`,
/// `-Infinity`) become their typed constants. Numeric strings inside the safe
/// integer range become numbers; numeric strings outside it stay strings so
/// large identifiers keep every digit.
pub fn coerce(raw: Option<&str>) -> NativeValue {
    let Some(raw) = raw else {
        return NativeValue::Undefined;
    };

    match raw {
        "true" => return NativeValue::Bool(true),
        "false" => return NativeValue::Bool(false),
        "null" => return NativeValue::Null,
        "undefined" => return NativeValue::Undefined,
        "NaN" => return NativeValue::Number(f64::NAN),
        "Infinity" => return NativeValue::Number(f64::INFINITY),
        "-Infinity" => return NativeValue::Number(f64::NEG_INFINITY),
        _ => {}
    }

    if is_numeric(raw)
        && let Ok(number) = raw.trim().parse::<f64>()
        && (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&number)
    {
        return NativeValue::Number(number);
    }

    NativeValue::String(raw.to_owned())
}

/// Whether `raw` is a plain decimal number: optional surrounding whitespace,
/// optional sign, digits with an optional fraction (or a bare fraction), and
/// an optional exponent.
pub fn is_numeric(raw: &str) -> bool {
    let bytes = raw.trim().as_bytes();
    let mut idx = 0usize;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        idx += 1;
    }

    let int_digits = count_digits(&bytes[idx..]);
    idx += int_digits;

    let mut frac_digits = 0usize;
    if bytes.get(idx) == Some(&b'.') {
        idx += 1;
        frac_digits = count_digits(&bytes[idx..]);
        idx += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(bytes.get(idx), Some(b'e' | b'E')) {
        idx += 1;
        if matches!(bytes.get(idx), Some(b'+' | b'-')) {
            idx += 1;
        }
        let exp_digits = count_digits(&bytes[idx..]);
        if exp_digits == 0 {
            return false;
        }
        idx += exp_digits;
    }

    idx == bytes.len()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
