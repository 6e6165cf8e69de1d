/// Decode backslash escape sequences into the characters they stand for.
///
/// Recognized forms, tried in this order at every backslash:
///
/// - `\u{H+}` variable-length hex code point
/// - `\uHHHH` exactly four hex digits
/// - `\xHH` exactly two hex digits
/// - octal, either `[1-7][0-7]{0,2}` or `0[0-7]{1,2}`
/// - single-character specials `b f n r t v 0 ' " \ $`
///
/// Anything else, including code points that are not valid `char`s, is left untouched.
pub fn decode(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_owned();
    }

    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0usize;
    let mut idx = 0usize;

    while idx < bytes.len() {
        if bytes[idx] != b'\\' {
            idx += 1;
            continue;
        }

        let Some((ch, consumed)) = decode_escape(&bytes[idx + 1..]) else {
            idx += 1;
            continue;
        };

        out.push_str(&raw[cursor..idx]);
        out.push(ch);
        idx += 1 + consumed;
        cursor = idx;
    }

    out.push_str(&raw[cursor..]);
    out
}

/// Match one escape body (the bytes after a backslash) and return the decoded
/// character together with the number of body bytes it used.
fn decode_escape(body: &[u8]) -> Option<(char, usize)> {
    let first = *body.first()?;

    if first == b'u' {
        if let Some(found) = braced_code_point(body) {
            return Some(found);
        }
        if let Some(found) = fixed_hex(&body[1..], 4) {
            return Some(found);
        }
    }

    if first == b'x'
        && let Some(found) = fixed_hex(&body[1..], 2)
    {
        return Some(found);
    }

    if let Some(found) = octal(body) {
        return Some(found);
    }

    special(first).map(|ch| (ch, 1))
}

fn braced_code_point(body: &[u8]) -> Option<(char, usize)> {
    if body.get(1) != Some(&b'{') {
        return None;
    }

    let digits = body[2..]
        .iter()
        .take_while(|byte| byte.is_ascii_hexdigit())
        .count();
    if digits == 0 || body.get(2 + digits) != Some(&b'}') {
        return None;
    }

    let code = parse_radix(&body[2..2 + digits], 16)?;
    char::from_u32(code).map(|ch| (ch, digits + 3))
}

fn fixed_hex(digits: &[u8], len: usize) -> Option<(char, usize)> {
    if digits.len() < len || !digits[..len].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }

    let code = parse_radix(&digits[..len], 16)?;
    char::from_u32(code).map(|ch| (ch, len + 1))
}

fn octal(body: &[u8]) -> Option<(char, usize)> {
    let run = body
        .iter()
        .take(3)
        .take_while(|byte| is_octal_digit(**byte))
        .count();

    let len = match body[0] {
        b'1'..=b'7' => run,
        // `\0` on its own is the NUL special, `\00` and `\000` are octal.
        b'0' if run >= 2 => run,
        _ => return None,
    };

    let code = parse_radix(&body[..len], 8)?;
    char::from_u32(code).map(|ch| (ch, len))
}

fn special(byte: u8) -> Option<char> {
    let ch = match byte {
        b'b' => '\u{8}',
        b'f' => '\u{c}',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'v' => '\u{b}',
        b'0' => '\0',
        b'\'' => '\'',
        b'"' => '"',
        b'\\' => '\\',
        b'$' => '$',
        _ => return None,
    };
    Some(ch)
}

fn is_octal_digit(byte: u8) -> bool {
    (b'0'..=b'7').contains(&byte)
}

fn parse_radix(digits: &[u8], radix: u32) -> Option<u32> {
    let text = std::str::from_utf8(digits).ok()?;
    u32::from_str_radix(text, radix).ok()
}
