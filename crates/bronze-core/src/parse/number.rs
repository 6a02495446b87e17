//! Numeric and boolean converters.

/// Parses an integer of any width, rejecting values outside `T`'s range.
///
/// With `hex` set the text is read as base 16 after stripping an optional
/// `#` or `0x` prefix; signs are not accepted in that mode.
pub fn parse_integer<T: TryFrom<i128>>(text: &str, hex: bool) -> Option<T> {
    let value = if hex {
        let digits = text
            .strip_prefix('#')
            .or_else(|| text.strip_prefix("0x"))
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        i128::from_str_radix(digits, 16).ok()?
    } else {
        text.parse::<i128>().ok()?
    };
    T::try_from(value).ok()
}

pub fn parse_i32(text: &str, hex: bool) -> Option<i32> {
    parse_integer(text, hex)
}

pub fn parse_i64(text: &str, hex: bool) -> Option<i64> {
    parse_integer(text, hex)
}

pub fn parse_u64(text: &str, hex: bool) -> Option<u64> {
    parse_integer(text, hex)
}

/// Accepts an optional leading `-` followed by digits and at most one `.`.
/// Exponents, `inf` and `NaN` are rejected.
pub fn parse_f64(text: &str) -> Option<f64> {
    let body = text.strip_prefix('-').unwrap_or(text);
    let mut dots = 0;
    let mut digits = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    text.parse().ok()
}

pub fn parse_f32(text: &str) -> Option<f32> {
    parse_f64(text).map(|v| v as f32)
}

/// Literal `true` / `false`, case-sensitive.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
