//! Numeric fields of SCP messages.
//!
//! Messages were historically produced and consumed by JavaScript wallets, so every number
//! follows the ECMAScript `Number(string)` conversion and integer fields must be "safe"
//! integers.

/// Largest integer a double represents exactly, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// ECMAScript `WhiteSpace` and `LineTerminator` code points.
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{b}'
            | '\u{c}'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Converts `input` like ECMAScript `Number(input)`, `None` standing for `NaN`.
pub fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim_matches(is_js_whitespace);

    if trimmed.is_empty() {
        return Some(0.0);
    }

    let prefixed = |prefix_lower: &str, prefix_upper: &str| {
        trimmed
            .strip_prefix(prefix_lower)
            .or_else(|| trimmed.strip_prefix(prefix_upper))
    };
    for (lower, upper, radix) in [("0x", "0X", 16), ("0o", "0O", 8), ("0b", "0B", 2)] {
        if let Some(digits) = prefixed(lower, upper) {
            return parse_radix(digits, radix);
        }
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };

    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    if !is_decimal_literal(unsigned) {
        return None;
    }

    unsigned.parse::<f64>().ok().map(|value| sign * value)
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0f64, |acc, c| {
        c.to_digit(radix).map(|digit| acc * f64::from(radix) + f64::from(digit))
    })
}

/// `digits [. digits] [e|E [+|-] digits]` with at least one mantissa digit.
fn is_decimal_literal(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(position) => (&s[..position], Some(&s[position + 1..])),
        None => (s, None),
    };

    let mut parts = mantissa.splitn(2, '.');
    let integral = parts.next().unwrap_or_default();
    let fractional = parts.next().unwrap_or_default();
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    if integral.is_empty() && fractional.is_empty() {
        return false;
    }
    if !all_digits(integral) || !all_digits(fractional) {
        return false;
    }

    match exponent {
        None => true,
        Some(exponent) => {
            let digits = exponent
                .strip_prefix(['+', '-'])
                .unwrap_or(exponent);
            !digits.is_empty() && all_digits(digits)
        }
    }
}

/// `Number.isSafeInteger(Number(input))`, returning the integer.
pub fn safe_integer(input: &str) -> Option<i64> {
    let value = parse_number(input)?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > MAX_SAFE_INTEGER as f64 {
        return None;
    }
    Some(value as i64)
}

/// A safe integer strictly greater than `min`.
pub fn safe_integer_above(input: &str, min: i64) -> Option<u64> {
    safe_integer(input)
        .filter(|value| *value > min)
        .and_then(|value| u64::try_from(value).ok())
}

/// Length of `s` in UTF-16 code units, the unit JavaScript string lengths are counted in.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
