//! Lenient number parsing shared by attribute accessors, predicates and
//! processors.
//!
//! Form values are strings typed by people, so three readings are needed:
//! a *prefix* integer (`"42px"` is 42), a *prefix* float (`"3.5kg"` is 3.5),
//! and a *strict* conversion of the whole trimmed string, used when two
//! values are compared as numbers.

/// Whitespace stripped by string trimming, Unicode spaces and line terminators included.
pub(crate) fn is_trim_space(c: char) -> bool {
    matches!(
        c,
        '\u{09}'..='\u{0D}'
            | '\u{20}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{180E}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

fn split_sign(s: &str) -> (f64, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, s)
    }
}

fn digit_run(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Leading base-10 integer, after optional whitespace and sign.
///
/// Returns `None` when no digit follows. Values beyond `f64` integer
/// precision lose their low digits, as they would in a browser.
#[must_use]
pub fn parse_int_prefix_f64(value: &str) -> Option<f64> {
    let (sign, rest) = split_sign(value.trim_start_matches(is_trim_space));
    let len = digit_run(rest);
    if len == 0 {
        return None;
    }
    let magnitude = rest[..len]
        .bytes()
        .fold(0.0_f64, |acc, b| acc * 10.0 + f64::from(b - b'0'));
    Some(sign * magnitude)
}

/// [`parse_int_prefix_f64`] narrowed to `i64`. Out-of-range values are `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let n = parse_int_prefix_f64(value)?;
    ((i64::MIN as f64)..=(i64::MAX as f64))
        .contains(&n)
        .then_some(n as i64)
}

/// Longest leading decimal literal, after optional whitespace and sign.
///
/// Accepts `Infinity`, a fraction without integer part (`.5`), and an
/// exponent only when at least one exponent digit follows.
#[must_use]
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let (sign, rest) = split_sign(value.trim_start_matches(is_trim_space));
    if rest.starts_with("Infinity") {
        return Some(sign * f64::INFINITY);
    }

    let int_len = digit_run(rest);
    let mut end = int_len;
    let mut frac_len = 0;
    if rest[end..].starts_with('.') {
        frac_len = digit_run(&rest[end + 1..]);
        end += 1 + frac_len;
    }
    if int_len == 0 && frac_len == 0 {
        return None;
    }

    let exp = &rest[end..];
    if exp.starts_with(['e', 'E']) {
        let (_, unsigned) = split_sign(&exp[1..]);
        let exp_digits = digit_run(unsigned);
        if exp_digits > 0 {
            end += (exp.len() - unsigned.len()) + exp_digits;
        }
    }

    rest[..end].parse::<f64>().ok().map(|n| sign * n)
}

/// Strict conversion of the whole string, the way a browser coerces a
/// string to a number: surrounding whitespace is ignored, the empty string
/// is zero, `0x`/`0o`/`0b` prefixes select a radix, anything else that is
/// not a complete decimal literal is NaN.
#[must_use]
pub fn to_number(value: &str) -> f64 {
    let s = value.trim_matches(is_trim_space);
    if s.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return f64::NAN;
            }
            return digits.chars().fold(0.0_f64, |acc, c| {
                acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
            });
        }
    }

    let (sign, rest) = split_sign(s);
    if rest == "Infinity" {
        return sign * f64::INFINITY;
    }
    let literal = !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        && rest.bytes().any(|b| b.is_ascii_digit());
    if !literal {
        return f64::NAN;
    }
    rest.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

/// Render a number the way a browser writes it back into a text field.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}
