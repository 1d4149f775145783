// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! JavaScript value semantics over JSON values.
//!
//! Route documents are written against JavaScript conventions (truthiness, `String(x)`,
//! `parseFloat`, `parseInt`), and both the interpreter and the client follow them so that
//! existing documents behave the same way.

use serde_json::{Number, Value};

/// `null`, `false`, `0`, and `""` are falsy. Arrays and objects are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringify a value the way `String(x)` does for scalars and arrays. Objects are rendered as
/// compact JSON.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        // serde_json prints `7.0` for integral floats where JavaScript prints `7`
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

/// `parseFloat`: parse the longest numeric prefix after leading whitespace. `None` stands for
/// `NaN`.
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if text[end..].starts_with("Infinity") {
        return Some(if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent_end = end + 1;
        if matches!(bytes.get(exponent_end), Some(b'+' | b'-')) {
            exponent_end += 1;
        }
        let exponent_digits = count_digits(bytes.get(exponent_end..).unwrap_or_default());
        if exponent_digits > 0 {
            end = exponent_end + exponent_digits;
        }
    }

    text[..end].parse::<f64>().ok()
}

/// `parseInt` without a radix: optional sign, `0x` prefix for hexadecimal, then the longest
/// digit prefix. `None` stands for `NaN`.
pub fn parse_int(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, unsigned),
    };

    let digit_count = digits.chars().take_while(|c| c.is_digit(radix)).count();
    if digit_count == 0 {
        return None;
    }
    let digits = &digits[..digit_count];

    let magnitude = match u64::from_str_radix(digits, radix) {
        Ok(n) => n as f64,
        // beyond u64, precision is lost anyway
        Err(_) if radix == 10 => digits.parse::<f64>().ok()?,
        Err(_) => return None,
    };

    Some(if negative { -magnitude } else { magnitude })
}

/// A JSON number for `n`, integral when possible. Non-finite values have no JSON
/// representation and become `null`, as `JSON.stringify` does.
pub fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }

    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
