// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed values from command-line strings.

use serde_json::Value;

/// Convert `raw` to the closest JSON value: numbers, booleans, null, lists
/// and objects parse as such, anything else stays a string. Python-style
/// `True` / `False` / `None` and single-quoted strings are accepted.
pub fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }

    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Value::String(inner.to_string());
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(&pythonic_to_json(trimmed)) {
            return value;
        }
    }

    Value::String(raw.to_string())
}

/// Rewrite Python literal spelling into JSON outside of string literals.
fn pythonic_to_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        match word.as_str() {
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            "None" => out.push_str("null"),
            other => out.push_str(other),
        }
        word.clear();
    };

    for c in raw.chars() {
        match quote {
            Some(q) if c == q => {
                out.push('"');
                quote = None;
            }
            Some(_) if c == '"' => out.push_str("\\\""),
            Some(_) => out.push(c),
            None if c == '\'' || c == '"' => {
                flush(&mut word, &mut out);
                out.push('"');
                quote = Some(c);
            }
            None if c.is_alphanumeric() || c == '_' => word.push(c),
            None => {
                flush(&mut word, &mut out);
                out.push(c);
            }
        }
    }
    flush(&mut word, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(parse_value("12.5"), json!(12.5));
        assert_eq!(parse_value("-3"), json!(-3));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("True"), json!(true));
        assert_eq!(parse_value("None"), Value::Null);
        assert_eq!(parse_value("Continuous"), json!("Continuous"));
        assert_eq!(parse_value("/data/run1"), json!("/data/run1"));
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(parse_value("'Mono8'"), json!("Mono8"));
        assert_eq!(parse_value("\"12\""), json!("12"));
    }

    #[test]
    fn test_containers() {
        assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
        assert_eq!(
            parse_value("{'write': True, 'file': {'name': 'run'}}"),
            json!({"write": true, "file": {"name": "run"}})
        );
        assert_eq!(parse_value("{broken"), json!("{broken"));
    }
}
