//! Shape sniffing over loosely-typed JSON payloads.
//!
//! Third-party mirrors disagree on where they put the "same" field. Each
//! resolver declares fixed, ordered tables of field paths; the helpers here
//! walk a payload and return the first path that yields a usable value.
//!
//! A path is a list of object keys. The segment `"*"` selects the first
//! element of an array.

use serde_json::Value;

/// Ordered list of object keys (`"*"` = first array element).
pub type FieldPath = &'static [&'static str];

/// Where mirrors put a human-readable error, in priority order.
pub const ERROR_MESSAGE: &[FieldPath] = &[
    &["error"],
    &["message"],
    &["comment"],
    &["errors", "*", "message"],
    &["detail"],
];

const NOT_FOUND_PHRASES: [&str; 3] = ["not found", "does not exist", "no such user"];

/// Follow a path. `null` counts as absent.
pub fn lookup<'a>(value: &'a Value, path: FieldPath) -> Option<&'a Value> {
    let found = path.iter().try_fold(value, |current, segment| {
        if *segment == "*" {
            current.as_array()?.first()
        } else {
            current.get(*segment)
        }
    })?;
    (!found.is_null()).then_some(found)
}

/// A root array of exactly one element is treated as that element.
pub fn unwrap_singleton(value: &Value) -> &Value {
    match value.as_array() {
        Some(items) if items.len() == 1 => &items[0],
        _ => value,
    }
}

/// First path of the table that resolves, with the value found.
pub fn first_match<'a>(value: &'a Value, table: &[FieldPath]) -> Option<(FieldPath, &'a Value)> {
    table
        .iter()
        .find_map(|path| lookup(value, path).map(|found| (*path, found)))
}

/// Whether any path of the table resolves.
pub fn has_any(value: &Value, table: &[FieldPath]) -> bool {
    first_match(value, table).is_some()
}

/// Integer reading of a JSON value.
///
/// Accepts numbers (floats are rounded), numeric strings, and strings that
/// start with digits such as `"4★"`.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.round() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
                .or_else(|| leading_integer(text))
        }
        _ => None,
    }
}

/// Digits at the start of a string, if any.
pub fn leading_integer(text: &str) -> Option<i64> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// First integer found along the table.
pub fn probe_integer(value: &Value, table: &[FieldPath]) -> Option<i64> {
    table
        .iter()
        .find_map(|path| lookup(value, path).and_then(integer))
}

/// First non-placeholder text (or number rendered as text) along the table.
pub fn probe_text(value: &Value, table: &[FieldPath]) -> Option<String> {
    table.iter().find_map(|path| match lookup(value, path)? {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty() && text != "N/A").then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// The payload carries an error message saying the user doesn't exist.
pub fn reports_not_found(value: &Value) -> bool {
    ERROR_MESSAGE.iter().any(|path| {
        lookup(value, path)
            .and_then(Value::as_str)
            .is_some_and(is_not_found_message)
    })
}

/// Case-insensitive check for a "user not found" message.
pub fn is_not_found_message(message: &str) -> bool {
    let message = message.to_lowercase();
    NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
}

/// The payload declares itself a failure (`success: false`, an error
/// status, or a non-empty `errors` array).
pub fn reports_failure(value: &Value) -> bool {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return true;
    }
    if let Some(status) = value.get("status").and_then(Value::as_str) {
        if matches!(
            status.to_ascii_lowercase().as_str(),
            "failed" | "error" | "fail"
        ) {
            return true;
        }
    }
    value
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| !errors.is_empty())
}

/// Short description of an unrecognised payload, for logs and outcomes.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(items) => format!("array of {}", items.len()),
        other => format!("{other}"),
    }
}
