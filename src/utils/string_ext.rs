//! String cleaning helpers used when normalising request input

use serde_json::Value;

/// Trim-and-filter helpers
pub trait StringExt {
    /// Trimmed copy, `None` when nothing is left
    fn clean(&self) -> Option<String>;

    /// Trimmed copy
    fn trimmed(&self) -> String;
}

impl StringExt for str {
    #[inline]
    fn clean(&self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.trim().to_string()
    }
}

impl StringExt for String {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_str().clean()
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.as_str().trimmed()
    }
}

impl<T: AsRef<str>> StringExt for Option<T> {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_ref().and_then(|s| s.as_ref().clean())
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.as_ref()
            .map(|s| s.as_ref().trim().to_string())
            .unwrap_or_default()
    }
}

/// Normalise a JSON object before deserialisation: string values are trimmed
/// and keys whose value is null, empty or the literal `"null"` are removed.
/// Non-object values are returned unchanged.
pub fn clean_object(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(key, value)| match value {
                    Value::Null => None,
                    Value::String(s) => match s.clean() {
                        Some(s) if s != "null" => Some((key, Value::String(s))),
                        _ => None,
                    },
                    other => Some((key, other)),
                })
                .collect(),
        ),
        other => other,
    }
}
