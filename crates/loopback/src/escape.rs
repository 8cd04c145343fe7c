//! HTML escaping of string results, as the host transport does when a call's
//! `escape` option is on. Object keys are left alone.

use serde_json::Value;

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escapes every string inside `value`.
pub(crate) fn escape_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(escape_html(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, escape_value(item)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn escapes_nested_strings_but_not_keys() {
        let value = json!({"<k>": ["<b>", 1, {"n": "a&b"}], "flag": true});
        assert_eq!(
            escape_value(value),
            json!({"<k>": ["&lt;b&gt;", 1, {"n": "a&amp;b"}], "flag": true})
        );
    }
}
