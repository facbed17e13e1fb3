//! Percent and query-string decoding.

use percent_encoding::percent_decode_str;

/// Percent-decodes one path component.
///
/// # Errors
///
/// Fails with a description when the decoded bytes are not valid UTF-8.
pub fn decode_component(raw: &str) -> Result<String, String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| format!("Invalid percent-encoding in '{raw}': {e}"))
}

/// All decoded values of `name` in the query string, in arrival order.
///
/// `query` is the raw query string (no leading `?`). Decoding follows form
/// rules: `+` is a space and `%xx` escapes are resolved.
#[must_use]
pub fn query_values(query: &str, name: &str) -> Vec<String> {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .collect()
}
