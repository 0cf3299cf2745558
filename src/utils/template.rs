use crate::errors::{AccessError, AccessResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the RFC 3986 unreserved set.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Substitutes `{name}` placeholders in a path template. Values are encoded as
/// single path segments, so an id can never change which resource is addressed.
pub fn resolve_path(template: &str, params: &[(String, String)]) -> AccessResult<String> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let (prefix, tail) = rest.split_at(start);
        out.push_str(prefix);
        let end = tail.find('}').ok_or_else(|| {
            AccessError::invalid_request(format!("Unclosed placeholder in path '{}'", template))
        })?;
        let name = tail[1..end].trim();
        let value = params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .ok_or_else(|| {
                AccessError::invalid_request(format!(
                    "Missing path parameter '{}' for '{}'",
                    name, template
                ))
            })?;
        if value.is_empty() {
            return Err(AccessError::invalid_request(format!(
                "Path parameter '{}' must not be empty",
                name
            )));
        }
        out.push_str(&encode_path_segment(value));
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    Ok(out)
}

/// Percent-encodes `value` as one path segment.
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}
