//! `Content-Disposition` parsing.

/// Keep only the base name of a server-supplied filename.
///
/// Everything up to the last `/` or `\` is dropped, and `.`/`..` become
/// empty, so the result can always be joined onto a destination directory
/// without leaving it.
pub fn sanitize_content_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match base {
        "." | ".." => String::new(),
        other => other.to_string(),
    }
}

/// Parse the `filename` parameter of a `Content-Disposition` header.
///
/// Returns `default_filename` when the parameter is missing or sanitizes to
/// an empty name.
pub fn parse_content_disposition(content_disposition: &str, default_filename: &str) -> String {
    let filename = header_params(content_disposition)
        .into_iter()
        .find(|(key, _)| key == "filename")
        .map(|(_, value)| sanitize_content_filename(&value))
        .unwrap_or_default();

    if filename.is_empty() {
        default_filename.to_string()
    } else {
        filename
    }
}

/// Split a `type; key=value; key="quoted"` header into lowercase keys and
/// unquoted values. The leading type token is skipped.
fn header_params(header: &str) -> Vec<(String, String)> {
    split_unquoted(header, ';')
        .into_iter()
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(value.trim())))
        })
        .collect()
}

/// Split on `sep` outside of double-quoted strings.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            other => out.push(other),
        }
    }
    out
}
