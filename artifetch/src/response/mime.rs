//! MIME type to filename extension lookup.

/// Known media types and the extension a file of that type gets.
///
/// When a type maps to several extensions the conventional one comes first.
const EXTENSIONS: &[(&str, &str)] = &[
    ("application/zip", ".zip"),
    ("application/x-zip-compressed", ".zip"),
    ("application/x-wheel+zip", ".whl"),
    ("application/gzip", ".gz"),
    ("application/x-gzip", ".gz"),
    ("application/x-tar", ".tar"),
    ("application/x-gtar", ".tar"),
    ("application/x-bzip2", ".bz2"),
    ("application/x-xz", ".xz"),
    ("application/zstd", ".zst"),
    ("application/java-archive", ".jar"),
    ("application/x-7z-compressed", ".7z"),
    ("application/octet-stream", ".bin"),
    ("application/json", ".json"),
    ("application/pdf", ".pdf"),
    ("application/xml", ".xml"),
    ("application/x-msdownload", ".exe"),
    ("application/x-python-code", ".pyc"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
    ("text/csv", ".csv"),
    ("text/xml", ".xml"),
    ("text/x-python", ".py"),
];

/// Guess a filename extension (with leading dot) for a `Content-Type` value.
///
/// Parameters such as `; charset=utf-8` are ignored and matching is case
/// insensitive.
pub fn guess_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() {
        return None;
    }

    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}
