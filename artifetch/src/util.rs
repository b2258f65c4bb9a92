//! Small helpers shared by the download path: log formatting and filename
//! extension handling.

use url::Url;

/// Multi-part extensions that are treated as a single extension.
const COMPOUND_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tar.lz", ".tar.zst"];

/// Format a byte count for log messages.
///
/// Uses decimal units: `12.3 MB`, `45 kB`, `1.5 kB`, `999 bytes`.
pub fn format_size(bytes: u64) -> String {
    if bytes > 1000 * 1000 {
        format!("{:.1} MB", bytes as f64 / 1000.0 / 1000.0)
    } else if bytes > 10 * 1000 {
        format!("{} kB", bytes / 1000)
    } else if bytes > 1000 {
        format!("{:.1} kB", bytes as f64 / 1000.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Replace the credentials embedded in a URL so it can be logged.
///
/// `user:pass@host` becomes `user:****@host` and a bare `user@host`
/// (which is usually a token) becomes `****@host`. Strings that do not parse
/// as URLs are returned unchanged.
pub fn redact_auth_from_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    if parsed.username().is_empty() && parsed.password().is_none() {
        return url.to_string();
    }

    let redacted = if parsed.password().is_some() {
        parsed.set_password(Some("****"))
    } else {
        parsed.set_username("****")
    };

    match redacted {
        Ok(()) => parsed.to_string(),
        Err(()) => url.to_string(),
    }
}

/// Split a filename into stem and extension.
///
/// Compound archive extensions such as `.tar.gz` are kept together. A name
/// whose only dot is the leading one (`.bashrc`) has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let lower = name.to_ascii_lowercase();
    for ext in COMPOUND_EXTENSIONS {
        if lower.ends_with(ext) && lower.len() > ext.len() {
            let split = name.len() - ext.len();
            return name.split_at(split);
        }
    }

    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Whether a filename carries an extension.
pub fn has_extension(name: &str) -> bool {
    !split_extension(name).1.is_empty()
}
