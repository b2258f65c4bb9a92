//! Response introspection: size and filename of a downloaded artifact.
//!
//! Filename resolution is a staged fallback chain. Each rule looks at the
//! name produced so far and either replaces it or leaves it alone:
//!
//! ```text
//! reference filename
//!     └─► Content-Disposition filename (sanitized)
//!             └─► + extension from Content-Type      (only if none yet)
//!                     └─► + extension from final URL (only if none yet and redirected)
//! ```

mod disposition;
mod mime;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use url::Url;

use crate::http::ResponseMetadata;
use crate::link::ArtifactReference;
use crate::util::{has_extension, split_extension};

pub use disposition::{parse_content_disposition, sanitize_content_filename};
pub use mime::guess_extension;

/// A filename override rule. Returns `Some` to replace the current name.
type FilenameRule = fn(&str, &ResponseMetadata, &ArtifactReference) -> Option<String>;

/// Rules applied in order on top of the reference's own filename.
const FILENAME_RULES: &[FilenameRule] = &[
    filename_from_disposition,
    extension_from_content_type,
    extension_from_redirect,
];

/// Total size announced by `Content-Length`.
///
/// Missing or malformed headers mean "unknown" rather than an error.
pub fn response_size(meta: &ResponseMetadata) -> Option<u64> {
    meta.headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Pick the local filename for a response.
///
/// The result is never empty and never contains a path separator.
pub fn response_filename(meta: &ResponseMetadata, reference: &ArtifactReference) -> String {
    FILENAME_RULES
        .iter()
        .fold(reference.filename().to_string(), |name, rule| {
            rule(&name, meta, reference).unwrap_or(name)
        })
}

fn filename_from_disposition(
    current: &str,
    meta: &ResponseMetadata,
    _reference: &ArtifactReference,
) -> Option<String> {
    let header = meta.headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    Some(parse_content_disposition(header, current))
}

fn extension_from_content_type(
    current: &str,
    meta: &ResponseMetadata,
    _reference: &ArtifactReference,
) -> Option<String> {
    if has_extension(current) {
        return None;
    }
    guess_extension(meta.content_type()).map(|ext| format!("{}{}", current, ext))
}

fn extension_from_redirect(
    current: &str,
    meta: &ResponseMetadata,
    reference: &ArtifactReference,
) -> Option<String> {
    if has_extension(current) || meta.url == reference.url_without_fragment() {
        return None;
    }

    let final_url = Url::parse(&meta.url).ok()?;
    let segment = final_url.path_segments()?.next_back()?;
    match split_extension(segment).1 {
        "" => None,
        ext => Some(format!("{}{}", current, ext)),
    }
}
