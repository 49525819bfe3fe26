//! URL to filesystem path mapping for the blob store.
//!
//! The mapping is pure and deterministic: the same URL always lands on the
//! same relative path, so a blob written once is found again.
//!
//! ```text
//! http://www.disi.unige.it/person/CazzolaW/RAM-SE04%20Proceedings/Gibbs%20and%20Coady.pdf
//!   -> www-disi-unige-it/person-CazzolaW-RAM-SE04_Proceedings/Gibbs and Coady.pdf
//! ```

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};

const ILLEGAL: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\''];

/// Map a URL to a sanitized path relative to the blob root.
///
/// Empty components are skipped, so a URL without directories yields a file
/// directly under the authority directory. A URL whose path ends in `/`
/// gets a filename derived from the SHA-256 of the URL.
pub fn slug(url: &str) -> PathBuf {
    let decoded = percent_decode_str(url).decode_utf8_lossy();
    let (authority, path) = split_url(&decoded);

    let (dir, filename) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };

    let filename = match sanitize(filename) {
        name if name.is_empty() || name == "." || name == ".." => digest_name(url),
        name => name,
    };

    [authority_to_directory(authority), path_to_directory(dir), filename]
        .into_iter()
        .filter(|component| !component.is_empty())
        .collect()
}

/// Split a decoded URL into its authority and path, dropping scheme, query
/// and fragment. Input without a scheme is treated as a bare path.
fn split_url(url: &str) -> (&str, &str) {
    let Some((_, rest)) = url.split_once("://") else {
        return ("", strip_query(url));
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    (&rest[..end], strip_query(&rest[end..]))
}

fn strip_query(path: &str) -> &str {
    path.find(['?', '#']).map_or(path, |idx| &path[..idx])
}

fn authority_to_directory(authority: &str) -> String {
    guard_dots(sanitize(&authority.replace('.', "-")))
}

fn path_to_directory(path: &str) -> String {
    let path = path.trim_matches('/').replace('/', "-").replace(' ', "_");
    guard_dots(sanitize(&path))
}

fn sanitize(component: &str) -> String {
    component.replace(',', "_").chars().filter(|c| !ILLEGAL.contains(c)).collect()
}

/// Keep `.` and `..` from escaping the blob root.
fn guard_dots(component: String) -> String {
    match component.as_str() {
        "." | ".." => "_".repeat(component.len()),
        _ => component,
    }
}

fn digest_name(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
