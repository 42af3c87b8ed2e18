//! Mapping of source paths to output paths and menu labels.
//!
//! Relative paths are `/`-separated and relative to the repository root,
//! e.g. `README.md` or `docs/CHANGES.md`. Pages under `docs/` are
//! *versioned* and land in `<major>.<minor>/`; everything else is a *root*
//! page shared by all versions.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::Version;

pub const DOCS_FOLDER: &str = "docs";
pub const README_MD: &str = "README.md";
pub const CHANGES_MD: &str = "CHANGES.md";
pub const DOCS_README: &str = "docs/README.md";
pub const DOCS_CHANGES: &str = "docs/CHANGES.md";

fn normalize(rel_path: &str) -> String {
    rel_path.replace('\\', "/")
}

/// Whether `rel_path` renders at the site root rather than in a version directory.
pub fn is_root_path(rel_path: &str) -> bool {
    let path = normalize(rel_path);
    !(path == DOCS_FOLDER || path.starts_with("docs/"))
}

/// Prefix that leads from a page's directory back to the site root.
pub fn prepended_path(rel_path: &str) -> &'static str {
    if is_root_path(rel_path) { "" } else { "../" }
}

/// A URI split into the pieces `htmlize_path` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UriParts<'a> {
    /// `scheme:` plus `//authority` when present.
    pub prefix: &'a str,
    pub path: &'a str,
    /// `?query#fragment`, delimiters included.
    pub suffix: &'a str,
}

impl<'a> UriParts<'a> {
    /// Split a URI reference. Fails on characters a URI may not contain.
    pub(crate) fn parse(uri: &'a str) -> std::result::Result<Self, String> {
        validate_uri_chars(uri)?;

        let suffix_start = uri.find(['?', '#']).unwrap_or(uri.len());
        let (before, suffix) = uri.split_at(suffix_start);

        let prefix_len = scheme_len(before).map_or(0, |scheme| {
            let after_scheme = &before[scheme..];
            match after_scheme.strip_prefix("//") {
                Some(authority) => {
                    scheme + 2 + authority.find('/').unwrap_or(authority.len())
                }
                None => scheme,
            }
        });
        let (prefix, path) = before.split_at(prefix_len);
        Ok(Self {
            prefix,
            path,
            suffix,
        })
    }
}

/// Length of `scheme:` at the start of `s`, if any.
fn scheme_len(s: &str) -> Option<usize> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(colon + 1)
}

fn validate_uri_chars(uri: &str) -> std::result::Result<(), String> {
    let bytes = uri.as_bytes();
    for (i, ch) in uri.char_indices() {
        if ch.is_whitespace() || ch.is_control() {
            return Err(format!("illegal whitespace or control character at index {i}"));
        }
        if matches!(ch, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') {
            return Err(format!("illegal character '{ch}' at index {i}"));
        }
        if ch == '%' {
            let hex = bytes.get(i + 1..i + 3);
            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                return Err(format!("malformed escape at index {i}"));
            }
        }
    }
    if uri.matches('#').count() > 1 {
        return Err("more than one fragment".to_owned());
    }
    Ok(())
}

/// Turn a source path or link into its published form.
///
/// Backslashes become slashes, trailing slashes are dropped, a final
/// `README.md` segment becomes `index.html`, any other `.md` becomes `.html`
/// and an empty path becomes `/`. Scheme, authority, query and fragment are
/// kept verbatim.
///
/// ```
/// use josman_site::path::htmlize_path;
///
/// assert_eq!(htmlize_path("docs\\BLA.md").unwrap(), "docs/BLA.html");
/// assert_eq!(htmlize_path("a.md?q#f").unwrap(), "a.html?q#f");
/// assert_eq!(htmlize_path("docs/README.md").unwrap(), "docs/index.html");
/// ```
pub fn htmlize_path(path: &str) -> Result<String> {
    if path.trim().is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_owned(),
            reason: "path is blank".to_owned(),
        });
    }
    let slashed = normalize(path);
    let parts = UriParts::parse(&slashed).map_err(|reason| Error::InvalidPath {
        path: path.to_owned(),
        reason,
    })?;

    let trimmed = parts.path.trim_end_matches('/');
    let new_path = if trimmed == README_MD || trimmed.ends_with("/README.md") {
        format!("{}index.html", &trimmed[..trimmed.len() - README_MD.len()])
    } else if let Some(stem) = trimmed.strip_suffix(".md") {
        format!("{stem}.html")
    } else if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    };

    Ok(format!("{}{new_path}{}", parts.prefix, parts.suffix))
}

/// Output file of `rel_path` for `version` under `pages_root`.
pub fn target_file(pages_root: &Path, rel_path: &str, version: &Version) -> Result<PathBuf> {
    Ok(pages_root.join(target_rel_path(rel_path, version)?))
}

/// Output path of `rel_path`, relative to the site root.
pub fn target_rel_path(rel_path: &str, version: &Version) -> Result<String> {
    let path = normalize(rel_path);
    if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(Error::InvalidPath {
            path: rel_path.to_owned(),
            reason: "must be relative and stay inside the repository".to_owned(),
        });
    }
    if is_root_path(&path) {
        return htmlize_path(&path);
    }
    let inside_docs = path
        .strip_prefix(DOCS_FOLDER)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or_default();
    let htmlized = htmlize_path(inside_docs).map_err(|_| Error::InvalidPath {
        path: rel_path.to_owned(),
        reason: "names the docs folder itself, not a file inside it".to_owned(),
    })?;
    Ok(format!("{}/{htmlized}", version.major_minor()))
}

/// Menu label of a page.
///
/// `README.md` pages are "Usage", `CHANGES.md` pages are "Release notes",
/// other names are split at camelCase boundaries. Inside a run of capitals
/// the last capital starts the next word, so `AbCDEf` reads `Ab CD ef`.
pub fn target_name(rel_path: &str) -> Result<String> {
    let htmlized = htmlize_path(rel_path)?;
    let with_slash = format!("/{htmlized}");
    if with_slash.ends_with("/index.html") {
        return Ok("Usage".to_owned());
    }
    if with_slash.ends_with("/CHANGES.html") {
        return Ok("Release notes".to_owned());
    }

    let without_type = htmlized.replace(".html", "");
    let file_name = without_type
        .rsplit('/')
        .next()
        .unwrap_or(&without_type);
    let chars: Vec<char> = file_name.chars().collect();
    let Some(first) = chars.first() else {
        return Err(Error::InvalidPath {
            path: rel_path.to_owned(),
            reason: "file name is empty".to_owned(),
        });
    };

    let mut label: String = first.to_uppercase().collect();
    let mut i = 1;
    while i < chars.len() {
        let ch = chars[i];
        if let Some(&next) = chars.get(i + 1) {
            if ch.is_lowercase() && next.is_uppercase() {
                label.push(ch);
                label.push(' ');
                i += 1;
                continue;
            }
            if let Some(&after) = chars.get(i + 2) {
                if ch.is_uppercase() && next.is_uppercase() && after.is_lowercase() {
                    label.push(ch);
                    label.push(' ');
                    label.extend(next.to_lowercase());
                    i += 2;
                    continue;
                }
                if ch.is_uppercase() && next.is_uppercase() {
                    label.push(ch);
                    i += 1;
                    continue;
                }
            }
        }
        label.extend(ch.to_lowercase());
        i += 1;
    }
    Ok(label)
}
