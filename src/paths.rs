//! Canonical output locations.
//!
//! Every document has exactly one canonical location, derived from its number alone: a
//! zero-padded slug (`pep-0008`) used as the output directory name. Nothing else about the
//! document (title, status, source file name) influences it, so the same number always maps to
//! the same path across builds.

use std::path::{Component, Path, PathBuf};

/// Minimum width of the numeric part of a slug.
pub const SLUG_WIDTH: usize = 4;

pub const SLUG_PREFIX: &str = "pep-";

pub const PAGE_FILE: &str = "index.html";

/// `8` -> `pep-0008`; numbers wider than [SLUG_WIDTH] are not truncated.
pub fn canonical_slug(number: u32) -> String {
    format!("{SLUG_PREFIX}{number:0width$}", width = SLUG_WIDTH)
}

/// URL path of a document's page, relative to the site root, e.g. `/pep-0008/`.
pub fn canonical_path(site_root: &str, number: u32) -> String {
    format!("{}{}/", normalize_site_root(site_root), canonical_slug(number))
}

/// Output file of a document's page, relative to the output directory.
pub fn page_file(number: u32) -> PathBuf {
    Path::new(&canonical_slug(number)).join(PAGE_FILE)
}

/// Site root URL prefix, always starting and ending with `/`.
pub fn normalize_site_root(site_root: &str) -> String {
    let trimmed = site_root.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Turn a title string into a regularized anchor string
pub fn to_anchor(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .replace(char::is_whitespace, "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Relative path inside a document's output directory for an image referenced from its body.
///
/// Returns `None` for references that are not local files (URLs, absolute paths) or that would
/// escape the document directory.
pub fn local_asset_path(src: &str) -> Option<PathBuf> {
    if src.is_empty() || src.contains("://") || src.starts_with('/') || src.starts_with("data:")
    {
        return None;
    }
    let clean = src.split(['#', '?']).next().unwrap_or_default();
    let mut path = PathBuf::new();
    for component in Path::new(clean).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Whether an image reference is considered remote (and therefore not copied).
pub fn is_remote(src: &str) -> bool {
    src.contains("://") || src.starts_with("data:") || src.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_is_zero_padded() {
        assert_eq!(canonical_slug(1), "pep-0001");
        assert_eq!(canonical_slug(8), "pep-0008");
        assert_eq!(canonical_slug(484), "pep-0484");
        assert_eq!(canonical_slug(12345), "pep-12345");
    }

    #[test]
    fn test_canonical_path_is_pure() {
        for n in [1u32, 8, 42, 3000, 9999] {
            assert_eq!(canonical_path("/", n), canonical_path("/", n));
            assert_eq!(canonical_path("", n), canonical_path("/", n));
        }
        assert_eq!(canonical_path("/", 8), "/pep-0008/");
        assert_eq!(canonical_path("peps", 8), "/peps/pep-0008/");
        assert_eq!(canonical_path("/peps/", 8), "/peps/pep-0008/");
    }

    #[test]
    fn test_page_file() {
        assert_eq!(page_file(42), PathBuf::from("pep-0042").join("index.html"));
    }

    #[test]
    fn test_to_anchor() {
        assert_eq!(to_anchor("  Rationale and Goals "), "rationale-and-goals");
        assert_eq!(to_anchor("What's new?"), "whats-new");
    }

    #[test]
    fn test_local_asset_path() {
        assert_eq!(local_asset_path("img/a.png"), Some(PathBuf::from("img/a.png")));
        assert_eq!(local_asset_path("a.svg#frag"), Some(PathBuf::from("a.svg")));
        assert_eq!(local_asset_path("./diagram.png"), Some(PathBuf::from("diagram.png")));
        assert_eq!(local_asset_path("./img/./a.png"), Some(PathBuf::from("img/a.png")));
        assert_eq!(local_asset_path("./"), None);
        assert_eq!(local_asset_path("img/../../secret.png"), None);
        assert_eq!(local_asset_path("../secret.png"), None);
        assert_eq!(local_asset_path("/abs.png"), None);
        assert_eq!(local_asset_path("https://x.org/a.png"), None);
        assert!(is_remote("https://x.org/a.png"));
        assert!(!is_remote("img/a.png"));
    }
}
