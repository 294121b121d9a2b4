//! Path utilities for disc file identity and extension matching.
//!
//! Blu-ray layouts are authored on case-insensitive filesystems, so the same
//! file may show up as `00001.clpi`, `00001.CLPI` or even `00001.CPI` depending
//! on the mastering tool and the filesystem it was copied to. Every catalog in
//! the scanner identifies files by [`catalog_key`], and every directory
//! listing tries the extension spellings below in order.

use std::path::Path;

/// Extension spellings for clip-info files, in lookup order.
pub const CLIP_INFO_EXTENSIONS: &[&str] = &["clpi", "CLPI", "CPI"];

/// Extension spellings for playlist files, in lookup order.
pub const PLAYLIST_EXTENSIONS: &[&str] = &["mpls", "MPLS", "MPL"];

/// Extension spellings for transport-stream files, in lookup order.
pub const STREAM_EXTENSIONS: &[&str] = &["m2ts", "M2TS", "MTS"];

/// Extension spellings for interleaved (3D) files, in lookup order.
pub const INTERLEAVED_EXTENSIONS: &[&str] = &["ssif", "SSIF"];

/// Normalize a file name into its catalog key.
///
/// # Examples
///
/// ```
/// use bdscan_common::paths::catalog_key;
///
/// assert_eq!(catalog_key("00800.mpls"), "00800.MPLS");
/// assert_eq!(catalog_key("00800.MPLS"), "00800.MPLS");
/// ```
#[must_use]
pub fn catalog_key(name: &str) -> String {
    name.to_uppercase()
}

/// Catalog key for the file name component of a path.
///
/// Names that are not valid UTF-8 are converted lossily, so distinct files
/// keep distinct keys. Returns `None` only for paths without a file name.
#[must_use]
pub fn key_for_path(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| catalog_key(&name.to_string_lossy()))
}

/// Key of the interleaved companion for a stream file name.
///
/// # Examples
///
/// ```
/// use bdscan_common::paths::interleaved_key;
///
/// assert_eq!(interleaved_key("00001.m2ts"), "00001.SSIF");
/// assert_eq!(interleaved_key("TITLE.M2TS"), "TITLE.SSIF");
/// ```
#[must_use]
pub fn interleaved_key(stream_name: &str) -> String {
    let stem = Path::new(stream_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(stream_name);
    catalog_key(&format!("{}.SSIF", stem))
}

/// Check if a path is an interleaved (`.ssif`) file, ignoring case.
pub fn is_interleaved_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("ssif"))
        .unwrap_or(false)
}

/// Check if a path has exactly the given extension spelling.
///
/// Matching is case-sensitive on purpose: the variant tables above already
/// enumerate the spellings to try, in priority order.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == extension)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_key_is_idempotent() {
        for name in ["00001.clpi", "00001.CLPI", "00001.Clpi", "title.m2ts"] {
            let key = catalog_key(name);
            assert_eq!(catalog_key(&key), key);
        }
        assert_eq!(catalog_key("00001.clpi"), catalog_key("00001.CLPI"));
    }

    #[test]
    fn test_key_for_path() {
        assert_eq!(
            key_for_path(Path::new("/disc/BDMV/PLAYLIST/00000.mpls")),
            Some("00000.MPLS".to_string())
        );
        assert_eq!(key_for_path(Path::new("/")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_key_for_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let first = Path::new(OsStr::from_bytes(b"0000\xff1.m2ts"));
        let second = Path::new(OsStr::from_bytes(b"0000\xfe2.m2ts"));
        assert_eq!(key_for_path(first), Some("0000\u{FFFD}1.M2TS".to_string()));
        assert_ne!(key_for_path(first), key_for_path(second));
    }

    #[test]
    fn test_interleaved_key() {
        assert_eq!(interleaved_key("00001.m2ts"), "00001.SSIF");
        assert_eq!(interleaved_key("00001.MTS"), "00001.SSIF");
        assert_eq!(interleaved_key("noext"), "NOEXT.SSIF");
    }

    #[test]
    fn test_is_interleaved_file() {
        assert!(is_interleaved_file(Path::new("00001.ssif")));
        assert!(is_interleaved_file(Path::new("/a/b/00001.SSIF")));
        assert!(!is_interleaved_file(Path::new("00001.m2ts")));
        assert!(!is_interleaved_file(Path::new("SSIF")));
    }

    #[test]
    fn test_has_extension_is_exact() {
        assert!(has_extension(Path::new("00001.clpi"), "clpi"));
        assert!(!has_extension(Path::new("00001.clpi"), "CLPI"));
        assert!(has_extension(Path::new("00001.CPI"), "CPI"));
        assert!(!has_extension(Path::new("00001"), "clpi"));
    }
}
