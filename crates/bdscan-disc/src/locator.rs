//! BDMV directory discovery.
//!
//! A disc path may point at the disc root, at `BDMV` itself, somewhere inside
//! `BDMV`, or at a mount point one level above the disc. [`find_bdmv`] walks
//! up first and falls back to a bounded downward search.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find the `BDMV` directory for a path at, inside, or above a disc layout.
///
/// Ancestors of `path` (inclusive) are checked first for a directory named
/// exactly `BDMV`. Otherwise the children of `path` are searched with
/// [`find_directory`] up to `search_depth` extra levels.
pub fn find_bdmv(path: &Path, search_depth: usize) -> Result<PathBuf> {
    let start = if path.is_relative() {
        std::fs::canonicalize(path)?
    } else {
        path.to_path_buf()
    };

    for ancestor in start.ancestors() {
        if ancestor.file_name().map(|n| n == "BDMV").unwrap_or(false) && ancestor.is_dir() {
            debug!("Found BDMV above {:?}: {:?}", start, ancestor);
            return Ok(ancestor.to_path_buf());
        }
    }

    find_directory("BDMV", &start, search_depth).ok_or(Error::StructureNotFound {
        name: "BDMV",
        searched: start,
    })
}

/// Find a child directory named exactly `name`.
///
/// Direct children of `parent` are checked first; with `max_depth > 0` each
/// child is then searched recursively with one less level, and the first hit
/// is returned. Children are visited in name order so the result is stable.
/// Missing or unreadable directories count as "not found".
pub fn find_directory(name: &str, parent: &Path, max_depth: usize) -> Option<PathBuf> {
    let entries = std::fs::read_dir(parent).ok()?;

    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    if let Some(hit) = children
        .iter()
        .find(|c| c.file_name().map(|n| n == name).unwrap_or(false))
    {
        return Some(hit.clone());
    }

    if max_depth > 0 {
        for child in &children {
            if let Some(hit) = find_directory(name, child, max_depth - 1) {
                return Some(hit);
            }
        }
    }

    None
}

/// Every directory of a disc layout the scanner cares about.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct DiscDirectories {
    pub root: PathBuf,
    pub bdmv: PathBuf,
    pub clipinf: PathBuf,
    pub playlist: PathBuf,
    pub stream: Option<PathBuf>,
    pub ssif: Option<PathBuf>,
    pub bdjo: Option<PathBuf>,
    pub meta: Option<PathBuf>,
    pub snp: Option<PathBuf>,
}

impl DiscDirectories {
    /// Locate the layout from any path at, inside, or above the disc.
    ///
    /// Fails if `BDMV`, `CLIPINF` or `PLAYLIST` is missing.
    pub fn locate(path: &Path, search_depth: usize) -> Result<Self> {
        let bdmv = find_bdmv(path, search_depth)?;
        let root = bdmv.parent().map(Path::to_path_buf).unwrap_or_else(|| bdmv.clone());

        let clipinf = find_directory("CLIPINF", &bdmv, 0).ok_or(Error::StructureNotFound {
            name: "CLIPINF",
            searched: bdmv.clone(),
        })?;
        let playlist = find_directory("PLAYLIST", &bdmv, 0).ok_or(Error::StructureNotFound {
            name: "PLAYLIST",
            searched: bdmv.clone(),
        })?;

        let stream = find_directory("STREAM", &bdmv, 0);
        let ssif = stream
            .as_deref()
            .and_then(|dir| find_directory("SSIF", dir, 0));

        Ok(Self {
            bdjo: find_directory("BDJO", &bdmv, 0),
            meta: find_directory("META", &bdmv, 0),
            snp: find_directory("SNP", &root, 0),
            root,
            bdmv,
            clipinf,
            playlist,
            stream,
            ssif,
        })
    }

    /// Whether any BD+ virtual machine directory sits next to `BDMV`.
    pub fn has_bd_plus(&self) -> bool {
        ["BDSVM", "SLYVM", "ANYVM"]
            .iter()
            .any(|name| find_directory(name, &self.root, 0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    fn layout(root: &Path) {
        fs::create_dir_all(root.join("BDMV/CLIPINF")).unwrap();
        fs::create_dir_all(root.join("BDMV/PLAYLIST")).unwrap();
        fs::create_dir_all(root.join("BDMV/STREAM/SSIF")).unwrap();
    }

    #[test]
    fn test_find_bdmv_from_root_and_inside() {
        let dir = tempdir().unwrap();
        layout(dir.path());
        let bdmv = dir.path().join("BDMV");

        assert_eq!(find_bdmv(dir.path(), 0).unwrap(), bdmv);
        assert_eq!(find_bdmv(&bdmv, 0).unwrap(), bdmv);
        assert_eq!(find_bdmv(&bdmv.join("STREAM/SSIF"), 0).unwrap(), bdmv);
    }

    #[test]
    fn test_find_bdmv_from_mount_point_needs_depth() {
        let dir = tempdir().unwrap();
        let disc = dir.path().join("MOVIE_DISC");
        layout(&disc);

        assert_matches!(
            find_bdmv(dir.path(), 0),
            Err(Error::StructureNotFound { name: "BDMV", .. })
        );
        assert_eq!(find_bdmv(dir.path(), 1).unwrap(), disc.join("BDMV"));
    }

    #[test]
    fn test_find_directory_is_exact_match() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bdmv")).unwrap();
        assert_eq!(find_directory("BDMV", dir.path(), 0), None);
    }

    #[test]
    fn test_find_directory_returns_nested_hit() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/TARGET")).unwrap();

        assert_eq!(find_directory("TARGET", dir.path(), 0), None);
        assert_eq!(find_directory("TARGET", dir.path(), 1), None);
        assert_eq!(
            find_directory("TARGET", dir.path(), 2),
            Some(dir.path().join("a/b/TARGET"))
        );
    }

    #[test]
    fn test_find_directory_missing_parent() {
        assert_eq!(find_directory("BDMV", Path::new("/nonexistent/disc"), 3), None);
    }

    #[test]
    fn test_locate_requires_playlist() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("BDMV/CLIPINF")).unwrap();

        assert_matches!(
            DiscDirectories::locate(dir.path(), 0),
            Err(Error::StructureNotFound { name: "PLAYLIST", .. })
        );
    }

    #[test]
    fn test_locate_optional_directories() {
        let dir = tempdir().unwrap();
        layout(dir.path());
        fs::create_dir_all(dir.path().join("SNP")).unwrap();
        fs::create_dir_all(dir.path().join("SLYVM")).unwrap();

        let dirs = DiscDirectories::locate(dir.path(), 0).unwrap();
        assert_eq!(dirs.root, dir.path());
        assert_eq!(dirs.ssif, Some(dir.path().join("BDMV/STREAM/SSIF")));
        assert_eq!(dirs.snp, Some(dir.path().join("SNP")));
        assert_eq!(dirs.bdjo, None);
        assert!(dirs.has_bd_plus());
    }
}
