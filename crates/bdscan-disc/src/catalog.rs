//! File listing by extension variant and the keyed catalogs a disc owns.

use bdscan_common::paths::{catalog_key, has_extension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// List the files in `dir` matching the first productive extension spelling.
///
/// Each spelling in `variants` is tried in order and the first one that
/// matches at least one regular file wins; its matches are returned sorted by
/// path. Returns `None` when `dir` is absent or unreadable, or when no
/// spelling matches anything. A missing optional directory is not an error.
pub fn list_files(dir: Option<&Path>, variants: &[&str]) -> Option<Vec<PathBuf>> {
    let dir = dir?;
    let files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    for ext in variants {
        let mut matched: Vec<PathBuf> = files
            .iter()
            .filter(|p| has_extension(p, ext))
            .cloned()
            .collect();
        if !matched.is_empty() {
            matched.sort();
            return Some(matched);
        }
    }

    None
}

/// Ordered map of disc files keyed by uppercased file name.
///
/// All inserts and lookups go through [`catalog_key`], so `00001.clpi` and
/// `00001.CLPI` always name the same entry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(transparent))]
pub struct Catalog<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the normalized key, returning any entry it replaced.
    pub fn insert(&mut self, name: &str, value: T) -> Option<T> {
        self.entries.insert(catalog_key(name), value)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(&catalog_key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(&catalog_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&catalog_key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_first_variant_wins() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "00001.clpi");
        touch(dir.path(), "00002.CLPI");

        let files = list_files(Some(dir.path()), &["clpi", "CLPI", "CPI"]).unwrap();
        assert_eq!(files, vec![dir.path().join("00001.clpi")]);
    }

    #[test]
    fn test_falls_through_empty_variants() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "00002.CPI");
        touch(dir.path(), "00001.CPI");
        touch(dir.path(), "readme.txt");

        let files = list_files(Some(dir.path()), &["clpi", "CLPI", "CPI"]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("00001.CPI"), dir.path().join("00002.CPI")]
        );
    }

    #[test]
    fn test_not_found_cases() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "00001.m2ts");
        fs::create_dir(dir.path().join("fake.clpi")).unwrap();

        assert_eq!(list_files(Some(dir.path()), &["clpi", "CLPI"]), None);
        assert_eq!(list_files(None, &["clpi"]), None);
        assert_eq!(list_files(Some(&dir.path().join("missing")), &["m2ts"]), None);
    }

    #[test]
    fn test_catalog_normalizes_keys() {
        let mut catalog = Catalog::new();
        assert!(catalog.insert("00001.clpi", 1).is_none());
        assert_eq!(catalog.insert("00001.CLPI", 2), Some(1));
        catalog.insert("00001.Clpi", 3);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("00001.clpi"), Some(&3));
        assert!(catalog.contains("00001.CLPI"));
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["00001.CLPI"]);
    }

    #[test]
    fn test_catalog_ordered_iteration() {
        let mut catalog = Catalog::new();
        catalog.insert("00003.m2ts", 'c');
        catalog.insert("00001.m2ts", 'a');
        catalog.insert("00002.m2ts", 'b');

        let values: String = catalog.values().collect();
        assert_eq!(values, "abc");
    }
}
