//! The disc model: located directories, feature flags, and file catalogs.

use crate::catalog::{list_files, Catalog};
use crate::clip::StreamClipFile;
use crate::locator::DiscDirectories;
use crate::playlist::{PlaylistFile, PlaylistFilter};
use crate::scan::{self, ScanHandlers, ScanOptions, ScanSummary};
use crate::stream_file::{InterleavedFile, StreamFile};
use crate::volume::{DirectoryNameLabel, VolumeLabelProvider};
use crate::Result;
use bdscan_common::paths::{
    is_interleaved_file, CLIP_INFO_EXTENSIONS, INTERLEAVED_EXTENSIONS, PLAYLIST_EXTENSIONS,
    STREAM_EXTENSIONS,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const UHD_INDEX_TAG: &[u8; 8] = b"INDX0300";

/// Options for [`Disc::open`].
#[derive(Debug, Clone, Default)]
pub struct DiscOptions {
    /// Extra directory levels searched below the given path for `BDMV`
    pub bdmv_search_depth: usize,
}

/// A located Blu-ray disc layout and everything scanned from it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Disc {
    pub directories: DiscDirectories,
    pub volume_label: String,
    /// Total bytes under the disc root, interleaved files excluded
    pub size: u64,
    pub is_bd_plus: bool,
    pub is_bd_java: bool,
    pub is_dbox: bool,
    pub is_psp: bool,
    pub is_3d: bool,
    pub is_uhd: bool,
    /// Set by [`Disc::scan`]
    pub is_50hz: bool,
    pub playlist_files: Catalog<PlaylistFile>,
    pub stream_clip_files: Catalog<StreamClipFile>,
    pub stream_files: Catalog<StreamFile>,
    pub interleaved_files: Catalog<InterleavedFile>,
}

impl Disc {
    /// Locate and catalog the disc at, inside, or above `path`.
    ///
    /// Fails if `BDMV`, `CLIPINF` or `PLAYLIST` cannot be found. Files are
    /// listed but not parsed; call [`Disc::scan`] for that.
    pub fn open(path: impl AsRef<Path>, options: &DiscOptions) -> Result<Self> {
        Self::open_with_label(path, options, &DirectoryNameLabel)
    }

    pub fn open_with_label(
        path: impl AsRef<Path>,
        options: &DiscOptions,
        labels: &dyn VolumeLabelProvider,
    ) -> Result<Self> {
        let path = path.as_ref();
        let directories = DiscDirectories::locate(path, options.bdmv_search_depth)?;
        info!("Opening disc at {:?}", directories.root);

        let volume_label = labels
            .volume_label(&directories.root)
            .filter(|label| !label.is_empty())
            .or_else(|| DirectoryNameLabel.volume_label(&directories.root))
            .unwrap_or_else(|| directories.root.display().to_string());

        let mut disc = Self {
            volume_label,
            size: directory_size(&directories.root),
            is_bd_plus: directories.has_bd_plus(),
            is_bd_java: has_files(directories.bdjo.as_deref()),
            is_dbox: directories.root.join("FilmIndex.xml").is_file(),
            is_psp: list_files(directories.snp.as_deref(), &["mnv", "MNV"]).is_some(),
            is_3d: has_files(directories.ssif.as_deref()),
            is_uhd: has_uhd_index(&directories.bdmv),
            is_50hz: false,
            playlist_files: Catalog::new(),
            stream_clip_files: Catalog::new(),
            stream_files: Catalog::new(),
            interleaved_files: Catalog::new(),
            directories,
        };
        disc.catalog();
        Ok(disc)
    }

    fn catalog(&mut self) {
        let dirs = &self.directories;

        for path in list_files(Some(&dirs.playlist), PLAYLIST_EXTENSIONS).unwrap_or_default() {
            let file = PlaylistFile::new(&path);
            self.playlist_files.insert(&file.name.clone(), file);
        }
        for path in list_files(Some(&dirs.clipinf), CLIP_INFO_EXTENSIONS).unwrap_or_default() {
            let file = StreamClipFile::new(&path);
            self.stream_clip_files.insert(&file.name.clone(), file);
        }
        for path in list_files(dirs.stream.as_deref(), STREAM_EXTENSIONS).unwrap_or_default() {
            let file = StreamFile::new(&path);
            self.stream_files.insert(&file.name.clone(), file);
        }
        for path in list_files(dirs.ssif.as_deref(), INTERLEAVED_EXTENSIONS).unwrap_or_default() {
            let file = InterleavedFile::new(&path);
            self.interleaved_files.insert(&file.name.clone(), file);
        }

        debug!(
            "Cataloged {} playlists, {} clips, {} stream files, {} interleaved files",
            self.playlist_files.len(),
            self.stream_clip_files.len(),
            self.stream_files.len(),
            self.interleaved_files.len()
        );
    }

    /// Parse everything on the disc. See [`crate::scan`] for the phases.
    pub fn scan(
        &mut self,
        handlers: &mut ScanHandlers<'_>,
        options: &ScanOptions,
    ) -> Result<ScanSummary> {
        scan::run(self, handlers, options)
    }

    pub fn root(&self) -> &Path {
        &self.directories.root
    }

    pub fn bdmv(&self) -> &Path {
        &self.directories.bdmv
    }

    /// Valid playlists, longest first.
    pub fn feature_playlists(&self, filter: &PlaylistFilter) -> Vec<&PlaylistFile> {
        let mut playlists: Vec<&PlaylistFile> = self
            .playlist_files
            .values()
            .filter(|p| p.is_valid(filter))
            .collect();
        playlists.sort_by(|a, b| b.total_length().total_cmp(&a.total_length()));
        playlists
    }
}

/// Recursive byte total, skipping interleaved files.
fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && !is_interleaved_file(e.path()))
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn has_files(dir: Option<&Path>) -> bool {
    let Some(dir) = dir else {
        return false;
    };
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().is_file())
        })
        .unwrap_or(false)
}

fn has_uhd_index(bdmv: &Path) -> bool {
    let mut tag = [0u8; 8];
    let index: PathBuf = bdmv.join("index.bdmv");
    std::fs::File::open(index)
        .and_then(|mut f| f.read_exact(&mut tag))
        .map(|_| &tag == UHD_INDEX_TAG)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{write_file, write_minimal_disc};
    use crate::volume::FixedLabel;
    use tempfile::tempdir;

    #[test]
    fn test_open_catalogs_without_parsing() {
        let dir = tempdir().unwrap();
        write_minimal_disc(dir.path()).unwrap();

        let disc = Disc::open(dir.path(), &DiscOptions::default()).unwrap();
        assert_eq!(disc.bdmv(), dir.path().join("BDMV"));
        assert!(disc.playlist_files.contains("00000.MPLS"));
        assert!(disc.stream_clip_files.contains("00001.clpi"));
        assert!(disc.stream_files.contains("00001.M2TS"));
        assert!(disc.interleaved_files.is_empty());
        assert!(disc
            .stream_clip_files
            .values()
            .all(|c| c.status == crate::ScanStatus::Pending));
        assert!(!disc.is_3d && !disc.is_bd_plus && !disc.is_uhd);
    }

    #[test]
    fn test_flags() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_minimal_disc(root).unwrap();
        write_file(&root.join("BDMV/BDJO/00000.bdjo"), b"bdjo").unwrap();
        write_file(&root.join("SNP/menu.MNV"), b"mnv").unwrap();
        write_file(&root.join("FilmIndex.xml"), b"<x/>").unwrap();
        write_file(&root.join("BDMV/index.bdmv"), b"INDX0300....").unwrap();
        std::fs::create_dir_all(root.join("BDSVM")).unwrap();

        let disc = Disc::open(root, &DiscOptions::default()).unwrap();
        assert!(disc.is_bd_java);
        assert!(disc.is_psp);
        assert!(disc.is_dbox);
        assert!(disc.is_uhd);
        assert!(disc.is_bd_plus);
    }

    #[test]
    fn test_empty_ssif_directory_is_not_3d() {
        let dir = tempdir().unwrap();
        write_minimal_disc(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("BDMV/STREAM/SSIF")).unwrap();

        let disc = Disc::open(dir.path(), &DiscOptions::default()).unwrap();
        assert!(!disc.is_3d);
    }

    #[test]
    fn test_size_excludes_interleaved_files() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("BDMV/CLIPINF/00001.clpi"), &[0u8; 100]).unwrap();
        write_file(&dir.path().join("BDMV/PLAYLIST/00000.mpls"), &[0u8; 50]).unwrap();
        write_file(&dir.path().join("BDMV/STREAM/00001.m2ts"), &[0u8; 1000]).unwrap();
        write_file(&dir.path().join("BDMV/STREAM/SSIF/00001.ssif"), &[0u8; 5000]).unwrap();
        write_file(&dir.path().join("BDMV/STREAM/SSIF/00002.SSIF"), &[0u8; 7000]).unwrap();

        let disc = Disc::open(dir.path(), &DiscOptions::default()).unwrap();
        assert_eq!(disc.size, 1150);
        assert!(disc.is_3d);
    }

    #[test]
    fn test_volume_label() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("MY_MOVIE");
        write_minimal_disc(&root).unwrap();

        let disc = Disc::open(&root, &DiscOptions::default()).unwrap();
        assert_eq!(disc.volume_label, "MY_MOVIE");

        let disc = Disc::open_with_label(
            &root,
            &DiscOptions::default(),
            &FixedLabel("FEATURE".to_string()),
        )
        .unwrap();
        assert_eq!(disc.volume_label, "FEATURE");
    }

    struct NoLabel;

    impl VolumeLabelProvider for NoLabel {
        fn volume_label(&self, _root: &Path) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_missing_volume_label_uses_directory_name() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("TEST_DISC");
        write_minimal_disc(&root).unwrap();

        let disc = Disc::open_with_label(&root, &DiscOptions::default(), &NoLabel).unwrap();
        assert_eq!(disc.volume_label, "TEST_DISC");

        let disc =
            Disc::open_with_label(&root, &DiscOptions::default(), &FixedLabel(String::new()))
                .unwrap();
        assert_eq!(disc.volume_label, "TEST_DISC");
    }

    #[test]
    fn test_open_from_mount_point() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("MY_MOVIE");
        write_minimal_disc(&root).unwrap();

        assert!(Disc::open(dir.path(), &DiscOptions::default()).is_err());
        let disc = Disc::open(
            dir.path(),
            &DiscOptions {
                bdmv_search_depth: 1,
            },
        )
        .unwrap();
        assert_eq!(disc.root(), root);
    }
}
