//! Shared helpers for disc integration tests.
//!
//! Builds synthetic disc trees in a temporary directory from the byte
//! builders in [`bdscan_disc::fixtures`].

#![allow(dead_code)]

use bdscan_disc::fixtures::{
    sample_clip, sample_playlist, sample_stream, write_file, write_minimal_disc,
    FixturePlayItem, PlaylistBuilder,
};
use bdscan_disc::{Disc, DiscOptions};
use std::path::PathBuf;
use tempfile::TempDir;

/// A disc tree that lives as long as the value.
pub struct TestDisc {
    pub dir: TempDir,
    pub root: PathBuf,
}

impl TestDisc {
    /// The smallest complete disc: one clip, one playlist, one stream file.
    pub fn minimal() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().join("TEST_DISC");
        write_minimal_disc(&root).expect("failed to write disc");
        Self { dir, root }
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) {
        write_file(&self.root.join(relative), bytes).expect("failed to write file");
    }

    /// Add a clip and its stream file under base name `base`.
    pub fn add_title(&self, base: &str) {
        self.write(&format!("BDMV/CLIPINF/{}.clpi", base), &sample_clip());
        self.write(&format!("BDMV/STREAM/{}.m2ts", base), &sample_stream());
    }

    /// Add a playlist with one play item over `clip`, `seconds` long.
    pub fn add_playlist(&self, name: &str, clip: &str, seconds: u32) {
        let data = PlaylistBuilder::new()
            .item(FixturePlayItem::new(clip, 0, 45_000 * seconds))
            .build();
        self.write(&format!("BDMV/PLAYLIST/{}.mpls", name), &data);
    }

    /// Add the sample playlist over `clip` under a new name.
    pub fn add_sample_playlist(&self, name: &str, clip: &str) {
        self.write(&format!("BDMV/PLAYLIST/{}.mpls", name), &sample_playlist(clip));
    }

    pub fn open(&self) -> Disc {
        Disc::open(&self.root, &DiscOptions::default()).expect("failed to open disc")
    }
}
