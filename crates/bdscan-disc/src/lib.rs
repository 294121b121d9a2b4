//! Bdscan-Disc: Blu-ray disc structure discovery and scanning.
//!
//! This crate turns a Blu-ray file layout into an in-memory model:
//!
//! - **Locating**: find `BDMV` from a path at, inside, or above the disc
//! - **Cataloging**: list clip-info, playlist, stream and interleaved files
//! - **Parsing**: decode CLPI and MPLS files and scan M2TS transport streams
//! - **Cross-linking**: resolve playlists to clips, stream files to SSIF
//!
//! # Examples
//!
//! ```no_run
//! use bdscan_disc::{Disc, DiscOptions, PlaylistFilter, ScanHandlers, ScanOptions};
//!
//! let mut disc = Disc::open("/mnt/bluray", &DiscOptions::default())?;
//! let mut handlers = ScanHandlers::continue_on_error();
//! disc.scan(&mut handlers, &ScanOptions::default())?;
//!
//! for playlist in disc.feature_playlists(&PlaylistFilter::default()) {
//!     println!("{} {:.0}s", playlist.name, playlist.total_length());
//! }
//! # Ok::<(), bdscan_disc::Error>(())
//! ```

pub mod catalog;
pub mod clip;
pub mod disc;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod locator;
pub mod playlist;
mod reader;
pub mod scan;
pub mod stream;
pub mod stream_file;
mod ts;
pub mod volume;

pub use catalog::Catalog;
pub use clip::{ClipInfo, StreamClipFile};
pub use disc::{Disc, DiscOptions};
pub use error::{Error, Result};
pub use locator::{find_bdmv, find_directory, DiscDirectories};
pub use playlist::{PlaylistFile, PlaylistFilter, StreamClip};
pub use scan::{
    compare_stream_files, PhaseSummary, ScanDecision, ScanHandlers, ScanOptions, ScanPhase,
    ScanProgress, ScanStatus, ScanSummary,
};
pub use stream::{StreamAttributes, StreamType, TsStream};
pub use stream_file::{InterleavedFile, StreamFile};
pub use volume::{DirectoryNameLabel, VolumeLabelProvider};

pub use bdscan_common::CancelToken;
