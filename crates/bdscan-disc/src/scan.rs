//! Scan orchestration.
//!
//! A disc scan runs in fixed phases:
//!
//! 1. parse every clip-info file
//! 2. link stream files to their interleaved (SSIF) counterparts
//! 3. order stream files by size, smallest first
//! 4. parse every playlist
//! 5. scan every stream file with the playlists that reference it
//! 6. initialize every playlist from the clip and stream results
//!
//! Each phase completes before the next begins. A per-item failure goes to
//! the matching handler in [`ScanHandlers`], which decides whether the phase
//! continues; without a handler the error ends the whole scan.

use crate::catalog::Catalog;
use crate::clip::StreamClipFile;
use crate::disc::Disc;
use crate::playlist::PlaylistFile;
use crate::stream_file::StreamFile;
use crate::{Error, Result};
use bdscan_common::paths::interleaved_key;
use bdscan_common::CancelToken;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info, warn};

/// Per-file scan outcome.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(tag = "state", content = "error", rename_all = "lowercase"))]
pub enum ScanStatus {
    #[default]
    Pending,
    Scanned,
    Failed(String),
}

impl ScanStatus {
    pub fn is_scanned(&self) -> bool {
        matches!(self, ScanStatus::Scanned)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScanStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScanStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// What a phase does after a handler has seen a per-item error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDecision {
    /// Record the failure and move on to the next item
    Continue,
    /// Skip the rest of the current phase; later phases still run
    Abort,
}

/// Scan phase, as reported in [`ScanProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ScanPhase {
    Clips,
    Playlists,
    StreamFiles,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Clips => write!(f, "clips"),
            ScanPhase::Playlists => write!(f, "playlists"),
            ScanPhase::StreamFiles => write!(f, "stream files"),
        }
    }
}

/// Scan progress information.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub item: String,
    /// Zero-based position in the phase
    pub index: usize,
    pub total: usize,
}

pub type ClipErrorCallback<'a> = Box<dyn FnMut(&StreamClipFile, &Error) -> ScanDecision + 'a>;
pub type PlaylistErrorCallback<'a> = Box<dyn FnMut(&PlaylistFile, &Error) -> ScanDecision + 'a>;
pub type StreamFileErrorCallback<'a> = Box<dyn FnMut(&StreamFile, &Error) -> ScanDecision + 'a>;
pub type ProgressCallback<'a> = Box<dyn FnMut(&ScanProgress) + 'a>;

/// Optional callbacks consulted during a scan.
#[derive(Default)]
pub struct ScanHandlers<'a> {
    on_clip_error: Option<ClipErrorCallback<'a>>,
    on_playlist_error: Option<PlaylistErrorCallback<'a>>,
    on_stream_file_error: Option<StreamFileErrorCallback<'a>>,
    on_progress: Option<ProgressCallback<'a>>,
}

impl<'a> ScanHandlers<'a> {
    /// No handlers: the first per-item error ends the scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every per-item error is recorded and skipped.
    pub fn continue_on_error() -> Self {
        Self::new()
            .on_clip_error(|_, _| ScanDecision::Continue)
            .on_playlist_error(|_, _| ScanDecision::Continue)
            .on_stream_file_error(|_, _| ScanDecision::Continue)
    }

    pub fn on_clip_error(
        mut self,
        f: impl FnMut(&StreamClipFile, &Error) -> ScanDecision + 'a,
    ) -> Self {
        self.on_clip_error = Some(Box::new(f));
        self
    }

    pub fn on_playlist_error(
        mut self,
        f: impl FnMut(&PlaylistFile, &Error) -> ScanDecision + 'a,
    ) -> Self {
        self.on_playlist_error = Some(Box::new(f));
        self
    }

    pub fn on_stream_file_error(
        mut self,
        f: impl FnMut(&StreamFile, &Error) -> ScanDecision + 'a,
    ) -> Self {
        self.on_stream_file_error = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl FnMut(&ScanProgress) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    fn progress(&mut self, phase: ScanPhase, item: &str, index: usize, total: usize) {
        if let Some(cb) = self.on_progress.as_mut() {
            cb(&ScanProgress {
                phase,
                item: item.to_string(),
                index,
                total,
            });
        }
    }
}

/// Route a per-item error to its handler, or propagate it if there is none.
fn decide<T: ?Sized>(
    handler: &mut Option<Box<dyn FnMut(&T, &Error) -> ScanDecision + '_>>,
    item: &T,
    error: Error,
) -> Result<ScanDecision> {
    match handler.as_mut() {
        Some(cb) => Ok(cb(item, &error)),
        None => Err(error),
    }
}

/// Scan behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Read the interleaved SSIF file instead of the M2TS when one is linked
    pub enable_ssif: bool,
    /// Stop reading each stream file after this many bytes
    pub stream_scan_limit: Option<u64>,
    pub cancel: CancelToken,
}

/// Per-phase counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PhaseSummary {
    pub scanned: usize,
    pub failed: usize,
    /// The phase was cut short by a handler returning [`ScanDecision::Abort`]
    pub aborted: bool,
}

/// Counts returned by [`Disc::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ScanSummary {
    pub clips: PhaseSummary,
    pub playlists: PhaseSummary,
    pub stream_files: PhaseSummary,
}

/// Order stream files by on-disk size, smallest first.
///
/// Files whose size cannot be determined sort after every file with a known
/// size; two unknown sizes compare equal.
pub fn compare_stream_files(x: Option<&StreamFile>, y: Option<&StreamFile>) -> Ordering {
    compare_sizes(
        x.and_then(StreamFile::file_size),
        y.and_then(StreamFile::file_size),
    )
}

fn compare_sizes(x: Option<u64>, y: Option<u64>) -> Ordering {
    match (x, y) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

fn check_cancel(options: &ScanOptions) -> Result<()> {
    if options.cancel.is_cancelled() {
        info!("Scan cancelled");
        return Err(Error::Cancelled);
    }
    Ok(())
}

pub(crate) fn run(
    disc: &mut Disc,
    handlers: &mut ScanHandlers<'_>,
    options: &ScanOptions,
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();

    info!("Scanning {} clip files", disc.stream_clip_files.len());
    scan_clips(&mut disc.stream_clip_files, handlers, options, &mut summary.clips)?;

    for stream in disc.stream_files.values_mut() {
        if let Some(ssif) = disc.interleaved_files.get(&interleaved_key(&stream.name)) {
            debug!("Linked {} to {}", stream.name, ssif.name);
            stream.link_interleaved(ssif);
        }
    }

    let mut order: Vec<(String, Option<u64>)> = disc
        .stream_files
        .values()
        .map(|s| (s.name.clone(), s.file_size()))
        .collect();
    order.sort_by(|a, b| compare_sizes(a.1, b.1));

    info!("Scanning {} playlists", disc.playlist_files.len());
    let total = disc.playlist_files.len();
    for (index, playlist) in disc.playlist_files.values_mut().enumerate() {
        check_cancel(options)?;
        handlers.progress(ScanPhase::Playlists, &playlist.name, index, total);
        match playlist.scan(&disc.stream_files, &disc.stream_clip_files) {
            Ok(()) => summary.playlists.scanned += 1,
            Err(e) => {
                warn!("Failed to scan playlist {}: {}", playlist.name, e);
                summary.playlists.failed += 1;
                if decide(&mut handlers.on_playlist_error, &*playlist, e)? == ScanDecision::Abort {
                    summary.playlists.aborted = true;
                    break;
                }
            }
        }
    }

    info!("Scanning {} stream files", order.len());
    let total = order.len();
    for (index, (name, _)) in order.iter().enumerate() {
        check_cancel(options)?;
        handlers.progress(ScanPhase::StreamFiles, name, index, total);

        let referencing: Vec<&PlaylistFile> = disc
            .playlist_files
            .values()
            .filter(|p| p.references_stream(name))
            .collect();
        let Some(stream) = disc.stream_files.get_mut(name) else {
            continue;
        };
        stream.scan_limit = options.stream_scan_limit;
        let interleaved = options.enable_ssif && stream.interleaved_file.is_some();

        match stream.scan(&referencing, interleaved) {
            Ok(()) => summary.stream_files.scanned += 1,
            Err(e) => {
                warn!("Failed to scan stream file {}: {}", stream.name, e);
                summary.stream_files.failed += 1;
                if decide(&mut handlers.on_stream_file_error, &*stream, e)? == ScanDecision::Abort
                {
                    summary.stream_files.aborted = true;
                    break;
                }
            }
        }
    }

    for playlist in disc.playlist_files.values_mut() {
        playlist.initialize(&disc.stream_clip_files, &disc.stream_files);
    }

    disc.is_50hz = disc
        .playlist_files
        .values()
        .flat_map(|p| p.streams.values())
        .chain(disc.stream_clip_files.values().flat_map(|c| c.streams.values()))
        .any(|s| s.frame_rate().map(|r| r.is_50hz()).unwrap_or(false));

    info!(
        "Scan complete: {} clips, {} playlists, {} stream files",
        summary.clips.scanned, summary.playlists.scanned, summary.stream_files.scanned
    );
    Ok(summary)
}

fn scan_clips(
    clips: &mut Catalog<StreamClipFile>,
    handlers: &mut ScanHandlers<'_>,
    options: &ScanOptions,
    summary: &mut PhaseSummary,
) -> Result<()> {
    let total = clips.len();
    for (index, clip) in clips.values_mut().enumerate() {
        check_cancel(options)?;
        handlers.progress(ScanPhase::Clips, &clip.name, index, total);
        match clip.scan() {
            Ok(()) => summary.scanned += 1,
            Err(e) => {
                warn!("Failed to scan clip {}: {}", clip.name, e);
                summary.failed += 1;
                if decide(&mut handlers.on_clip_error, &*clip, e)? == ScanDecision::Abort {
                    summary.aborted = true;
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sizes_sort_last() {
        let mut sizes = vec![None, Some(300), None, Some(100), Some(200)];
        sizes.sort_by(|a, b| compare_sizes(*a, *b));
        assert_eq!(sizes, vec![Some(100), Some(200), Some(300), None, None]);
    }

    #[test]
    fn test_compare_missing_stream_files() {
        assert_eq!(compare_stream_files(None, None), Ordering::Equal);
    }

    #[test]
    fn test_status_helpers() {
        assert!(ScanStatus::Scanned.is_scanned());
        let failed = ScanStatus::Failed("bad".to_string());
        assert!(failed.is_failed());
        assert_eq!(failed.error(), Some("bad"));
        assert_eq!(ScanStatus::default(), ScanStatus::Pending);
    }

    #[test]
    fn test_decide_without_handler_propagates() {
        let mut handler: Option<Box<dyn FnMut(&str, &Error) -> ScanDecision>> = None;
        assert!(matches!(
            decide(&mut handler, "x", Error::Cancelled),
            Err(Error::Cancelled)
        ));

        let mut seen = Vec::new();
        let mut handler: Option<Box<dyn FnMut(&str, &Error) -> ScanDecision + '_>> =
            Some(Box::new(|item: &str, _: &Error| {
                seen.push(item.to_string());
                ScanDecision::Abort
            }));
        assert_eq!(
            decide(&mut handler, "x", Error::Cancelled).unwrap(),
            ScanDecision::Abort
        );
        drop(handler);
        assert_eq!(seen, vec!["x"]);
    }
}
