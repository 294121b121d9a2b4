//! Transport stream (`*.m2ts`) and interleaved 3D (`*.ssif`) files.

use crate::catalog::Catalog;
use crate::playlist::PlaylistFile;
use crate::scan::ScanStatus;
use crate::stream::TsStream;
use crate::ts::{scan_transport_stream, ClipWindow};
use crate::{Error, Result};
use bdscan_common::paths::{catalog_key, key_for_path};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An interleaved stereoscopic file under `BDMV/STREAM/SSIF`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct InterleavedFile {
    pub name: String,
    pub path: PathBuf,
}

impl InterleavedFile {
    pub fn new(path: &Path) -> Self {
        Self {
            name: key_for_path(path).unwrap_or_default(),
            path: path.to_path_buf(),
        }
    }
}

/// A transport stream file and, once scanned, its measured streams.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamFile {
    pub name: String,
    pub path: PathBuf,
    pub status: ScanStatus,
    /// Catalog key of the linked interleaved file
    pub interleaved_file: Option<String>,
    #[cfg_attr(feature = "serialize", serde(skip))]
    interleaved_path: Option<PathBuf>,
    /// Stop reading after this many bytes
    pub scan_limit: Option<u64>,
    /// Whether the last scan read the interleaved file
    pub interleaved_scan: bool,
    pub streams: BTreeMap<u16, TsStream>,
    /// Seconds
    pub length: f64,
    pub packet_count: u64,
    pub bytes_read: u64,
    /// Names of the playlists that reference this file
    pub playlists: Vec<String>,
    /// Source packet bytes inside each referencing playlist's clip windows
    pub playlist_payload: BTreeMap<String, u64>,
}

impl StreamFile {
    pub fn new(path: &Path) -> Self {
        Self {
            name: key_for_path(path).unwrap_or_default(),
            path: path.to_path_buf(),
            status: ScanStatus::Pending,
            interleaved_file: None,
            interleaved_path: None,
            scan_limit: None,
            interleaved_scan: false,
            streams: BTreeMap::new(),
            length: 0.0,
            packet_count: 0,
            bytes_read: 0,
            playlists: Vec::new(),
            playlist_payload: BTreeMap::new(),
        }
    }

    /// On-disk size in bytes, if the file can be queried.
    pub fn file_size(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    pub fn link_interleaved(&mut self, file: &InterleavedFile) {
        self.interleaved_file = Some(file.name.clone());
        self.interleaved_path = Some(file.path.clone());
    }

    /// The linked interleaved file, looked up in `catalog`.
    pub fn interleaved<'c>(
        &self,
        catalog: &'c Catalog<InterleavedFile>,
    ) -> Option<&'c InterleavedFile> {
        self.interleaved_file.as_deref().and_then(|name| catalog.get(name))
    }

    /// Scan the transport stream, attributing payload to `playlists`.
    ///
    /// With `is_interleaved` and a linked interleaved file, that file is read
    /// in place of this one. Results are only replaced on success.
    pub fn scan(&mut self, playlists: &[&PlaylistFile], is_interleaved: bool) -> Result<()> {
        let mut windows = Vec::new();
        let mut names = Vec::new();
        for playlist in playlists {
            let mut referenced = false;
            for clip in playlist.stream_clips.iter().filter(|c| c.name == self.name) {
                referenced = true;
                windows.push(ClipWindow {
                    playlist: catalog_key(&playlist.name),
                    time_in: clip.time_in,
                    time_out: clip.time_out,
                });
            }
            if referenced {
                names.push(playlist.name.clone());
            }
        }

        let source = match (is_interleaved, &self.interleaved_path) {
            (true, Some(path)) => path.clone(),
            _ => self.path.clone(),
        };
        let interleaved_scan = source != self.path;
        debug!("Scanning {:?} for {} playlists", source, names.len());

        let result = File::open(&source)
            .map_err(Error::from)
            .and_then(|f| {
                scan_transport_stream(&self.name, BufReader::new(f), self.scan_limit, &windows)
            });

        match result {
            Ok(result) => {
                self.streams = result.streams;
                self.length = result.length;
                self.packet_count = result.packet_count;
                self.bytes_read = result.bytes_read;
                self.playlist_payload = result.playlist_payload;
                self.playlists = names;
                self.interleaved_scan = interleaved_scan;
                self.status = ScanStatus::Scanned;
                Ok(())
            }
            Err(e) => {
                self.streams.clear();
                self.length = 0.0;
                self.packet_count = 0;
                self.bytes_read = 0;
                self.playlist_payload.clear();
                self.playlists = names;
                self.interleaved_scan = false;
                self.status = ScanStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Average bitrate across all packets, in bits per second.
    pub fn bit_rate(&self) -> u64 {
        if self.length > 0.0 {
            (self.packet_count as f64 * 192.0 * 8.0 / self.length).round() as u64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_stream, write_file};
    use crate::stream::StreamType;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_scan_without_playlists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00001.m2ts");
        write_file(&path, &sample_stream()).unwrap();

        let mut file = StreamFile::new(&path);
        assert_eq!(file.name, "00001.M2TS");
        assert_eq!(file.file_size(), Some(sample_stream().len() as u64));

        file.scan(&[], false).unwrap();
        assert!(file.status.is_scanned());
        assert_eq!(file.streams[&0x1011].stream_type, StreamType::AvcVideo);
        assert!((file.length - 60.0).abs() < 1e-6);
        assert!(file.bit_rate() > 0);
        assert!(file.playlists.is_empty());
    }

    #[test]
    fn test_interleaved_file_is_read_when_requested() {
        let dir = tempdir().unwrap();
        let m2ts = dir.path().join("00001.m2ts");
        let ssif = dir.path().join("SSIF/00001.ssif");
        write_file(&m2ts, b"not a transport stream").unwrap();
        write_file(&ssif, &sample_stream()).unwrap();

        let mut file = StreamFile::new(&m2ts);
        let interleaved = InterleavedFile::new(&ssif);
        file.link_interleaved(&interleaved);

        let mut catalog = Catalog::new();
        catalog.insert(&interleaved.name, interleaved.clone());
        assert_eq!(file.interleaved(&catalog), Some(&interleaved));

        assert_matches!(file.scan(&[], false), Err(Error::NoTransportPackets(_)));
        assert!(file.status.is_failed());

        file.scan(&[], true).unwrap();
        assert!(file.interleaved_scan);
        assert_eq!(file.streams.len(), 2);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        let mut file = StreamFile::new(&dir.path().join("00009.m2ts"));
        assert_eq!(file.file_size(), None);
        assert_matches!(file.scan(&[], false), Err(Error::Io(_)));
    }
}
