//! Clip-info (`*.clpi`) files.
//!
//! Layout, all fields big-endian:
//!
//! | Offset | Field |
//! | --- | --- |
//! | 0 | type indicator `HDMV` + version (`0100`/`0200`/`0300`) |
//! | 8 | SequenceInfo start address |
//! | 12 | ProgramInfo start address |
//! | 40 | ClipInfo block |
//!
//! SequenceInfo gives the STC sequences and their presentation windows (45 kHz
//! clock); ProgramInfo gives the elementary streams of the clip.

use crate::reader::BinReader;
use crate::scan::ScanStatus;
use crate::stream::{read_coding_info, TsStream};
use crate::{Error, Result};
use bdscan_common::paths::key_for_path;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const CLIP_INFO_OFFSET: usize = 40;

/// Fixed fields of the ClipInfo block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ClipInfo {
    pub clip_stream_type: u8,
    pub application_type: u8,
    /// Transport stream recording rate in bytes per second
    pub ts_recording_rate: u32,
    pub source_packet_count: u32,
}

impl ClipInfo {
    /// Expected size of the matching `.m2ts`, in bytes.
    pub fn expected_stream_size(&self) -> u64 {
        self.source_packet_count as u64 * 192
    }
}

/// A clip-info file and, once scanned, its parsed metadata.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamClipFile {
    pub name: String,
    pub path: PathBuf,
    pub status: ScanStatus,
    pub file_type: Option<String>,
    pub clip_info: Option<ClipInfo>,
    /// Summed presentation time of all STC sequences, in seconds
    pub duration: Option<f64>,
    pub streams: BTreeMap<u16, TsStream>,
}

#[derive(Debug)]
struct ParsedClip {
    file_type: String,
    clip_info: ClipInfo,
    duration: Option<f64>,
    streams: BTreeMap<u16, TsStream>,
}

impl StreamClipFile {
    pub fn new(path: &Path) -> Self {
        Self {
            name: key_for_path(path).unwrap_or_default(),
            path: path.to_path_buf(),
            status: ScanStatus::Pending,
            file_type: None,
            clip_info: None,
            duration: None,
            streams: BTreeMap::new(),
        }
    }

    /// Read and decode the file.
    ///
    /// Parsed fields are only replaced when decoding succeeds. On failure the
    /// clip is marked [`ScanStatus::Failed`] with its metadata left empty.
    pub fn scan(&mut self) -> Result<()> {
        let parsed = std::fs::read(&self.path)
            .map_err(Error::from)
            .and_then(|data| parse_clip(&self.name, &data));

        match parsed {
            Ok(parsed) => {
                debug!(
                    "Clip {}: {} streams, {:?}s",
                    self.name,
                    parsed.streams.len(),
                    parsed.duration
                );
                self.file_type = Some(parsed.file_type);
                self.clip_info = Some(parsed.clip_info);
                self.duration = parsed.duration;
                self.streams = parsed.streams;
                self.status = ScanStatus::Scanned;
                Ok(())
            }
            Err(e) => {
                self.file_type = None;
                self.clip_info = None;
                self.duration = None;
                self.streams.clear();
                self.status = ScanStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_scanned()
    }
}

fn parse_clip(name: &str, data: &[u8]) -> Result<ParsedClip> {
    let mut r = BinReader::new(name, data);

    let file_type = r.ascii(8)?;
    if !matches!(file_type.as_str(), "HDMV0100" | "HDMV0200" | "HDMV0300") {
        return Err(Error::UnknownFileType {
            file: name.to_string(),
            found: file_type,
        });
    }

    let sequence_info_at = r.address()?;
    let program_info_at = r.address()?;

    r.seek(CLIP_INFO_OFFSET)?;
    let _length = r.u32()?;
    r.skip(2)?;
    let clip_stream_type = r.u8()?;
    let application_type = r.u8()?;
    r.skip(4)?;
    let clip_info = ClipInfo {
        clip_stream_type,
        application_type,
        ts_recording_rate: r.u32()?,
        source_packet_count: r.u32()?,
    };

    let duration = if sequence_info_at == 0 {
        None
    } else {
        Some(parse_sequence_info(&mut r, sequence_info_at)?)
    };

    let streams = parse_program_info(name, data, program_info_at)?;

    Ok(ParsedClip {
        file_type,
        clip_info,
        duration,
        streams,
    })
}

fn parse_sequence_info(r: &mut BinReader<'_>, at: usize) -> Result<f64> {
    r.seek(at)?;
    let _length = r.u32()?;
    r.skip(1)?;
    let atc_count = r.u8()?;

    let mut ticks = 0u64;
    for _ in 0..atc_count {
        // SPN_ATC_start
        r.skip(4)?;
        let stc_count = r.u8()?;
        // offset_STC_id
        r.skip(1)?;
        for _ in 0..stc_count {
            // PCR_PID + SPN_STC_start
            r.skip(6)?;
            let start = r.u32()?;
            let end = r.u32()?;
            ticks += end.saturating_sub(start) as u64;
        }
    }

    Ok(ticks as f64 / 45_000.0)
}

fn parse_program_info(name: &str, data: &[u8], at: usize) -> Result<BTreeMap<u16, TsStream>> {
    let mut r = BinReader::new(name, data);
    r.seek(at)?;
    let length = r.u32()? as usize;
    let start = r.pos();
    if data.len() - start < length {
        return Err(Error::Truncated {
            file: name.to_string(),
            offset: start,
            need: length,
            have: data.len() - start,
        });
    }

    let mut p = BinReader::new(name, &data[start..start + length]);
    let mut streams = BTreeMap::new();

    p.skip(1)?;
    let program_count = p.u8()?;
    if program_count == 0 {
        return Ok(streams);
    }

    // Only the first program sequence is described; later ones repeat it.
    // SPN_program_sequence_start + program_map_PID
    p.skip(6)?;
    let stream_count = p.u8()?;
    p.skip(1)?;

    for _ in 0..stream_count {
        let pid = p.u16()?;
        let info_length = p.u8()? as usize;
        let info_start = p.pos();
        if let Some(stream) = read_coding_info(&mut p, pid, true)? {
            streams.insert(pid, stream);
        }
        p.seek(info_start + info_length)?;
    }

    Ok(streams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ClipBuilder, FixtureStream};
    use crate::stream::{StreamAttributes, StreamType};
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_clip_streams_and_duration() {
        let data = ClipBuilder::new()
            .stream(FixtureStream::video(0x1011))
            .stream(FixtureStream::audio(0x1100, StreamType::DtsHdMasterAudio, "eng"))
            .stream(FixtureStream::graphics(0x1200, "deu"))
            .presentation(45_000, 45_000 * 61)
            .source_packets(1000)
            .build();

        let parsed = parse_clip("00001.CLPI", &data).unwrap();
        assert_eq!(parsed.file_type, "HDMV0200");
        assert_eq!(parsed.duration, Some(60.0));
        assert_eq!(parsed.clip_info.source_packet_count, 1000);
        assert_eq!(parsed.clip_info.expected_stream_size(), 192_000);
        assert_eq!(parsed.streams.len(), 3);

        let audio = &parsed.streams[&0x1100];
        assert_eq!(audio.stream_type, StreamType::DtsHdMasterAudio);
        assert_eq!(audio.language.as_deref(), Some("eng"));

        let pg = &parsed.streams[&0x1200];
        assert_eq!(pg.attributes, StreamAttributes::Graphics);
        assert_eq!(pg.language.as_deref(), Some("deu"));
    }

    #[test]
    fn test_unknown_file_type() {
        let mut data = ClipBuilder::new().build();
        data[..8].copy_from_slice(b"MPLS0200");
        assert_matches!(
            parse_clip("00001.CLPI", &data),
            Err(Error::UnknownFileType { found, .. }) if found == "MPLS0200"
        );
    }

    #[test]
    fn test_truncated_input_never_panics() {
        let data = ClipBuilder::new()
            .stream(FixtureStream::video(0x1011))
            .stream(FixtureStream::audio(0x1100, StreamType::Ac3Audio, "eng"))
            .build();
        for len in 0..data.len() {
            assert!(parse_clip("00001.CLPI", &data[..len]).is_err(), "len {}", len);
        }
        assert!(parse_clip("00001.CLPI", &data).is_ok());
    }

    #[test]
    fn test_scan_failure_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00001.clpi");
        std::fs::write(&path, ClipBuilder::new().stream(FixtureStream::video(0x1011)).build())
            .unwrap();

        let mut clip = StreamClipFile::new(&path);
        assert_eq!(clip.name, "00001.CLPI");
        clip.scan().unwrap();
        assert!(clip.is_valid());
        assert_eq!(clip.streams.len(), 1);

        std::fs::write(&path, b"").unwrap();
        assert!(clip.scan().is_err());
        assert!(clip.status.is_failed());
        assert!(clip.streams.is_empty());
        assert!(clip.clip_info.is_none());
    }
}
