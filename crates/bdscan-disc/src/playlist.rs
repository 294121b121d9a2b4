//! Movie playlist (`*.mpls`) files.
//!
//! A playlist is an ordered list of play items, each a window
//! `[IN_time, OUT_time]` into one clip, optionally with alternate angle clips
//! and a stream number table naming the streams a player may select. Entry
//! marks at the end of the file define chapters. All times are 45 kHz ticks.

use crate::catalog::Catalog;
use crate::clip::StreamClipFile;
use crate::reader::BinReader;
use crate::scan::ScanStatus;
use crate::stream::{read_coding_info, TsStream};
use crate::stream_file::StreamFile;
use crate::{Error, Result};
use bdscan_common::paths::{catalog_key, key_for_path};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TICKS_PER_SECOND: f64 = 45_000.0;
const APP_INFO_OFFSET: usize = 40;
const MARK_ENTRY_SIZE: usize = 14;
const ENTRY_MARK: u8 = 1;

const STREAM_SUFFIXES: [&str; 2] = ["M2TS", "MTS"];
const CLIP_SUFFIXES: [&str; 2] = ["CLPI", "CPI"];

/// One play item (or one angle of it) resolved against the disc catalogs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamClip {
    /// Stream file key, e.g. `00001.M2TS`
    pub name: String,
    /// Clip-info file key, e.g. `00001.CLPI`
    pub clip_file_name: String,
    /// Whether the stream file exists on the disc
    pub has_stream_file: bool,
    /// 0 for the main path, 1.. for alternate angles
    pub angle_index: u8,
    pub connection_condition: u8,
    /// Seconds on the clip's own clock
    pub time_in: f64,
    pub time_out: f64,
    pub length: f64,
    /// Seconds from the start of the playlist
    pub relative_time_in: f64,
    pub relative_time_out: f64,
    /// Chapter marks on the clip's own clock
    pub chapters: Vec<f64>,
    #[cfg_attr(feature = "serialize", serde(skip))]
    time_in_ticks: u32,
}

/// Validity rules applied by [`PlaylistFile::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaylistFilter {
    pub filter_short_playlists: bool,
    /// Seconds
    pub min_length: f64,
    pub filter_looping_playlists: bool,
}

impl Default for PlaylistFilter {
    fn default() -> Self {
        Self {
            filter_short_playlists: true,
            min_length: 20.0,
            filter_looping_playlists: true,
        }
    }
}

impl PlaylistFilter {
    /// Accept every initialized playlist.
    pub fn all() -> Self {
        Self {
            filter_short_playlists: false,
            min_length: 0.0,
            filter_looping_playlists: false,
        }
    }
}

/// A playlist file and, once scanned, its parsed structure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PlaylistFile {
    pub name: String,
    pub path: PathBuf,
    pub status: ScanStatus,
    pub file_type: Option<String>,
    /// 1 sequential, 2 random, 3 shuffle
    pub playback_type: u8,
    pub stream_clips: Vec<StreamClip>,
    /// Streams named by the STN tables of all play items
    pub playlist_streams: BTreeMap<u16, TsStream>,
    /// Chapter start times in seconds from the start of the playlist
    pub chapters: Vec<f64>,
    pub angle_count: u8,
    pub has_loops: bool,
    pub is_initialized: bool,
    /// Streams of the reference clip merged with stream-file measurements
    pub streams: BTreeMap<u16, TsStream>,
    /// Payload bytes measured inside this playlist's clip windows
    pub total_size: u64,
}

#[derive(Debug)]
struct ParsedPlaylist {
    file_type: String,
    playback_type: u8,
    stream_clips: Vec<StreamClip>,
    playlist_streams: BTreeMap<u16, TsStream>,
    chapters: Vec<f64>,
    angle_count: u8,
}

impl PlaylistFile {
    pub fn new(path: &Path) -> Self {
        Self {
            name: key_for_path(path).unwrap_or_default(),
            path: path.to_path_buf(),
            status: ScanStatus::Pending,
            file_type: None,
            playback_type: 0,
            stream_clips: Vec::new(),
            playlist_streams: BTreeMap::new(),
            chapters: Vec::new(),
            angle_count: 0,
            has_loops: false,
            is_initialized: false,
            streams: BTreeMap::new(),
            total_size: 0,
        }
    }

    /// Read and decode the file, resolving play items against the catalogs.
    ///
    /// A play item whose clip-info file is missing fails the playlist with
    /// [`Error::MissingClip`]; a missing stream file is only logged. On
    /// failure no clips, streams or chapters are kept.
    pub fn scan(
        &mut self,
        stream_files: &Catalog<StreamFile>,
        stream_clip_files: &Catalog<StreamClipFile>,
    ) -> Result<()> {
        self.is_initialized = false;
        let parsed = std::fs::read(&self.path)
            .map_err(Error::from)
            .and_then(|data| parse_playlist(&self.name, &data, stream_files, stream_clip_files));

        match parsed {
            Ok(parsed) => {
                debug!(
                    "Playlist {}: {} clips, {} chapters",
                    self.name,
                    parsed.stream_clips.len(),
                    parsed.chapters.len()
                );
                self.file_type = Some(parsed.file_type);
                self.playback_type = parsed.playback_type;
                self.stream_clips = parsed.stream_clips;
                self.playlist_streams = parsed.playlist_streams;
                self.chapters = parsed.chapters;
                self.angle_count = parsed.angle_count;
                self.status = ScanStatus::Scanned;
                Ok(())
            }
            Err(e) => {
                self.file_type = None;
                self.playback_type = 0;
                self.stream_clips.clear();
                self.playlist_streams.clear();
                self.chapters.clear();
                self.angle_count = 0;
                self.status = ScanStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Whether any clip of this playlist plays from stream file `name`.
    pub fn references_stream(&self, name: &str) -> bool {
        let key = catalog_key(name);
        self.stream_clips.iter().any(|c| c.name == key)
    }

    /// Main-path clips, in play order.
    pub fn main_clips(&self) -> impl Iterator<Item = &StreamClip> {
        self.stream_clips.iter().filter(|c| c.angle_index == 0)
    }

    /// Sum of the main-path clip lengths, in seconds.
    pub fn total_length(&self) -> f64 {
        self.main_clips().map(|c| c.length).sum()
    }

    /// Average bitrate over the playlist's clip windows, in bits per second.
    pub fn total_bit_rate(&self) -> u64 {
        let length = self.total_length();
        if length > 0.0 {
            (self.total_size as f64 * 8.0 / length).round() as u64
        } else {
            0
        }
    }

    /// Derive the merged stream list, loop flag and size.
    ///
    /// Does nothing for a playlist that did not scan successfully.
    pub fn initialize(
        &mut self,
        stream_clip_files: &Catalog<StreamClipFile>,
        stream_files: &Catalog<StreamFile>,
    ) {
        if !self.status.is_scanned() {
            return;
        }

        let has_loops = {
            let mut seen = HashSet::new();
            let looped = self
                .main_clips()
                .any(|c| !seen.insert((c.name.as_str(), c.time_in_ticks)));
            looped
        };
        self.has_loops = has_loops;

        let clip_stream_count = |clip: &StreamClip| {
            stream_clip_files
                .get(&clip.clip_file_name)
                .map(|f| f.streams.len())
                .unwrap_or(0)
        };

        let mut reference: Option<&StreamClip> = None;
        for clip in &self.stream_clips {
            reference = match reference {
                None => Some(clip),
                Some(current) => {
                    let count = clip_stream_count(clip);
                    let current_count = clip_stream_count(current);
                    if count > current_count && clip.relative_time_in == 0.0 {
                        Some(clip)
                    } else if clip.length > current.length && count == current_count {
                        Some(clip)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        let mut streams = BTreeMap::new();
        if let Some(reference) = reference {
            if let Some(clip_file) = stream_clip_files.get(&reference.clip_file_name) {
                streams = clip_file.streams.clone();
            }
            if let Some(stream_file) = stream_files.get(&reference.name) {
                for stream in streams.values_mut() {
                    if let Some(measured) = stream_file.streams.get(&stream.pid) {
                        stream.bit_rate = measured.bit_rate;
                        stream.payload_bytes = measured.payload_bytes;
                        stream.packet_count = measured.packet_count;
                        if stream.language.is_none() {
                            stream.language = measured.language.clone();
                        }
                    }
                }
            }
        }
        for (pid, stream) in &self.playlist_streams {
            let merged = streams.entry(*pid).or_insert_with(|| stream.clone());
            if merged.language.is_none() {
                merged.language = stream.language.clone();
            }
        }
        self.streams = streams;

        self.total_size = {
            let mut counted = HashSet::new();
            self.stream_clips
                .iter()
                .filter(|c| counted.insert(c.name.as_str()))
                .filter_map(|c| stream_files.get(&c.name))
                .filter_map(|f| f.playlist_payload.get(&self.name))
                .sum()
        };

        self.is_initialized = true;
    }

    /// Whether the playlist passes `filter`.
    pub fn is_valid(&self, filter: &PlaylistFilter) -> bool {
        self.is_initialized
            && !(filter.filter_short_playlists && self.total_length() < filter.min_length)
            && !(self.has_loops && filter.filter_looping_playlists)
    }
}

/// Catalog key of the first file named `base` with one of `suffixes`, falling
/// back to the first suffix when none exists.
fn resolve_key<T>(catalog: &Catalog<T>, base: &str, suffixes: &[&str]) -> (String, bool) {
    for suffix in suffixes {
        let key = catalog_key(&format!("{}.{}", base, suffix));
        if catalog.contains(&key) {
            return (key, true);
        }
    }
    (catalog_key(&format!("{}.{}", base, suffixes[0])), false)
}

struct ClipRef {
    name: String,
    clip_file_name: String,
    has_stream_file: bool,
}

fn resolve_clip(
    playlist: &str,
    base: &str,
    stream_files: &Catalog<StreamFile>,
    stream_clip_files: &Catalog<StreamClipFile>,
) -> Result<ClipRef> {
    let (clip_file_name, has_clip) = resolve_key(stream_clip_files, base, &CLIP_SUFFIXES);
    if !has_clip {
        return Err(Error::MissingClip {
            playlist: playlist.to_string(),
            clip: clip_file_name,
        });
    }
    let (name, has_stream_file) = resolve_key(stream_files, base, &STREAM_SUFFIXES);
    if !has_stream_file {
        warn!("Playlist {} referenced missing stream file {}", playlist, name);
    }
    Ok(ClipRef {
        name,
        clip_file_name,
        has_stream_file,
    })
}

fn parse_playlist(
    name: &str,
    data: &[u8],
    stream_files: &Catalog<StreamFile>,
    stream_clip_files: &Catalog<StreamClipFile>,
) -> Result<ParsedPlaylist> {
    let mut r = BinReader::new(name, data);

    let file_type = r.ascii(8)?;
    if !matches!(file_type.as_str(), "MPLS0100" | "MPLS0200" | "MPLS0300") {
        return Err(Error::UnknownFileType {
            file: name.to_string(),
            found: file_type,
        });
    }

    let playlist_at = r.address()?;
    let marks_at = r.address()?;

    r.seek(APP_INFO_OFFSET)?;
    let _length = r.u32()?;
    r.skip(1)?;
    let playback_type = r.u8()?;

    r.seek(playlist_at)?;
    let _length = r.u32()?;
    r.skip(2)?;
    let item_count = r.u16()?;
    let _subpath_count = r.u16()?;

    let mut stream_clips = Vec::new();
    let mut main_clips = Vec::new();
    let mut playlist_streams = BTreeMap::new();
    let mut angle_count = 0u8;
    let mut total_length = 0.0;

    for _ in 0..item_count {
        let item_start = r.pos();
        let item_length = r.u16()? as usize;

        let base = r.ascii(5)?;
        let _codec = r.ascii(4)?;
        let resolved = resolve_clip(name, &base, stream_files, stream_clip_files)?;

        r.skip(1)?;
        let flags = r.u8()?;
        let multi_angle = (flags >> 4) & 0x01 == 1;
        let connection_condition = flags & 0x0F;
        // ref_to_STC_id
        r.skip(1)?;

        let in_ticks = r.u32()? & 0x7FFF_FFFF;
        let out_ticks = r.u32()? & 0x7FFF_FFFF;
        let time_in = in_ticks as f64 / TICKS_PER_SECOND;
        let time_out = out_ticks as f64 / TICKS_PER_SECOND;
        let length = time_out - time_in;

        let clip = StreamClip {
            name: resolved.name,
            clip_file_name: resolved.clip_file_name,
            has_stream_file: resolved.has_stream_file,
            angle_index: 0,
            connection_condition,
            time_in,
            time_out,
            length,
            relative_time_in: total_length,
            relative_time_out: total_length + length,
            chapters: Vec::new(),
            time_in_ticks: in_ticks,
        };
        total_length += length;

        // UO mask, random access flag, still mode and time
        r.skip(12)?;

        main_clips.push(stream_clips.len());
        stream_clips.push(clip.clone());

        if multi_angle {
            let angles = r.u8()?;
            r.skip(1)?;
            for angle in 1..angles {
                let base = r.ascii(5)?;
                let _codec = r.ascii(4)?;
                r.skip(1)?;
                let resolved = resolve_clip(name, &base, stream_files, stream_clip_files)?;
                stream_clips.push(StreamClip {
                    name: resolved.name,
                    clip_file_name: resolved.clip_file_name,
                    has_stream_file: resolved.has_stream_file,
                    angle_index: angle,
                    ..clip.clone()
                });
            }
            angle_count = angle_count.max(angles.saturating_sub(1));
        }

        // STN table
        let _stn_length = r.u16()?;
        r.skip(2)?;
        let video = r.u8()?;
        let audio = r.u8()?;
        let pg = r.u8()?;
        let ig = r.u8()?;
        let secondary_audio = r.u8()?;
        let secondary_video = r.u8()?;
        let pip = r.u8()?;
        r.skip(5)?;

        for _ in 0..u16::from(video) + u16::from(audio) + u16::from(pg) + u16::from(ig) {
            if let Some(stream) = read_stn_entry(&mut r)? {
                playlist_streams.insert(stream.pid, stream);
            }
        }
        for _ in 0..secondary_audio {
            if let Some(stream) = read_stn_entry(&mut r)? {
                playlist_streams.insert(stream.pid, stream);
            }
            r.skip(2)?;
        }
        for _ in 0..secondary_video {
            if let Some(stream) = read_stn_entry(&mut r)? {
                playlist_streams.insert(stream.pid, stream);
            }
            r.skip(6)?;
        }
        if pip > 0 {
            debug!("Playlist {} has {} PIP streams, not decoded", name, pip);
        }

        r.seek(item_start + 2 + item_length)?;
    }

    let mut chapters = Vec::new();
    r.seek(marks_at)?;
    let _length = r.u32()?;
    let mark_count = r.u16()?;
    for _ in 0..mark_count {
        let mark_start = r.pos();
        r.skip(1)?;
        let mark_type = r.u8()?;
        let item = r.u16()? as usize;
        let ticks = r.u32()?;
        r.seek(mark_start + MARK_ENTRY_SIZE)?;

        if mark_type != ENTRY_MARK {
            continue;
        }
        let index = *main_clips.get(item).ok_or_else(|| {
            Error::invalid_data(name, format!("mark references play item {}", item))
        })?;
        let clip = &mut stream_clips[index];
        let seconds = ticks as f64 / TICKS_PER_SECOND;
        let relative = seconds - clip.time_in + clip.relative_time_in;
        if total_length - relative > 1.0 {
            clip.chapters.push(seconds);
            chapters.push(relative);
        }
    }

    Ok(ParsedPlaylist {
        file_type,
        playback_type,
        stream_clips,
        playlist_streams,
        chapters,
        angle_count,
    })
}

/// One STN stream entry: a stream_entry locating the PID followed by its
/// stream_attributes coding info.
fn read_stn_entry(r: &mut BinReader<'_>) -> Result<Option<TsStream>> {
    let header_length = r.u8()? as usize;
    let header_start = r.pos();
    let header_type = r.u8()?;
    let pid = match header_type {
        1 => r.u16()?,
        2 | 4 => {
            r.skip(2)?;
            r.u16()?
        }
        3 => {
            r.skip(1)?;
            r.u16()?
        }
        _ => 0,
    };
    r.seek(header_start + header_length)?;

    let attributes_length = r.u8()? as usize;
    let attributes_start = r.pos();
    let stream = read_coding_info(r, pid, false)?;
    r.seek(attributes_start + attributes_length)?;
    Ok(stream)
}
