//! Builders for synthetic disc files and layouts.
//!
//! Produces byte-exact CLPI, MPLS and M2TS files small enough to write into a
//! temporary directory. Used by the tests of this crate and of the `bdscan`
//! binary; enabled with the `fixtures` feature and not needed for scanning
//! real discs.

use crate::stream::StreamType;
use std::io;
use std::path::{Path, PathBuf};

/// Stream description shared by the clip, playlist and transport builders.
#[derive(Debug, Clone)]
pub struct FixtureStream {
    pub pid: u16,
    pub stream_type: StreamType,
    pub language: String,
    /// Video format nibble, or audio channel layout nibble
    pub format: u8,
    /// Frame rate nibble, or audio sample rate nibble
    pub rate: u8,
}

impl FixtureStream {
    /// AVC 1080p at 23.976 fps.
    pub fn video(pid: u16) -> Self {
        Self {
            pid,
            stream_type: StreamType::AvcVideo,
            language: String::new(),
            format: 6,
            rate: 1,
        }
    }

    pub fn video_with(pid: u16, stream_type: StreamType, format: u8, rate: u8) -> Self {
        Self {
            pid,
            stream_type,
            language: String::new(),
            format,
            rate,
        }
    }

    /// Multichannel 48 kHz audio.
    pub fn audio(pid: u16, stream_type: StreamType, language: &str) -> Self {
        Self {
            pid,
            stream_type,
            language: language.to_string(),
            format: 6,
            rate: 1,
        }
    }

    pub fn graphics(pid: u16, language: &str) -> Self {
        Self {
            pid,
            stream_type: StreamType::PresentationGraphics,
            language: language.to_string(),
            format: 0,
            rate: 0,
        }
    }

    fn language_bytes(&self) -> [u8; 3] {
        let mut out = [b' '; 3];
        for (dst, src) in out.iter_mut().zip(self.language.bytes()) {
            *dst = src;
        }
        out
    }

    /// Coding info starting at the coding type byte.
    fn coding_info(&self, with_aspect: bool) -> Vec<u8> {
        let t = self.stream_type;
        let mut out = vec![t.code()];
        match t {
            StreamType::MvcVideo => {}
            t if t.is_video() => {
                out.push((self.format << 4) | (self.rate & 0x0F));
                if with_aspect {
                    out.push(0x30);
                }
            }
            t if t.is_audio() => {
                out.push((self.format << 4) | (self.rate & 0x0F));
                out.extend_from_slice(&self.language_bytes());
            }
            t if t.is_graphics() => out.extend_from_slice(&self.language_bytes()),
            t if t.is_text() => {
                out.push(0x01);
                out.extend_from_slice(&self.language_bytes());
            }
            _ => {}
        }
        out
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn patch_u32(out: &mut [u8], at: usize, v: u32) {
    out[at..at + 4].copy_from_slice(&v.to_be_bytes());
}

fn pad_to(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
    if bytes.len() < len {
        bytes.resize(len, 0);
    }
    bytes
}

/// Clip-info file builder.
#[derive(Debug, Clone)]
pub struct ClipBuilder {
    file_type: [u8; 8],
    streams: Vec<FixtureStream>,
    presentation: (u32, u32),
    source_packets: u32,
}

impl Default for ClipBuilder {
    fn default() -> Self {
        Self {
            file_type: *b"HDMV0200",
            streams: Vec::new(),
            presentation: (0, 45_000 * 10),
            source_packets: 0,
        }
    }
}

impl ClipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, stream: FixtureStream) -> Self {
        self.streams.push(stream);
        self
    }

    /// Presentation window of the single STC sequence, 45 kHz ticks.
    pub fn presentation(mut self, start: u32, end: u32) -> Self {
        self.presentation = (start, end);
        self
    }

    pub fn source_packets(mut self, count: u32) -> Self {
        self.source_packets = count;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 40];
        out[..8].copy_from_slice(&self.file_type);

        // ClipInfo
        put_u32(&mut out, 16);
        put_u16(&mut out, 0);
        out.push(1);
        out.push(1);
        put_u32(&mut out, 0);
        put_u32(&mut out, 6_000_000);
        put_u32(&mut out, self.source_packets);

        let sequence_at = out.len();
        let mut seq = vec![0u8, 1];
        put_u32(&mut seq, 0);
        seq.extend_from_slice(&[1, 0]);
        put_u16(&mut seq, 0x1001);
        put_u32(&mut seq, 0);
        put_u32(&mut seq, self.presentation.0);
        put_u32(&mut seq, self.presentation.1);
        put_u32(&mut out, seq.len() as u32);
        out.extend_from_slice(&seq);

        let program_at = out.len();
        let mut prog = vec![0u8, 1];
        put_u32(&mut prog, 0);
        put_u16(&mut prog, 0x0100);
        prog.push(self.streams.len() as u8);
        prog.push(0);
        for stream in &self.streams {
            put_u16(&mut prog, stream.pid);
            let info = pad_to(stream.coding_info(true), 21);
            prog.push(info.len() as u8);
            prog.extend_from_slice(&info);
        }
        put_u32(&mut out, prog.len() as u32);
        out.extend_from_slice(&prog);

        patch_u32(&mut out, 8, sequence_at as u32);
        patch_u32(&mut out, 12, program_at as u32);
        out
    }
}

/// One play item of a [`PlaylistBuilder`].
#[derive(Debug, Clone)]
pub struct FixturePlayItem {
    pub clip: String,
    pub in_time: u32,
    pub out_time: u32,
    pub angles: Vec<String>,
    pub streams: Vec<FixtureStream>,
}

impl FixturePlayItem {
    /// Times in 45 kHz ticks.
    pub fn new(clip: &str, in_time: u32, out_time: u32) -> Self {
        Self {
            clip: clip.to_string(),
            in_time,
            out_time,
            angles: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub fn stream(mut self, stream: FixtureStream) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn angle(mut self, clip: &str) -> Self {
        self.angles.push(clip.to_string());
        self
    }
}

/// Playlist file builder.
#[derive(Debug, Clone)]
pub struct PlaylistBuilder {
    file_type: [u8; 8],
    items: Vec<FixturePlayItem>,
    marks: Vec<(u16, u32)>,
}

impl Default for PlaylistBuilder {
    fn default() -> Self {
        Self {
            file_type: *b"MPLS0200",
            items: Vec::new(),
            marks: Vec::new(),
        }
    }
}

impl PlaylistBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item: FixturePlayItem) -> Self {
        self.items.push(item);
        self
    }

    /// Entry mark on play item `item` at `time` (45 kHz ticks, clip clock).
    pub fn mark(mut self, item: u16, time: u32) -> Self {
        self.marks.push((item, time));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 40];
        out[..8].copy_from_slice(&self.file_type);

        // AppInfoPlayList, sequential playback
        put_u32(&mut out, 14);
        out.push(0);
        out.push(1);
        out.extend_from_slice(&[0u8; 12]);

        let playlist_at = out.len();
        let mut body = Vec::new();
        put_u16(&mut body, 0);
        put_u16(&mut body, self.items.len() as u16);
        put_u16(&mut body, 0);
        for item in &self.items {
            let item_bytes = Self::play_item(item);
            put_u16(&mut body, item_bytes.len() as u16);
            body.extend_from_slice(&item_bytes);
        }
        put_u32(&mut out, body.len() as u32);
        out.extend_from_slice(&body);

        let marks_at = out.len();
        let mut marks = Vec::new();
        put_u16(&mut marks, self.marks.len() as u16);
        for (item, time) in &self.marks {
            marks.push(0);
            marks.push(1);
            put_u16(&mut marks, *item);
            put_u32(&mut marks, *time);
            put_u16(&mut marks, 0xFFFF);
            put_u32(&mut marks, 0);
        }
        put_u32(&mut out, marks.len() as u32);
        out.extend_from_slice(&marks);

        patch_u32(&mut out, 8, playlist_at as u32);
        patch_u32(&mut out, 12, marks_at as u32);
        out
    }

    fn play_item(item: &FixturePlayItem) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(item.clip.as_bytes());
        out.extend_from_slice(b"M2TS");
        let multi_angle = !item.angles.is_empty();
        out.push(0);
        out.push(if multi_angle { 0x11 } else { 0x01 });
        out.push(0);
        put_u32(&mut out, item.in_time);
        put_u32(&mut out, item.out_time);
        out.extend_from_slice(&[0u8; 12]);

        if multi_angle {
            out.push(item.angles.len() as u8 + 1);
            out.push(0);
            for angle in &item.angles {
                out.extend_from_slice(angle.as_bytes());
                out.extend_from_slice(b"M2TS");
                out.push(0);
            }
        }

        let count = |pred: fn(&StreamType) -> bool| {
            item.streams.iter().filter(|s| pred(&s.stream_type)).count() as u8
        };
        let mut stn = vec![0u8, 0];
        stn.push(count(StreamType::is_video));
        stn.push(count(StreamType::is_audio));
        stn.push(count(|t| *t == StreamType::PresentationGraphics));
        stn.push(count(|t| *t == StreamType::InteractiveGraphics));
        stn.extend_from_slice(&[0u8; 3]);
        stn.extend_from_slice(&[0u8; 5]);

        let groups: [fn(&StreamType) -> bool; 4] = [
            StreamType::is_video,
            StreamType::is_audio,
            |t| *t == StreamType::PresentationGraphics,
            |t| *t == StreamType::InteractiveGraphics,
        ];
        for group in groups {
            for stream in item.streams.iter().filter(|s| group(&s.stream_type)) {
                // stream_entry: type 1 (play item), PID
                stn.push(9);
                stn.push(1);
                put_u16(&mut stn, stream.pid);
                stn.extend_from_slice(&[0u8; 6]);
                let attrs = pad_to(stream.coding_info(false), 5);
                stn.push(attrs.len() as u8);
                stn.extend_from_slice(&attrs);
            }
        }
        put_u16(&mut out, stn.len() as u16);
        out.extend_from_slice(&stn);
        out
    }
}

/// Transport stream (`.m2ts`) builder with 192-byte source packets.
#[derive(Debug, Clone)]
pub struct TsBuilder {
    streams: Vec<(u16, StreamType, Option<String>)>,
    span: (f64, f64),
    frames: usize,
}

impl Default for TsBuilder {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            span: (0.0, 10.0),
            frames: 2,
        }
    }
}

impl TsBuilder {
    pub const PMT_PID: u16 = 0x0100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, pid: u16, stream_type: StreamType, language: Option<&str>) -> Self {
        self.streams
            .push((pid, stream_type, language.map(str::to_string)));
        self
    }

    /// First and last PTS, in seconds.
    pub fn span(mut self, start: f64, end: f64) -> Self {
        self.span = (start, end);
        self
    }

    /// Number of PES packets per stream, evenly spread over the span.
    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = frames.max(1);
        self
    }

    /// Total packets [`build`](Self::build) will emit.
    pub fn packet_count(&self) -> usize {
        2 + self.frames * self.streams.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cc = std::collections::HashMap::<u16, u8>::new();
        let mut packet = |out: &mut Vec<u8>, pid: u16, pusi: bool, payload: &[u8]| {
            let counter = cc.entry(pid).or_insert(0);
            out.extend_from_slice(&[0, 0, 0, 0]);
            out.push(0x47);
            out.push(((pusi as u8) << 6) | ((pid >> 8) as u8 & 0x1F));
            out.push(pid as u8);
            out.push(0x10 | (*counter & 0x0F));
            *counter = counter.wrapping_add(1);
            let mut body = payload.to_vec();
            body.resize(184, 0xFF);
            out.extend_from_slice(&body);
        };

        // PAT: program 1 -> PMT PID
        let mut pat = vec![0u8, 0x00, 0xB0, 13, 0x00, 0x01, 0xC1, 0, 0, 0x00, 0x01];
        pat.push(0xE0 | (Self::PMT_PID >> 8) as u8);
        pat.push(Self::PMT_PID as u8);
        pat.extend_from_slice(&[0u8; 4]);
        packet(&mut out, 0, true, &pat);

        let mut entries = Vec::new();
        for (pid, stream_type, language) in &self.streams {
            entries.push(stream_type.code());
            entries.push(0xE0 | (pid >> 8) as u8);
            entries.push(*pid as u8);
            match language {
                Some(lang) => {
                    entries.extend_from_slice(&[0xF0, 6, 0x0A, 4]);
                    let mut code = [b' '; 3];
                    for (dst, src) in code.iter_mut().zip(lang.bytes()) {
                        *dst = src;
                    }
                    entries.extend_from_slice(&code);
                    entries.push(0);
                }
                None => entries.extend_from_slice(&[0xF0, 0]),
            }
        }
        let section_length = 9 + entries.len() + 4;
        let mut pmt = vec![
            0u8,
            0x02,
            0xB0 | (section_length >> 8) as u8,
            section_length as u8,
            0x00,
            0x01,
            0xC1,
            0,
            0,
            0xF0,
            0x11,
            0xF0,
            0x00,
        ];
        pmt.extend_from_slice(&entries);
        pmt.extend_from_slice(&[0u8; 4]);
        packet(&mut out, Self::PMT_PID, true, &pmt);

        let (start, end) = self.span;
        for frame in 0..self.frames {
            let t = if self.frames == 1 {
                start
            } else {
                start + (end - start) * frame as f64 / (self.frames - 1) as f64
            };
            let pts = (t * 90_000.0).round() as u64;
            for (pid, stream_type, _) in &self.streams {
                let stream_id = if stream_type.is_video() { 0xE0 } else { 0xBD };
                let pes = [
                    0x00,
                    0x00,
                    0x01,
                    stream_id,
                    0x00,
                    0x00,
                    0x80,
                    0x80,
                    0x05,
                    0x21 | ((pts >> 29) as u8 & 0x0E),
                    (pts >> 22) as u8,
                    ((pts >> 14) as u8 & 0xFE) | 0x01,
                    (pts >> 7) as u8,
                    ((pts << 1) as u8 & 0xFE) | 0x01,
                ];
                packet(&mut out, *pid, true, &pes);
            }
        }
        out
    }
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

/// Clip-info bytes for clip `00001`: AVC video and English AC-3, 10s to 70s.
pub fn sample_clip() -> Vec<u8> {
    ClipBuilder::new()
        .stream(FixtureStream::video(0x1011))
        .stream(FixtureStream::audio(0x1100, StreamType::Ac3Audio, "eng"))
        .presentation(45_000 * 10, 45_000 * 70)
        .source_packets(8)
        .build()
}

/// Playlist bytes playing `clip` from 10s to 70s, with chapters at 10s and 40s.
pub fn sample_playlist(clip: &str) -> Vec<u8> {
    PlaylistBuilder::new()
        .item(
            FixturePlayItem::new(clip, 45_000 * 10, 45_000 * 70)
                .stream(FixtureStream::video(0x1011))
                .stream(FixtureStream::audio(0x1100, StreamType::Ac3Audio, "eng")),
        )
        .mark(0, 45_000 * 10)
        .mark(0, 45_000 * 40)
        .build()
}

/// Transport stream bytes matching [`sample_clip`].
pub fn sample_stream() -> Vec<u8> {
    TsBuilder::new()
        .stream(0x1011, StreamType::AvcVideo, None)
        .stream(0x1100, StreamType::Ac3Audio, Some("eng"))
        .span(10.0, 70.0)
        .frames(3)
        .build()
}

/// Write the smallest complete disc under `root` and return its `BDMV` path.
///
/// ```text
/// BDMV/CLIPINF/00001.clpi
/// BDMV/PLAYLIST/00000.mpls
/// BDMV/STREAM/00001.m2ts
/// ```
pub fn write_minimal_disc(root: &Path) -> io::Result<PathBuf> {
    let bdmv = root.join("BDMV");
    write_file(&bdmv.join("CLIPINF/00001.clpi"), &sample_clip())?;
    write_file(&bdmv.join("PLAYLIST/00000.mpls"), &sample_playlist("00001"))?;
    write_file(&bdmv.join("STREAM/00001.m2ts"), &sample_stream())?;
    Ok(bdmv)
}
