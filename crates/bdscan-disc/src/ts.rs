//! BDAV transport stream packet scanner.
//!
//! Stream files are sequences of 192-byte source packets: a 4-byte
//! arrival timestamp header followed by a 188-byte MPEG-2 transport packet
//! starting with sync byte `0x47`. The scanner follows the PAT to the PMTs,
//! counts payload per elementary PID, and tracks PES presentation timestamps
//! to measure duration and attribute bytes to playlist clip windows.

use crate::stream::{StreamType, TsStream};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use tracing::{debug, trace};

pub(crate) const SOURCE_PACKET_SIZE: usize = 192;
const TS_PACKET_SIZE: usize = 188;
const TS_HEADER_OFFSET: usize = 4;
const SYNC_BYTE: u8 = 0x47;
const PAT_PID: u16 = 0x0000;
const PTS_CLOCK: f64 = 90_000.0;
const PTS_WRAP: u64 = 1 << 33;
const ISO_639_LANGUAGE_DESCRIPTOR: u8 = 0x0A;
const READ_CHUNK: usize = SOURCE_PACKET_SIZE * 1024;

/// A playlist clip window over one stream file, in seconds of PTS time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClipWindow {
    pub playlist: String,
    pub time_in: f64,
    pub time_out: f64,
}

#[derive(Debug, Default)]
pub(crate) struct TsScanResult {
    pub streams: BTreeMap<u16, TsStream>,
    /// Longest PTS span of any stream, in seconds
    pub length: f64,
    pub packet_count: u64,
    pub bytes_read: u64,
    /// Bytes skipped while hunting for packet sync
    pub resync_bytes: u64,
    /// Source packet bytes inside each playlist's clip windows
    pub playlist_payload: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct PtsRange {
    first: Option<u64>,
    last: u64,
}

impl PtsRange {
    fn update(&mut self, pts: u64) {
        if self.first.is_none() {
            self.first = Some(pts);
        }
        self.last = pts;
    }

    fn seconds(&self) -> f64 {
        match self.first {
            Some(first) => {
                let span = if self.last >= first {
                    self.last - first
                } else {
                    self.last + PTS_WRAP - first
                };
                span as f64 / PTS_CLOCK
            }
            None => 0.0,
        }
    }
}

struct Scanner<'w> {
    name: String,
    windows: &'w [ClipWindow],
    pmt_pids: HashSet<u16>,
    sections: HashMap<u16, Vec<u8>>,
    streams: BTreeMap<u16, TsStream>,
    pts: HashMap<u16, PtsRange>,
    clock: Option<f64>,
    packet_count: u64,
    playlist_payload: BTreeMap<String, u64>,
}

impl<'w> Scanner<'w> {
    fn new(name: &str, windows: &'w [ClipWindow]) -> Self {
        Self {
            name: name.to_string(),
            windows,
            pmt_pids: HashSet::new(),
            sections: HashMap::new(),
            streams: BTreeMap::new(),
            pts: HashMap::new(),
            clock: None,
            packet_count: 0,
            playlist_payload: BTreeMap::new(),
        }
    }

    fn packet(&mut self, packet: &[u8]) {
        self.packet_count += 1;

        let pid = (u16::from(packet[1] & 0x1F) << 8) | u16::from(packet[2]);
        let unit_start = packet[1] & 0x40 != 0;
        let adaptation = (packet[3] >> 4) & 0x03;

        let mut offset = 4;
        if adaptation & 0x02 != 0 {
            offset += 1 + packet[4] as usize;
        }
        let payload = if adaptation & 0x01 != 0 && offset < TS_PACKET_SIZE {
            &packet[offset..]
        } else {
            &[][..]
        };

        if pid == PAT_PID || self.pmt_pids.contains(&pid) {
            self.section_data(pid, unit_start, payload);
        } else if self.streams.contains_key(&pid) {
            self.elementary_data(pid, unit_start, payload);
        }

        if let Some(clock) = self.clock {
            for window in self.windows {
                if clock >= window.time_in && clock <= window.time_out {
                    *self
                        .playlist_payload
                        .entry(window.playlist.clone())
                        .or_insert(0) += SOURCE_PACKET_SIZE as u64;
                }
            }
        }
    }

    fn elementary_data(&mut self, pid: u16, unit_start: bool, payload: &[u8]) {
        if let Some(stream) = self.streams.get_mut(&pid) {
            stream.packet_count += 1;
            stream.payload_bytes += payload.len() as u64;
        }
        if !unit_start {
            return;
        }
        if let Some(pts) = parse_pes_pts(payload) {
            self.pts.entry(pid).or_default().update(pts);
            self.clock = Some(pts as f64 / PTS_CLOCK);
        }
    }

    fn section_data(&mut self, pid: u16, unit_start: bool, payload: &[u8]) {
        let mut complete = Vec::new();
        {
            let buffer = self.sections.entry(pid).or_default();
            if unit_start {
                let Some(&pointer) = payload.first() else {
                    return;
                };
                let rest = &payload[1..];
                let split = (pointer as usize).min(rest.len());
                if !buffer.is_empty() {
                    buffer.extend_from_slice(&rest[..split]);
                    if let Some(section) = take_section(buffer) {
                        complete.push(section);
                    }
                }
                buffer.clear();
                buffer.extend_from_slice(&rest[split..]);
            } else if !buffer.is_empty() {
                buffer.extend_from_slice(payload);
            }
            if let Some(section) = take_section(buffer) {
                complete.push(section);
                buffer.clear();
            }
        }

        for section in complete {
            if pid == PAT_PID {
                self.program_association(&section);
            } else {
                self.program_map(&section);
            }
        }
    }

    fn program_association(&mut self, section: &[u8]) {
        if section.first() != Some(&0x00) || section.len() < 12 {
            return;
        }
        let end = section.len() - 4;
        let mut i = 8;
        while i + 4 <= end {
            let program = u16::from_be_bytes([section[i], section[i + 1]]);
            let pid = u16::from_be_bytes([section[i + 2], section[i + 3]]) & 0x1FFF;
            if program != 0 && self.pmt_pids.insert(pid) {
                trace!("{}: program {} PMT on PID {:#06x}", self.name, program, pid);
            }
            i += 4;
        }
    }

    fn program_map(&mut self, section: &[u8]) {
        if section.first() != Some(&0x02) || section.len() < 16 {
            return;
        }
        let end = section.len() - 4;
        let program_info_length =
            (u16::from_be_bytes([section[10], section[11]]) & 0x0FFF) as usize;
        let mut i = 12 + program_info_length;
        while i + 5 <= end {
            let stream_type = StreamType::from(section[i]);
            let pid = u16::from_be_bytes([section[i + 1], section[i + 2]]) & 0x1FFF;
            let info_length = (u16::from_be_bytes([section[i + 3], section[i + 4]]) & 0x0FFF) as usize;
            let descriptors_end = (i + 5 + info_length).min(end);
            let language = find_language(&section[i + 5..descriptors_end]);

            let stream = self
                .streams
                .entry(pid)
                .or_insert_with(|| TsStream::new(pid, stream_type));
            stream.stream_type = stream_type;
            if let Some(language) = language {
                stream.language = Some(language);
            }
            i += 5 + info_length;
        }
    }

    fn finish(mut self, bytes_read: u64, resync_bytes: u64) -> TsScanResult {
        let length = self
            .pts
            .values()
            .map(PtsRange::seconds)
            .fold(0.0, f64::max);

        for stream in self.streams.values_mut() {
            let span = self.pts.get(&stream.pid).map(PtsRange::seconds).unwrap_or(0.0);
            let seconds = if span > 0.0 { span } else { length };
            if seconds > 0.0 {
                stream.bit_rate = (stream.payload_bytes as f64 * 8.0 / seconds).round() as u64;
            }
        }

        TsScanResult {
            streams: self.streams,
            length,
            packet_count: self.packet_count,
            bytes_read,
            resync_bytes,
            playlist_payload: self.playlist_payload,
        }
    }
}

/// Split one complete PSI section off the front of `buffer`, if present.
fn take_section(buffer: &[u8]) -> Option<Vec<u8>> {
    if buffer.len() < 3 || buffer[0] == 0xFF {
        return None;
    }
    let section_length = (u16::from_be_bytes([buffer[1], buffer[2]]) & 0x0FFF) as usize;
    let total = 3 + section_length;
    if buffer.len() < total {
        return None;
    }
    Some(buffer[..total].to_vec())
}

fn find_language(mut descriptors: &[u8]) -> Option<String> {
    while descriptors.len() >= 2 {
        let tag = descriptors[0];
        let length = descriptors[1] as usize;
        let body = descriptors.get(2..2 + length)?;
        if tag == ISO_639_LANGUAGE_DESCRIPTOR && body.len() >= 3 {
            let code = String::from_utf8_lossy(&body[..3]);
            let code = code.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            if !code.is_empty() {
                return Some(code.to_string());
            }
        }
        descriptors = &descriptors[2 + length..];
    }
    None
}

/// PTS of a PES packet header, in 90 kHz ticks.
fn parse_pes_pts(payload: &[u8]) -> Option<u64> {
    if payload.len() < 14 || payload[..3] != [0x00, 0x00, 0x01] {
        return None;
    }
    if payload[7] & 0x80 == 0 {
        return None;
    }
    let p = &payload[9..14];
    Some(
        (u64::from(p[0] >> 1) & 0x07) << 30
            | u64::from(p[1]) << 22
            | u64::from(p[2] >> 1) << 15
            | u64::from(p[3]) << 7
            | u64::from(p[4] >> 1),
    )
}

/// Scan a transport stream read from `reader`.
///
/// Reading stops at end of input or after `limit` bytes. Sync is checked on
/// every packet; on loss the scanner advances one byte at a time until the
/// next sync byte. Fails with [`Error::NoTransportPackets`] if no packet was
/// ever synchronised.
pub(crate) fn scan_transport_stream<R: Read>(
    name: &str,
    mut reader: R,
    limit: Option<u64>,
    windows: &[ClipWindow],
) -> Result<TsScanResult> {
    let mut scanner = Scanner::new(name, windows);
    let mut buffer: Vec<u8> = Vec::with_capacity(READ_CHUNK * 2);
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut bytes_read = 0u64;
    let mut resync_bytes = 0u64;
    let mut eof = false;

    while !eof {
        let want = match limit {
            Some(limit) => (limit.saturating_sub(bytes_read) as usize).min(READ_CHUNK),
            None => READ_CHUNK,
        };
        let n = if want == 0 { 0 } else { reader.read(&mut chunk[..want])? };
        if n == 0 {
            eof = true;
        }
        bytes_read += n as u64;
        buffer.extend_from_slice(&chunk[..n]);

        let mut pos = 0;
        while pos + SOURCE_PACKET_SIZE <= buffer.len() {
            if buffer[pos + TS_HEADER_OFFSET] != SYNC_BYTE {
                pos += 1;
                resync_bytes += 1;
                continue;
            }
            let start = pos + TS_HEADER_OFFSET;
            scanner.packet(&buffer[start..start + TS_PACKET_SIZE]);
            pos += SOURCE_PACKET_SIZE;
        }
        buffer.drain(..pos);
    }

    if scanner.packet_count == 0 {
        return Err(Error::NoTransportPackets(name.to_string()));
    }
    if resync_bytes > 0 {
        debug!("{}: skipped {} bytes to regain sync", name, resync_bytes);
    }
    Ok(scanner.finish(bytes_read, resync_bytes))
}
