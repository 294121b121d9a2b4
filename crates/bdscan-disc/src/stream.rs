//! Elementary stream descriptions shared by clip, playlist, and stream files.
//!
//! The coded values follow the Blu-ray stream coding tables: the same byte
//! means the same thing whether it came from a CLPI ProgramInfo entry, an
//! MPLS STN table, or a PMT in the transport stream itself.

use crate::reader::BinReader;
use crate::Result;
use std::fmt;

/// Elementary stream coding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum StreamType {
    Mpeg1Video,
    Mpeg2Video,
    AvcVideo,
    /// Dependent (right-eye) view of a 3D title
    MvcVideo,
    HevcVideo,
    Vc1Video,
    Mpeg1Audio,
    Mpeg2Audio,
    LpcmAudio,
    Ac3Audio,
    DtsAudio,
    Ac3TrueHdAudio,
    Ac3PlusAudio,
    DtsHdAudio,
    DtsHdMasterAudio,
    Ac3PlusSecondaryAudio,
    DtsHdSecondaryAudio,
    PresentationGraphics,
    InteractiveGraphics,
    Subtitle,
    Unknown(u8),
}

impl From<u8> for StreamType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => StreamType::Mpeg1Video,
            0x02 => StreamType::Mpeg2Video,
            0x1B => StreamType::AvcVideo,
            0x20 => StreamType::MvcVideo,
            0x24 => StreamType::HevcVideo,
            0xEA => StreamType::Vc1Video,
            0x03 => StreamType::Mpeg1Audio,
            0x04 => StreamType::Mpeg2Audio,
            0x80 => StreamType::LpcmAudio,
            0x81 => StreamType::Ac3Audio,
            0x82 => StreamType::DtsAudio,
            0x83 => StreamType::Ac3TrueHdAudio,
            0x84 => StreamType::Ac3PlusAudio,
            0x85 => StreamType::DtsHdAudio,
            0x86 => StreamType::DtsHdMasterAudio,
            0xA1 => StreamType::Ac3PlusSecondaryAudio,
            0xA2 => StreamType::DtsHdSecondaryAudio,
            0x90 => StreamType::PresentationGraphics,
            0x91 => StreamType::InteractiveGraphics,
            0x92 => StreamType::Subtitle,
            v => StreamType::Unknown(v),
        }
    }
}

impl StreamType {
    /// The coded byte value.
    pub fn code(&self) -> u8 {
        match self {
            StreamType::Mpeg1Video => 0x01,
            StreamType::Mpeg2Video => 0x02,
            StreamType::AvcVideo => 0x1B,
            StreamType::MvcVideo => 0x20,
            StreamType::HevcVideo => 0x24,
            StreamType::Vc1Video => 0xEA,
            StreamType::Mpeg1Audio => 0x03,
            StreamType::Mpeg2Audio => 0x04,
            StreamType::LpcmAudio => 0x80,
            StreamType::Ac3Audio => 0x81,
            StreamType::DtsAudio => 0x82,
            StreamType::Ac3TrueHdAudio => 0x83,
            StreamType::Ac3PlusAudio => 0x84,
            StreamType::DtsHdAudio => 0x85,
            StreamType::DtsHdMasterAudio => 0x86,
            StreamType::Ac3PlusSecondaryAudio => 0xA1,
            StreamType::DtsHdSecondaryAudio => 0xA2,
            StreamType::PresentationGraphics => 0x90,
            StreamType::InteractiveGraphics => 0x91,
            StreamType::Subtitle => 0x92,
            StreamType::Unknown(v) => *v,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Video
                | StreamType::Mpeg2Video
                | StreamType::AvcVideo
                | StreamType::MvcVideo
                | StreamType::HevcVideo
                | StreamType::Vc1Video
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Audio
                | StreamType::Mpeg2Audio
                | StreamType::LpcmAudio
                | StreamType::Ac3Audio
                | StreamType::DtsAudio
                | StreamType::Ac3TrueHdAudio
                | StreamType::Ac3PlusAudio
                | StreamType::DtsHdAudio
                | StreamType::DtsHdMasterAudio
                | StreamType::Ac3PlusSecondaryAudio
                | StreamType::DtsHdSecondaryAudio
        )
    }

    pub fn is_graphics(&self) -> bool {
        matches!(
            self,
            StreamType::PresentationGraphics | StreamType::InteractiveGraphics
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, StreamType::Subtitle)
    }

    /// Human-readable codec name.
    pub fn codec_name(&self) -> &'static str {
        match self {
            StreamType::Mpeg1Video => "MPEG-1 Video",
            StreamType::Mpeg2Video => "MPEG-2 Video",
            StreamType::AvcVideo => "MPEG-4 AVC Video",
            StreamType::MvcVideo => "MPEG-4 MVC Video",
            StreamType::HevcVideo => "MPEG-H HEVC Video",
            StreamType::Vc1Video => "VC-1 Video",
            StreamType::Mpeg1Audio => "MPEG-1 Audio",
            StreamType::Mpeg2Audio => "MPEG-2 Audio",
            StreamType::LpcmAudio => "LPCM Audio",
            StreamType::Ac3Audio => "Dolby Digital Audio",
            StreamType::DtsAudio => "DTS Audio",
            StreamType::Ac3TrueHdAudio => "Dolby TrueHD Audio",
            StreamType::Ac3PlusAudio => "Dolby Digital Plus Audio",
            StreamType::DtsHdAudio => "DTS-HD High-Res Audio",
            StreamType::DtsHdMasterAudio => "DTS-HD Master Audio",
            StreamType::Ac3PlusSecondaryAudio => "Dolby Digital Plus Audio",
            StreamType::DtsHdSecondaryAudio => "DTS Express",
            StreamType::PresentationGraphics => "Presentation Graphics",
            StreamType::InteractiveGraphics => "Interactive Graphics",
            StreamType::Subtitle => "Subtitle",
            StreamType::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Unknown(v) => write!(f, "Unknown (0x{:02X})", v),
            other => write!(f, "{}", other.codec_name()),
        }
    }
}

/// Video format nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum VideoFormat {
    Format480i,
    Format576i,
    Format480p,
    Format1080i,
    Format720p,
    Format1080p,
    Format576p,
    Format2160p,
    Unknown(u8),
}

impl From<u8> for VideoFormat {
    fn from(value: u8) -> Self {
        match value {
            1 => VideoFormat::Format480i,
            2 => VideoFormat::Format576i,
            3 => VideoFormat::Format480p,
            4 => VideoFormat::Format1080i,
            5 => VideoFormat::Format720p,
            6 => VideoFormat::Format1080p,
            7 => VideoFormat::Format576p,
            8 => VideoFormat::Format2160p,
            v => VideoFormat::Unknown(v),
        }
    }
}

impl VideoFormat {
    /// Frame height in lines, if known.
    pub fn height(&self) -> Option<u32> {
        match self {
            VideoFormat::Format480i | VideoFormat::Format480p => Some(480),
            VideoFormat::Format576i | VideoFormat::Format576p => Some(576),
            VideoFormat::Format720p => Some(720),
            VideoFormat::Format1080i | VideoFormat::Format1080p => Some(1080),
            VideoFormat::Format2160p => Some(2160),
            VideoFormat::Unknown(_) => None,
        }
    }

    pub fn is_interlaced(&self) -> bool {
        matches!(
            self,
            VideoFormat::Format480i | VideoFormat::Format576i | VideoFormat::Format1080i
        )
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.height() {
            Some(h) => write!(f, "{}{}", h, if self.is_interlaced() { "i" } else { "p" }),
            None => write!(f, "unknown"),
        }
    }
}

/// Frame rate nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum FrameRate {
    Fps23_976,
    Fps24,
    Fps25,
    Fps29_97,
    Fps50,
    Fps59_94,
    Unknown(u8),
}

impl From<u8> for FrameRate {
    fn from(value: u8) -> Self {
        match value {
            1 => FrameRate::Fps23_976,
            2 => FrameRate::Fps24,
            3 => FrameRate::Fps25,
            4 => FrameRate::Fps29_97,
            6 => FrameRate::Fps50,
            7 => FrameRate::Fps59_94,
            v => FrameRate::Unknown(v),
        }
    }
}

impl FrameRate {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FrameRate::Fps23_976 => Some(24000.0 / 1001.0),
            FrameRate::Fps24 => Some(24.0),
            FrameRate::Fps25 => Some(25.0),
            FrameRate::Fps29_97 => Some(30000.0 / 1001.0),
            FrameRate::Fps50 => Some(50.0),
            FrameRate::Fps59_94 => Some(60000.0 / 1001.0),
            FrameRate::Unknown(_) => None,
        }
    }

    /// PAL-family rates, used for the disc-level 50Hz flag.
    pub fn is_50hz(&self) -> bool {
        matches!(self, FrameRate::Fps25 | FrameRate::Fps50)
    }
}

/// Aspect ratio nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum AspectRatio {
    Ratio4x3,
    Ratio16x9,
    Unknown(u8),
}

impl From<u8> for AspectRatio {
    fn from(value: u8) -> Self {
        match value {
            2 => AspectRatio::Ratio4x3,
            3 => AspectRatio::Ratio16x9,
            v => AspectRatio::Unknown(v),
        }
    }
}

/// Audio presentation type nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Multi,
    Combo,
    Unknown(u8),
}

impl From<u8> for ChannelLayout {
    fn from(value: u8) -> Self {
        match value {
            1 => ChannelLayout::Mono,
            3 => ChannelLayout::Stereo,
            6 => ChannelLayout::Multi,
            12 => ChannelLayout::Combo,
            v => ChannelLayout::Unknown(v),
        }
    }
}

/// Audio sampling frequency nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum SampleRate {
    Hz48000,
    Hz96000,
    Hz192000,
    /// 48 kHz core with 192 kHz extension
    Hz48000And192000,
    /// 48 kHz core with 96 kHz extension
    Hz48000And96000,
    Unknown(u8),
}

impl From<u8> for SampleRate {
    fn from(value: u8) -> Self {
        match value {
            1 => SampleRate::Hz48000,
            4 => SampleRate::Hz96000,
            5 => SampleRate::Hz192000,
            12 => SampleRate::Hz48000And192000,
            14 => SampleRate::Hz48000And96000,
            v => SampleRate::Unknown(v),
        }
    }
}

impl SampleRate {
    /// Highest sampling frequency carried, in Hz.
    pub fn hz(&self) -> Option<u32> {
        match self {
            SampleRate::Hz48000 => Some(48_000),
            SampleRate::Hz96000 | SampleRate::Hz48000And96000 => Some(96_000),
            SampleRate::Hz192000 | SampleRate::Hz48000And192000 => Some(192_000),
            SampleRate::Unknown(_) => None,
        }
    }
}

/// Type-specific attributes decoded from stream coding info.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum StreamAttributes {
    Video {
        format: VideoFormat,
        frame_rate: FrameRate,
        aspect_ratio: Option<AspectRatio>,
    },
    Audio {
        channel_layout: ChannelLayout,
        sample_rate: SampleRate,
    },
    Graphics,
    Text {
        character_code: u8,
    },
    None,
}

/// One elementary stream, keyed by PID in its owning table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TsStream {
    pub pid: u16,
    pub stream_type: StreamType,
    /// ISO 639-2 language code
    pub language: Option<String>,
    pub attributes: StreamAttributes,
    /// Average bitrate in bits per second, filled from a transport stream scan
    pub bit_rate: u64,
    /// Transport payload bytes seen for this PID
    pub payload_bytes: u64,
    /// Transport packets seen for this PID
    pub packet_count: u64,
}

impl TsStream {
    pub fn new(pid: u16, stream_type: StreamType) -> Self {
        Self {
            pid,
            stream_type,
            language: None,
            attributes: StreamAttributes::None,
            bit_rate: 0,
            payload_bytes: 0,
            packet_count: 0,
        }
    }

    pub fn with_attributes(mut self, attributes: StreamAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        let trimmed = language.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if !trimmed.is_empty() {
            self.language = Some(trimmed.to_string());
        }
        self
    }

    pub fn frame_rate(&self) -> Option<FrameRate> {
        match self.attributes {
            StreamAttributes::Video { frame_rate, .. } => Some(frame_rate),
            _ => None,
        }
    }
}

impl fmt::Display for TsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X} {}", self.pid, self.stream_type)?;
        match &self.attributes {
            StreamAttributes::Video {
                format, frame_rate, ..
            } => {
                write!(f, " {}", format)?;
                if let Some(fps) = frame_rate.as_f64() {
                    write!(f, " {:.3} fps", fps)?;
                }
            }
            StreamAttributes::Audio {
                channel_layout,
                sample_rate,
            } => {
                write!(f, " {:?}", channel_layout)?;
                if let Some(hz) = sample_rate.hz() {
                    write!(f, " {} kHz", hz / 1000)?;
                }
            }
            _ => {}
        }
        if let Some(ref lang) = self.language {
            write!(f, " [{}]", lang)?;
        }
        if self.bit_rate > 0 {
            write!(f, " {} kbps", self.bit_rate / 1000)?;
        }
        Ok(())
    }
}

/// Decode one stream coding-info block, starting at its coding type byte.
///
/// CLPI ProgramInfo and MPLS STN entries share this layout except that the
/// clip-info video entry carries an extra aspect-ratio byte. Types without
/// a known layout yield `None` and the caller skips them.
pub(crate) fn read_coding_info(
    r: &mut BinReader<'_>,
    pid: u16,
    with_aspect: bool,
) -> Result<Option<TsStream>> {
    let stream_type = StreamType::from(r.u8()?);
    let stream = TsStream::new(pid, stream_type);

    let stream = match stream_type {
        StreamType::MvcVideo => stream,
        t if t.is_video() => {
            let b = r.u8()?;
            let aspect_ratio = if with_aspect {
                Some(AspectRatio::from(r.u8()? >> 4))
            } else {
                None
            };
            stream.with_attributes(StreamAttributes::Video {
                format: VideoFormat::from(b >> 4),
                frame_rate: FrameRate::from(b & 0x0F),
                aspect_ratio,
            })
        }
        t if t.is_audio() => {
            let b = r.u8()?;
            let language = r.ascii(3)?;
            stream
                .with_attributes(StreamAttributes::Audio {
                    channel_layout: ChannelLayout::from(b >> 4),
                    sample_rate: SampleRate::from(b & 0x0F),
                })
                .with_language(language)
        }
        t if t.is_graphics() => {
            let language = r.ascii(3)?;
            stream
                .with_attributes(StreamAttributes::Graphics)
                .with_language(language)
        }
        StreamType::Subtitle => {
            let character_code = r.u8()?;
            let language = r.ascii(3)?;
            stream
                .with_attributes(StreamAttributes::Text { character_code })
                .with_language(language)
        }
        _ => return Ok(None),
    };

    Ok(Some(stream))
}
