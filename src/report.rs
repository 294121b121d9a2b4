//! Text and JSON rendering of a scanned disc.

use bdscan_disc::{Disc, PlaylistFile, PlaylistFilter, ScanStatus, ScanSummary};
use serde::Serialize;
use std::fmt::Write;

/// JSON document printed by `bdscan scan --json`.
#[derive(Serialize)]
pub struct DiscReport<'a> {
    pub disc: &'a Disc,
    pub summary: &'a ScanSummary,
    /// Names of the playlists the listing shows, longest first
    pub playlists: Vec<&'a str>,
}

impl<'a> DiscReport<'a> {
    pub fn new(disc: &'a Disc, summary: &'a ScanSummary, filter: &PlaylistFilter) -> Self {
        Self {
            disc,
            summary,
            playlists: disc
                .feature_playlists(filter)
                .into_iter()
                .map(|p| p.name.as_str())
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Format seconds as `H:MM:SS`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

fn feature_flags(disc: &Disc) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if disc.is_uhd {
        flags.push("UHD");
    }
    if disc.is_3d {
        flags.push("3D");
    }
    if disc.is_50hz {
        flags.push("50Hz");
    }
    if disc.is_bd_plus {
        flags.push("BD+");
    }
    if disc.is_bd_java {
        flags.push("BD-Java");
    }
    if disc.is_psp {
        flags.push("PSP");
    }
    if disc.is_dbox {
        flags.push("D-Box");
    }
    flags
}

/// Render the human-readable scan summary.
pub fn render_text(disc: &Disc, summary: &ScanSummary, filter: &PlaylistFilter) -> String {
    let mut out = String::new();
    let flags = feature_flags(disc);

    let _ = writeln!(out, "Disc:      {}", disc.volume_label);
    let _ = writeln!(out, "Path:      {}", disc.root().display());
    let _ = writeln!(out, "Size:      {} bytes", disc.size);
    let _ = writeln!(
        out,
        "Features:  {}",
        if flags.is_empty() {
            "none".to_string()
        } else {
            flags.join(", ")
        }
    );
    let _ = writeln!(
        out,
        "Catalog:   {} playlists, {} clips, {} stream files, {} interleaved files",
        disc.playlist_files.len(),
        disc.stream_clip_files.len(),
        disc.stream_files.len(),
        disc.interleaved_files.len()
    );

    for playlist in disc.feature_playlists(filter) {
        out.push('\n');
        render_playlist(&mut out, playlist);
    }

    let failures = failures(disc);
    if !failures.is_empty() {
        out.push_str("\nFailures:\n");
        for (name, error) in failures {
            let _ = writeln!(out, "  {}: {}", name, error);
        }
    }
    for (phase, counts) in [
        ("clip", &summary.clips),
        ("playlist", &summary.playlists),
        ("stream file", &summary.stream_files),
    ] {
        if counts.aborted {
            let _ = writeln!(out, "The {} scan was stopped early", phase);
        }
    }

    out
}

fn render_playlist(out: &mut String, playlist: &PlaylistFile) {
    let _ = writeln!(
        out,
        "Playlist {}  {}  {} chapters  {} kbps",
        playlist.name,
        format_duration(playlist.total_length()),
        playlist.chapters.len(),
        playlist.total_bit_rate() / 1000
    );
    if playlist.angle_count > 0 {
        let _ = writeln!(out, "  Angles: {}", playlist.angle_count + 1);
    }
    for clip in &playlist.stream_clips {
        let _ = write!(
            out,
            "  Clip {}  in {}  length {}",
            clip.name,
            format_duration(clip.time_in),
            format_duration(clip.length)
        );
        if clip.angle_index > 0 {
            let _ = write!(out, "  angle {}", clip.angle_index);
        }
        if !clip.has_stream_file {
            out.push_str("  (missing)");
        }
        out.push('\n');
    }
    for stream in playlist.streams.values() {
        let _ = writeln!(out, "  Stream {}", stream);
    }
}

fn failures(disc: &Disc) -> Vec<(&str, &str)> {
    let clips = disc
        .stream_clip_files
        .values()
        .map(|f| (f.name.as_str(), &f.status));
    let playlists = disc
        .playlist_files
        .values()
        .map(|f| (f.name.as_str(), &f.status));
    let streams = disc
        .stream_files
        .values()
        .map(|f| (f.name.as_str(), &f.status));

    clips
        .chain(playlists)
        .chain(streams)
        .filter_map(|(name, status): (&str, &ScanStatus)| status.error().map(|e| (name, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdscan_disc::fixtures::write_minimal_disc;
    use bdscan_disc::{DiscOptions, ScanHandlers, ScanOptions};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(59.6), "0:01:00");
        assert_eq!(format_duration(7322.0), "2:02:02");
        assert_eq!(format_duration(f64::NAN), "0:00:00");
    }

    #[test]
    fn test_render_scanned_disc() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("SAMPLE");
        write_minimal_disc(&root).unwrap();
        std::fs::write(root.join("BDMV/CLIPINF/00002.clpi"), b"junk").unwrap();

        let mut disc = Disc::open(&root, &DiscOptions::default()).unwrap();
        let summary = disc
            .scan(&mut ScanHandlers::continue_on_error(), &ScanOptions::default())
            .unwrap();

        let text = render_text(&disc, &summary, &PlaylistFilter::default());
        assert!(text.contains("Disc:      SAMPLE"));
        assert!(text.contains("Features:  none"));
        assert!(text.contains("Playlist 00000.MPLS  0:01:00  2 chapters"));
        assert!(text.contains("  Clip 00001.M2TS  in 0:00:10  length 0:01:00"));
        assert!(text.contains("  Stream 0x1011 MPEG-4 AVC Video 1080p"));
        assert!(text.contains("Failures:\n  00002.CLPI: "));

        let json = DiscReport::new(&disc, &summary, &PlaylistFilter::default())
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["playlists"][0], "00000.MPLS");
        assert_eq!(value["summary"]["clips"]["failed"], 1);
        assert_eq!(
            value["disc"]["playlist_files"]["00000.MPLS"]["status"]["state"],
            "scanned"
        );
    }
}
