use bdscan_disc::PlaylistFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Log and skip files that fail to parse instead of stopping the scan
    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    /// Read interleaved SSIF files in place of their M2TS counterparts
    #[serde(default)]
    pub enable_ssif: bool,

    /// Directory levels searched below the given path for BDMV
    #[serde(default)]
    pub bdmv_search_depth: usize,

    /// Read at most this many MiB of each stream file (0 = whole file)
    #[serde(default)]
    pub stream_scan_limit_mb: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            enable_ssif: false,
            bdmv_search_depth: 0,
            stream_scan_limit_mb: 0,
        }
    }
}

impl ScanConfig {
    pub fn stream_scan_limit(&self) -> Option<u64> {
        match self.stream_scan_limit_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default = "default_true")]
    pub filter_short_playlists: bool,

    /// Seconds
    #[serde(default = "default_min_playlist_length")]
    pub min_playlist_length_secs: f64,

    #[serde(default = "default_true")]
    pub filter_looping_playlists: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_short_playlists: true,
            min_playlist_length_secs: default_min_playlist_length(),
            filter_looping_playlists: true,
        }
    }
}

impl From<&FilterConfig> for PlaylistFilter {
    fn from(config: &FilterConfig) -> Self {
        PlaylistFilter {
            filter_short_playlists: config.filter_short_playlists,
            min_length: config.min_playlist_length_secs,
            filter_looping_playlists: config.filter_looping_playlists,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_playlist_length() -> f64 {
    20.0
}
