//! Error types for bdscan-disc.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for bdscan-disc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bdscan-disc operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A mandatory disc directory could not be located.
    #[error("Unable to locate BD structure: {name} not found under {}", searched.display())]
    StructureNotFound { name: &'static str, searched: PathBuf },

    /// File header carries a type tag this parser does not understand.
    #[error("{file} has an unknown file type {found}")]
    UnknownFileType { file: String, found: String },

    /// A read ran past the end of the file data.
    #[error("{file} is truncated: need {need} bytes at offset {offset}, have {have}")]
    Truncated {
        file: String,
        offset: usize,
        need: usize,
        have: usize,
    },

    /// A playlist references a clip-info file that is not on the disc.
    #[error("Playlist {playlist} referenced missing file {clip}")]
    MissingClip { playlist: String, clip: String },

    /// No synchronised transport packet was found.
    #[error("{0} contains no transport stream packets")]
    NoTransportPackets(String),

    /// Structurally invalid data.
    #[error("Invalid data in {file}: {message}")]
    InvalidData { file: String, message: String },

    /// The scan was cancelled through its cancel token.
    #[error("Scan cancelled")]
    Cancelled,
}

impl Error {
    /// Create an invalid data error.
    pub fn invalid_data(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidData {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal for the whole disc rather than one file.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StructureNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingClip {
            playlist: "00000.MPLS".to_string(),
            clip: "00001.CLPI".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Playlist 00000.MPLS referenced missing file 00001.CLPI"
        );

        let err = Error::Truncated {
            file: "00001.CLPI".to_string(),
            offset: 12,
            need: 4,
            have: 0,
        };
        assert_eq!(
            err.to_string(),
            "00001.CLPI is truncated: need 4 bytes at offset 12, have 0"
        );
    }

    #[test]
    fn test_structural() {
        let err = Error::StructureNotFound {
            name: "BDMV",
            searched: PathBuf::from("/mnt/disc"),
        };
        assert!(err.is_structural());
        assert!(!Error::Cancelled.is_structural());
    }
}
