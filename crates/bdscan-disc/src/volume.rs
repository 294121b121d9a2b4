//! Volume label lookup.

use std::path::Path;

/// Source of the human-readable label of the volume holding a disc.
///
/// Platform-specific lookups (mount tables, UDF descriptors) plug in here.
pub trait VolumeLabelProvider {
    /// Label for the volume whose disc root is `root`, if one is known.
    fn volume_label(&self, root: &Path) -> Option<String>;
}

/// Uses the disc root directory name as the label.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryNameLabel;

impl VolumeLabelProvider for DirectoryNameLabel {
    fn volume_label(&self, root: &Path) -> Option<String> {
        root.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }
}

/// A fixed label, for callers that already know it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLabel(pub String);

impl VolumeLabelProvider for FixedLabel {
    fn volume_label(&self, _root: &Path) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_name_label() {
        let label = DirectoryNameLabel.volume_label(Path::new("/mnt/MOVIE_DISC"));
        assert_eq!(label.as_deref(), Some("MOVIE_DISC"));
        assert_eq!(DirectoryNameLabel.volume_label(Path::new("/")), None);
    }

    #[test]
    fn test_fixed_label() {
        let provider = FixedLabel("TITLE".to_string());
        assert_eq!(provider.volume_label(Path::new("/x")).as_deref(), Some("TITLE"));
    }
}
