//! Folder selection rules

use core_runtime::config::FolderFilterConfig;
use provider_panopto::FolderRef;

/// Decides which lecture folders are mirrored.
///
/// A folder qualifies when it has at least one recorded session and, if
/// `only_marked` is set, its name contains the marker substring
/// (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFilter {
    only_marked: bool,
    marker: String,
}

impl FolderFilter {
    pub fn new(config: &FolderFilterConfig) -> Self {
        Self {
            only_marked: config.only_marked,
            marker: config.marker.clone(),
        }
    }

    pub fn qualifies(&self, folder: &FolderRef) -> bool {
        folder.session_count > 0 && (!self.only_marked || folder.name.contains(&self.marker))
    }
}

impl Default for FolderFilter {
    fn default() -> Self {
        Self::new(&FolderFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str, session_count: u32) -> FolderRef {
        FolderRef {
            id: format!("id-{}", name),
            name: name.to_string(),
            session_count,
        }
    }

    #[test]
    fn test_marker_and_sessions_required() {
        let filter = FolderFilter::default();

        assert!(filter.qualifies(&folder("CSE 143 Au21", 5)));
        assert!(!filter.qualifies(&folder("MATH 124", 5)));
        assert!(!filter.qualifies(&folder("CSE 142", 0)));
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(!FolderFilter::default().qualifies(&folder("cse 143", 3)));
    }

    #[test]
    fn test_unmarked_mode_keeps_any_non_empty_folder() {
        let filter = FolderFilter::new(&FolderFilterConfig {
            only_marked: false,
            marker: "CSE".to_string(),
        });

        assert!(filter.qualifies(&folder("MATH 124", 5)));
        assert!(!filter.qualifies(&folder("MATH 124", 0)));
    }
}
