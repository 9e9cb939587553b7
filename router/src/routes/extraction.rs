use tracing::debug;

use crate::config::Config;
use crate::event::RepoEvent;
use crate::routes::{is_system_path, Route, BINARY_CHANGED};

/// Forwards ZIP binary changes to the archive-extraction queue. Only the
/// cheap checks happen here; whether the archive actually holds extractable
/// content is decided downstream.
pub struct ArchiveExtractionRoute {
    queue: String,
}

impl ArchiveExtractionRoute {
    pub fn new(config: &Config) -> Self {
        Self {
            queue: config.extraction_topic.as_str().to_owned(),
        }
    }
}

impl Route for ArchiveExtractionRoute {
    fn name(&self) -> &str {
        "archive_extraction"
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    fn matches(&self, event: &RepoEvent) -> bool {
        if event.event_type != BINARY_CHANGED {
            return false;
        }
        if is_system_path(event.path.as_deref()) {
            return false;
        }
        if !event.path.as_deref().is_some_and(is_zip_file) {
            return false;
        }
        debug!(
            node_ref = %event.node_ref,
            path = event.path.as_deref().unwrap_or(""),
            "archive extraction route matched"
        );
        true
    }
}

fn is_zip_file(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".zip")
}

#[cfg(test)]
mod tests {
    use super::ArchiveExtractionRoute;
    use crate::routes::Route;
    use crate::test_support::{binary_changed_event, test_config};

    fn route() -> ArchiveExtractionRoute {
        ArchiveExtractionRoute::new(&test_config())
    }

    #[test]
    fn matches_zip_binary_changes() {
        let event = binary_changed_event("/Company Home/Docs/course.zip");
        assert!(route().matches(&event));
    }

    #[test]
    fn zip_suffix_check_is_case_insensitive() {
        let event = binary_changed_event("/Company Home/Docs/COURSE.ZIP");
        assert!(route().matches(&event));
    }

    #[test]
    fn skips_non_zip_files() {
        let event = binary_changed_event("/Company Home/Docs/a.pdf");
        assert!(!route().matches(&event));
    }

    #[test]
    fn skips_other_event_types() {
        let mut event = binary_changed_event("/Company Home/Docs/course.zip");
        event.event_type = "FOLDER_CREATED".to_owned();
        assert!(!route().matches(&event));
    }

    #[test]
    fn skips_system_paths() {
        let event = binary_changed_event("/Company Home/RULE_BASED_TAGS/x.zip");
        assert!(!route().matches(&event));
    }

    #[test]
    fn queue_comes_from_configuration() {
        assert_eq!(route().queue(), "repo.extraction");
    }
}
