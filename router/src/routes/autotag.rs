use tracing::debug;

use crate::config::Config;
use crate::event::RepoEvent;
use crate::routes::{is_system_path, Route, BINARY_CHANGED};

/// Forwards binary content changes to the auto-tagging queue, skipping
/// repository-internal paths.
pub struct AutoTagRoute {
    queue: String,
}

impl AutoTagRoute {
    pub fn new(config: &Config) -> Self {
        Self {
            queue: config.autotag_topic.as_str().to_owned(),
        }
    }
}

impl Route for AutoTagRoute {
    fn name(&self) -> &str {
        "autotag"
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
        debug!(
            node_ref = %event.node_ref,
            path = event.path.as_deref().unwrap_or(""),
            "autotag route matched"
        );
        true
    }
}
