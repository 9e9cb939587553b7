use serde_json::{Map, Value};
use tracing::info;

use crate::config::Config;
use crate::event::RepoEvent;

mod autotag;
mod extraction;

pub use autotag::AutoTagRoute;
pub use extraction::ArchiveExtractionRoute;

/// Event type emitted when a node's binary content changes. Both shipped
/// routes act only on these.
pub(crate) const BINARY_CHANGED: &str = "BINARY_CHANGED";

/// One routing rule: a predicate over the canonical event plus a transform
/// producing the outbound payload for a single destination queue.
///
/// Implementations must be stateless and side-effect free. Evaluating the
/// same route against the same event twice yields the same decision and the
/// same payload.
pub trait Route: Send + Sync {
    /// Route identifier, used for logs and metrics only.
    fn name(&self) -> &str;

    /// Destination queue, fixed at construction from configuration.
    fn queue(&self) -> &str;

    /// Whether the event should be forwarded to this route's queue.
    fn matches(&self, event: &RepoEvent) -> bool;

    /// Outbound payload for a matched event: the full field set of the
    /// canonical event unless a route narrows or enriches it.
    fn transform(&self, event: &RepoEvent) -> Map<String, Value> {
        event.to_fields()
    }
}

/// Paths owned by repository-internal tooling. Events under them are never
/// routed, so derived processing cannot feed back into itself. A missing
/// path counts as internal.
const SYSTEM_PATH_PREFIXES: &[&str] = &["/Company Home/RULE_BASED_TAGS"];

pub(crate) fn is_system_path(path: Option<&str>) -> bool {
    match path {
        None => true,
        Some(path) => SYSTEM_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix)),
    }
}

/// Build the fixed, ordered route list. Called once at startup; the registry
/// does not change for the process lifetime, and every matching route fires
/// regardless of position.
pub fn load_routes(config: &Config) -> Vec<Box<dyn Route>> {
    let routes: Vec<Box<dyn Route>> = vec![
        Box::new(AutoTagRoute::new(config)),
        Box::new(ArchiveExtractionRoute::new(config)),
    ];
    for route in &routes {
        info!(route = route.name(), queue = route.queue(), "registered route");
    }
    routes
}
