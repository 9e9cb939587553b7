use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::{AckDecision, RouterError};
use crate::config::EventEncoding;
use crate::decode;
use crate::event::RepoEvent;
use crate::prometheus::{report_dropped_events, report_routed_event};
use crate::routes::Route;
use crate::sinks::QueueSink;

/// Per-message orchestration: decode, validate, evaluate every route in
/// registry order, publish each match, and decide the acknowledgment.
pub struct Dispatcher {
    encoding: EventEncoding,
    routes: Vec<Box<dyn Route>>,
    sink: Arc<dyn QueueSink + Send + Sync>,
}

impl Dispatcher {
    pub fn new(
        encoding: EventEncoding,
        routes: Vec<Box<dyn Route>>,
        sink: Arc<dyn QueueSink + Send + Sync>,
    ) -> Self {
        Self {
            encoding,
            routes,
            sink,
        }
    }

    /// Process one raw message body into an acknowledgment decision.
    /// Message content never panics the worker; every failure is classified.
    pub async fn handle(&self, raw: &[u8]) -> AckDecision {
        match self.process(raw).await {
            Ok(published) => AckDecision::AckAfterSuccess { published },
            Err(cause) if cause.is_poison() => {
                report_dropped_events(cause.drop_cause(), 1);
                warn!(len = raw.len(), "dropping unprocessable message: {}", cause);
                AckDecision::AckAndDrop { cause }
            }
            Err(cause) => {
                error!("fan-out interrupted, leaving message for redelivery: {}", cause);
                AckDecision::LeaveUnacknowledged { cause }
            }
        }
    }

    async fn process(&self, raw: &[u8]) -> Result<usize, RouterError> {
        let fields = decode::decode(self.encoding, raw)?;
        let event = RepoEvent::from_fields(&fields)?;

        info!(
            event_type = %event.event_type,
            node_ref = %event.node_ref,
            path = event.path.as_deref().unwrap_or(""),
            "event received"
        );

        // Every route sees every event; a failed publish aborts the rest of
        // the fan-out so the whole message is redelivered.
        let mut published = 0;
        for route in &self.routes {
            if !route.matches(&event) {
                debug!(route = route.name(), "route did not match");
                continue;
            }
            let payload = route.transform(&event);
            self.sink.publish(route.queue(), &payload).await?;
            report_routed_event(route.name());
            published += 1;
        }
        Ok(published)
    }
}
