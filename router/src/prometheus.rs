use std::future::ready;

use axum::{routing::get, Router};
use health::HealthRegistry;
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Count a message dropped before routing, by cause.
pub fn report_dropped_events(cause: &'static str, quantity: u64) {
    counter!("router_events_dropped_total", "cause" => cause).increment(quantity);
}

/// Count one payload published on behalf of a route.
pub fn report_routed_event(route: &str) {
    counter!("router_events_routed_total", "route" => route.to_owned()).increment(1);
}

pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Build the probe router served next to the consume loop.
///
/// The recorder is only installed when asked to: a global recorder does not
/// play well with the crate being used as a library in tests.
pub fn setup_probe_router(liveness: HealthRegistry, metrics: bool) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/_liveness", get(move || ready(liveness.get_status())));

    if metrics {
        let recorder_handle = setup_metrics_recorder();
        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}

/// Bind a `TcpListener` on the provided address and serve the probe router.
pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router).await?;

    Ok(())
}

async fn index() -> &'static str {
    "router"
}
