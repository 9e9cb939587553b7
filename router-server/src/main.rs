//! Consume repository change events from the inbound topic and fan them out
//! to the processing queues.
use envconfig::Envconfig;
use health::HealthRegistry;
use tokio::signal;

use router::config::Config;
use router::prometheus;
use router::server::serve;

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().expect("Invalid configuration:");

    let liveness = HealthRegistry::new("liveness");

    let probes = prometheus::setup_probe_router(liveness.clone(), config.export_prometheus);
    let bind = config.bind();
    tokio::task::spawn(async move {
        prometheus::serve(probes, &bind)
            .await
            .expect("failed to start serving probes");
    });

    serve(config, liveness, shutdown())
        .await
        .expect("router terminated");
}
