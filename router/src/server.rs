use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use health::{HealthHandle, HealthRegistry};
use time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::consumer::TopicConsumer;
use crate::dispatch::Dispatcher;
use crate::routes;
use crate::sinks::{KafkaSink, PrintSink, QueueSink};

/// Wire the pipeline and run the consume loop until `shutdown` resolves.
///
/// Construction failures abort before the first poll. The shutdown future is
/// observed only between messages: an in-flight message always completes its
/// decode/validate/route/settle cycle.
pub async fn serve<F>(config: Config, liveness: HealthRegistry, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let sink: Arc<dyn QueueSink + Send + Sync> = if config.print_sink {
        Arc::new(PrintSink {})
    } else {
        Arc::new(KafkaSink::new(&config.kafka).context("failed to create Kafka sink")?)
    };

    let routes = routes::load_routes(&config);
    info!("loaded {} routes", routes.len());

    let consumer = TopicConsumer::new(&config).context("failed to create topic consumer")?;
    let dispatcher = Dispatcher::new(config.event_encoding, routes, sink);

    let handle = liveness
        .register("consumer".to_string(), Duration::seconds(30))
        .await;

    run_loop(&consumer, &dispatcher, &handle, shutdown).await
}

/// One message at a time: the next recv only happens after the previous
/// message has settled, so at most one delivery is ever in flight.
async fn run_loop<F>(
    consumer: &TopicConsumer,
    dispatcher: &Dispatcher,
    liveness: &HealthHandle,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let received = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            received = consumer.recv() => received,
        };
        liveness.report_healthy().await;

        let (raw, tag) = match received {
            Ok(message) => message,
            Err(err) => {
                error!("failed to receive message: {}", err);
                continue;
            }
        };

        let decision = dispatcher.handle(&raw).await;
        consumer
            .settle(&decision, tag)
            .context("failed to settle message, acknowledgment state ambiguous")?;
    }

    info!("shutting down, consumer stopped");
    Ok(())
}
