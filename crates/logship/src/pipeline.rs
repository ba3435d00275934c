//! Process-level wiring of the logging pipeline.
//!
//! [`Pipeline::start`] builds the sink set the configuration asks for
//! (the console always, the remote batching sink only when a store URL is
//! configured and the environment is production-like), spawns the remote
//! sink's background tasks, and hands back the shared [`Router`].
//!
//! Call it once at startup, inside a tokio runtime, and keep the
//! [`Pipeline`] around so shutdown can drain the remote buffer.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::remote::outcome::OutcomeLogger;
use crate::remote::service::{RemoteSinkParams, RemoteSinkService};
use crate::router::Router;
use crate::schema::SchemaFormatter;
use crate::sink::console::ConsoleSink;
use crate::sink::Sink;

/// A started logging pipeline: the router plus the background tasks
/// behind it.
pub struct Pipeline {
    router: Arc<Router>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Builds the sink set from the configuration and starts the
    /// background tasks.
    ///
    /// Must run inside a tokio runtime when the remote sink is enabled.
    #[must_use]
    pub fn start(config: &Config) -> Self {
        let console = Arc::new(ConsoleSink::from_config(config));
        let mut sinks: Vec<Arc<dyn Sink>> = vec![console.clone()];
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        if let Some(endpoint) = config.remote_endpoint() {
            let params = RemoteSinkParams::from_config(config, endpoint, cancel.child_token());
            let (service, handle, outcome_rx) = RemoteSinkService::new(params);
            tasks.push(tokio::spawn(service.run()));

            // Delivery outcomes fall back to the console sink, never to
            // the remote sink that produced them.
            let outcome_logger = OutcomeLogger::new(
                outcome_rx,
                console,
                SchemaFormatter::new(config.app_name.clone()),
            );
            tasks.push(tokio::spawn(outcome_logger.run()));

            sinks.push(Arc::new(handle));
        }

        let router = Arc::new(Router::new(config, sinks));
        debug!(
            "Logging pipeline started with sinks: {:?}",
            router.sink_names()
        );
        Pipeline {
            router,
            cancel,
            tasks,
        }
    }

    /// The shared router handed to middleware and application code.
    #[must_use]
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Cancels the background tasks and waits for the remote buffer to
    /// drain through its final flush.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                debug!("Pipeline task did not stop cleanly: {e}");
            }
        }
    }
}
