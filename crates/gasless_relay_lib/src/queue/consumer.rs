use super::{MessageSource, QueueMessage, QueueReadError};
use crate::error::RelayError;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Work executed for every message read from the queue
pub trait JobHandler: Send + Sync + 'static {
    fn execute<'a>(&'a self, message: &'a QueueMessage) -> BoxFuture<'a, Result<(), RelayError>>;
}

/// Reads messages one at a time and runs them on at most `max_in_flight` workers.
///
/// A worker slot is taken before every read, so the queue is not drained
/// faster than jobs finish.
pub struct QueueConsumer<H: JobHandler> {
    handler: Arc<H>,
    max_in_flight: usize,
    cancel: CancellationToken,
}

impl<H: JobHandler> QueueConsumer<H> {
    pub fn new(handler: Arc<H>, max_in_flight: usize, cancel: CancellationToken) -> Self {
        Self {
            handler,
            max_in_flight: max_in_flight.max(1),
            cancel,
        }
    }

    /// Consume until the source is closed or the token is cancelled, then wait for running jobs
    pub async fn run<S: MessageSource>(&self, mut source: S) {
        let slots = Arc::new(Semaphore::new(self.max_in_flight));
        log::info!(
            "Queue consumer started with {} worker slots",
            self.max_in_flight
        );

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                message = source.read() => message,
            };

            let message = match message {
                Ok(message) => message,
                Err(QueueReadError::Closed) => {
                    log::info!("Transfer queue closed, stopping consumer");
                    break;
                }
                Err(err) => {
                    log::error!("Failed to read from transfer queue: {}", err);
                    continue;
                }
            };

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let key = message.key.clone().unwrap_or_default();
                match handler.execute(&message).await {
                    Ok(()) => log::info!("Job {} on {} completed", key, message.topic),
                    Err(err) => log::error!("Job {} on {} failed: {}", key, message.topic, err),
                }
            });
        }

        // every slot back means every spawned job has finished
        match slots.acquire_many(self.max_in_flight as u32).await {
            Ok(_) => log::info!("Queue consumer stopped, all jobs finished"),
            Err(err) => log::error!("Failed to wait for running jobs: {}", err),
        };
    }
}
