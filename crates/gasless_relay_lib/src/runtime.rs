use crate::config::Config;
use crate::db::create_sqlite_connection;
use crate::error::RelayError;
use crate::queue::{channel, ChannelProducer, QueueConsumer};
use crate::relay::{recover_orders, RelayService};
use crate::setup::ChainRegistry;
use crate::signer::Signer;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct RelayRuntime {
    pub runtime_handle: JoinHandle<()>,
    pub producer: ChannelProducer,
    pub service: Arc<RelayService>,
    pub conn: SqlitePool,
    /// Stops the consumer from reading new messages
    pub stop: CancellationToken,
    /// Interrupts confirmation polling of running jobs
    pub cancel: CancellationToken,
}

impl RelayRuntime {
    /// Stop reading the queue and wait until running orders reach a final state
    pub async fn shutdown(self) {
        self.stop.cancel();
        self.join().await;
    }

    /// Stop reading the queue and interrupt running orders, which end up failed
    pub async fn abort(self) {
        self.stop.cancel();
        self.cancel.cancel();
        self.join().await;
    }

    async fn join(self) {
        if let Err(err) = self.runtime_handle.await {
            log::error!("Relay engine task failed: {}", err);
        }
    }
}

fn queue_topic(config: &Config) -> String {
    let mut topics = config.chain.values().map(|c| c.transfer_queue.as_str());
    let topic = topics.next().unwrap_or("gasless-transfers").to_string();
    if topics.any(|other| other != topic) {
        log::warn!(
            "Chains use different transfer queues, all orders go through {}",
            topic
        );
    }
    topic
}

/// Start the consumer loop.
///
/// `conn` and `registry` default to the sqlite file and the configured RPC endpoints.
pub async fn start_relay_engine(
    signer: Arc<dyn Signer>,
    db_filename: &str,
    config: Config,
    conn: Option<SqlitePool>,
    registry: Option<ChainRegistry>,
) -> Result<RelayRuntime, RelayError> {
    config.validate()?;
    let registry = match registry {
        Some(registry) => registry,
        None => ChainRegistry::connect(&config)?,
    };
    let conn = if let Some(conn) = conn {
        conn
    } else {
        log::info!("connecting to sqlite file db: {}", db_filename);
        create_sqlite_connection(Some(db_filename), None, false, true).await?
    };
    log::info!(
        "Starting relay engine for account {:#x}, chains: {}",
        signer.address(),
        registry.networks().collect::<Vec<_>>().join(", ")
    );

    let stop = CancellationToken::new();
    let cancel = CancellationToken::new();
    let service = Arc::new(RelayService::new(
        conn.clone(),
        Arc::new(registry),
        signer,
        cancel.clone(),
    ));
    let (producer, source) = channel(&queue_topic(&config), config.engine.queue_capacity);
    let consumer = QueueConsumer::new(service.clone(), config.engine.max_in_flight, stop.clone());

    let automatic_recover = config.engine.automatic_recover;
    let service_ = service.clone();
    let jh = tokio::spawn(async move {
        if automatic_recover {
            match recover_orders(&service_).await {
                Ok(count) => log::info!("Recovery finished, {} orders resolved", count),
                Err(err) => log::error!("Recovery failed: {}", err),
            }
        }
        consumer.run(source).await;
    });

    Ok(RelayRuntime {
        runtime_handle: jh,
        producer,
        service,
        conn,
        stop,
        cancel,
    })
}
