mod consumer;

pub use consumer::{JobHandler, QueueConsumer};

use crate::err_custom_create;
use crate::err_from;
use crate::error::RelayError;
use crate::relay::TransferRequest;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::mpsc;

/// One message pulled from the transfer queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueReadError {
    /// No more messages will ever arrive
    #[error("queue closed")]
    Closed,
    #[error("queue transport error: {0}")]
    Transport(String),
}

/// Pull side of a message queue
pub trait MessageSource: Send {
    fn read(&mut self) -> BoxFuture<'_, Result<QueueMessage, QueueReadError>>;
}

/// Read side of the in-process transfer queue
pub struct ChannelSource {
    receiver: mpsc::Receiver<Result<QueueMessage, QueueReadError>>,
}

impl MessageSource for ChannelSource {
    fn read(&mut self) -> BoxFuture<'_, Result<QueueMessage, QueueReadError>> {
        async move {
            match self.receiver.recv().await {
                Some(item) => item,
                None => Err(QueueReadError::Closed),
            }
        }
        .boxed()
    }
}

/// Write side of the in-process transfer queue, cheap to clone
#[derive(Clone)]
pub struct ChannelProducer {
    topic: String,
    sender: mpsc::Sender<Result<QueueMessage, QueueReadError>>,
}

impl ChannelProducer {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Serialize the request and put it on the queue keyed by its order id
    pub async fn enqueue(&self, request: &TransferRequest) -> Result<(), RelayError> {
        let payload = serde_json::to_vec(request).map_err(err_from!())?;
        self.send(QueueMessage {
            topic: self.topic.clone(),
            key: Some(request.order_id.clone()),
            payload,
        })
        .await
    }

    pub async fn send(&self, message: QueueMessage) -> Result<(), RelayError> {
        self.sender
            .send(Ok(message))
            .await
            .map_err(|_| err_custom_create!("Transfer queue {} is closed", self.topic))
    }

    /// Deliver a read failure to the consumer, as a broken transport would
    pub async fn send_error(&self, message: &str) -> Result<(), RelayError> {
        self.sender
            .send(Err(QueueReadError::Transport(message.to_string())))
            .await
            .map_err(|_| err_custom_create!("Transfer queue {} is closed", self.topic))
    }
}

/// Bounded in-process queue. Dropping every producer closes it.
pub fn channel(topic: &str, capacity: usize) -> (ChannelProducer, ChannelSource) {
    let (sender, receiver) = mpsc::channel(capacity);
    (
        ChannelProducer {
            topic: topic.to_string(),
            sender,
        },
        ChannelSource { receiver },
    )
}
