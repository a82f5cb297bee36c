//! Redis pub/sub adapter feeding the event subscriber.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::subscriber::EventSubscriber;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// One message taken off the bus, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub body: Bytes,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
        }
    }
}

/// Topic names for the two event kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub push: String,
    pub broadcast: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            push: "relay.push".to_string(),
            broadcast: "relay.broadcast".to_string(),
        }
    }
}

/// Open a dedicated pub/sub connection subscribed to `topic`.
pub async fn subscribe(
    client: &redis::Client,
    topic: &str,
) -> redis::RedisResult<BoxStream<'static, BusMessage>> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(topic).await?;
    let stream = pubsub.into_on_message().map(|msg| {
        BusMessage::new(
            msg.get_channel_name().to_string(),
            Bytes::copy_from_slice(msg.get_payload_bytes()),
        )
    });
    Ok(stream.boxed())
}

/// Consume `topic` until aborted, reconnecting whenever the connection drops.
///
/// Redis pub/sub does not buffer for absent subscribers, so anything published
/// while reconnecting is lost.
pub fn spawn_consumer(
    client: redis::Client,
    topic: String,
    subscriber: Arc<EventSubscriber>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match subscribe(&client, &topic).await {
                Ok(stream) => {
                    tracing::info!(%topic, "subscribed");
                    subscriber.run(stream).await;
                    tracing::warn!(%topic, "bus subscription ended, reconnecting");
                }
                Err(error) => {
                    tracing::error!(%topic, %error, "bus subscribe failed");
                }
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}
