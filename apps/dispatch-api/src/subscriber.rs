//! Decodes bus messages and hands them to the dispatcher.

use futures_util::{Stream, StreamExt};
use relay_common::{BroadcastEvent, PushEvent};

use crate::bus::{BusMessage, Topics};
use crate::dispatcher::{Dispatcher, FanOut};
use crate::error::RelayError;

pub struct EventSubscriber {
    dispatcher: Dispatcher,
    topics: Topics,
}

impl EventSubscriber {
    pub fn new(dispatcher: Dispatcher, topics: Topics) -> Self {
        Self { dispatcher, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn handle_push(&self, body: &[u8]) -> Result<FanOut, RelayError> {
        let topic = &self.topics.push;
        if body.is_empty() {
            return Err(RelayError::malformed(topic, "empty body"));
        }
        let event = PushEvent::from_slice(body).map_err(|e| RelayError::malformed(topic, e))?;
        Ok(self.dispatcher.dispatch_push(event))
    }

    pub fn handle_broadcast(&self, body: &[u8]) -> Result<FanOut, RelayError> {
        let topic = &self.topics.broadcast;
        if body.is_empty() {
            return Err(RelayError::malformed(topic, "empty body"));
        }
        let event =
            BroadcastEvent::from_slice(body).map_err(|e| RelayError::malformed(topic, e))?;
        Ok(self.dispatcher.dispatch_broadcast(event))
    }

    /// Route a message to the handler for its topic.
    pub fn handle(&self, msg: &BusMessage) -> Result<FanOut, RelayError> {
        if msg.topic == self.topics.push {
            self.handle_push(&msg.body)
        } else if msg.topic == self.topics.broadcast {
            self.handle_broadcast(&msg.body)
        } else {
            Err(RelayError::malformed(&msg.topic, "unknown topic"))
        }
    }

    /// Process messages one at a time until the stream ends.
    ///
    /// Dispatch is not awaited: the fan-out tasks are detached and the loop
    /// moves straight on to the next message.
    pub async fn run<S>(&self, stream: S)
    where
        S: Stream<Item = BusMessage> + Unpin,
    {
        let mut stream = stream;
        while let Some(msg) = stream.next().await {
            match self.handle(&msg) {
                Ok(fan_out) => {
                    tracing::debug!(topic = %msg.topic, nodes = fan_out.len(), "event dispatched");
                }
                Err(error) => {
                    tracing::warn!(
                        topic = %msg.topic,
                        payload_bytes = msg.body.len(),
                        %error,
                        "bus message rejected"
                    );
                }
            }
        }
    }
}
