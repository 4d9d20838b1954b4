use super::super::super::fanout::Fanout;
use super::super::super::pubsub::{
    RawMessage, RawPublisher, RawSubscriber, RawSubscription, SubscriberCounter,
    TopicDescriptor,
};
use super::super::super::{ConnectionTeardownError, PublishError, SubscriptionError};
use super::super::json::{JsonPublisher, JsonSubscriber};
use super::{is_disconnect, PubSubResource, RedisFactory};
use async_trait::async_trait;
use futures::lock::Mutex;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

type TopicRegistry = Arc<Mutex<HashMap<TopicDescriptor, Fanout<RawMessage>>>>;

/// Broker implementation using redis publish and subscribe
///
/// Every topic with at least one local subscriber is backed by exactly one dedicated
/// subscription connection. A background task reads from it and broadcasts each payload
/// to the local subscribers. Once the last local subscriber is gone the connection
/// unsubscribes and is dropped, so the server-side subscriber count returns to its baseline.
pub struct RedisBroker<F: RedisFactory> {
    factory: Arc<F>,
    topics: TopicRegistry,
}

impl<F> RedisBroker<F>
where
    F: RedisFactory + Send + Sync + 'static,
{
    /// Creates a new instance from a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of subscriptions the redis server reports for a topic across all processes
    ///
    /// Each process contributes at most one subscription per topic, regardless of how many local subscribers it serves.
    pub async fn remote_subscriber_count(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<usize, SubscriptionError> {
        let setup_error = |reason: String| SubscriptionError::Setup {
            topic: topic.to_string(),
            reason,
        };

        let mut con = self
            .factory
            .connection()
            .await
            .map_err(|e| setup_error(e.to_string()))?;

        let counts: Vec<(String, usize)> = redis::cmd("PUBSUB")
            .arg("NUMSUB")
            .arg(topic.key())
            .query_async(&mut con)
            .await
            .map_err(|e| setup_error(e.to_string()))?;

        Ok(counts.into_iter().map(|(_, count)| count).sum())
    }
}

impl<F> JsonPublisher for RedisBroker<F> where F: RedisFactory + Send + Sync + 'static {}
impl<F> JsonSubscriber for RedisBroker<F> where F: RedisFactory + Send + Sync + 'static {}

#[async_trait]
impl<F> RawPublisher for RedisBroker<F>
where
    F: RedisFactory + Send + Sync + 'static,
{
    #[instrument(skip(self, payload), fields(%topic, bytes = payload.len()))]
    async fn publish_raw(
        &self,
        topic: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<usize, PublishError> {
        let mut con = self
            .factory
            .connection()
            .await
            .map_err(PublishError::Unavailable)?;

        let receivers: usize = redis::cmd("PUBLISH")
            .arg(topic.key())
            .arg(payload)
            .query_async(&mut con)
            .await
            .map_err(|error| {
                if is_disconnect(&error) {
                    PublishError::Unavailable(error.into())
                } else {
                    PublishError::Rejected {
                        topic: topic.to_string(),
                        source: error.into(),
                    }
                }
            })?;

        trace!(receivers, "Published payload");

        Ok(receivers)
    }
}

#[async_trait]
impl<F> RawSubscriber for RedisBroker<F>
where
    F: RedisFactory + Send + Sync + 'static,
{
    #[instrument(skip(self), fields(%topic))]
    async fn subscribe_raw(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<RawSubscription, SubscriptionError> {
        if let Some(fanout) = self.topics.lock().await.get(topic) {
            let registration = fanout.register();
            trace!(id = %registration.id(), "Reusing existing broker subscription");
            return Ok(registration.boxed());
        }

        let setup_error = |reason: String| SubscriptionError::Setup {
            topic: topic.to_string(),
            reason,
        };

        // Registry stays unlocked while connecting
        debug!("Establishing broker subscription");
        let mut pubsub = self
            .factory
            .pubsub()
            .await
            .map_err(|e| setup_error(e.to_string()))?;

        pubsub
            .subscribe(topic.key())
            .await
            .map_err(|e| setup_error(e.to_string()))?;

        let mut topics = self.topics.lock().await;

        if let Some(fanout) = topics.get(topic) {
            let registration = fanout.register();
            drop(topics);

            trace!(id = %registration.id(), "Discarding concurrently established broker subscription");
            if let Err(e) = pubsub.unsubscribe(topic.key()).await {
                let error = ConnectionTeardownError {
                    topic: topic.to_string(),
                    source: e.into(),
                };
                warn!(%error, "Unable to unsubscribe cleanly");
            }

            return Ok(registration.boxed());
        }

        let fanout = Fanout::new();
        let registration = fanout.register();
        topics.insert(topic.clone(), fanout.clone());

        tokio::spawn(pump(
            pubsub,
            topic.clone(),
            fanout,
            self.topics.clone(),
        ));

        Ok(registration.boxed())
    }
}

#[async_trait]
impl<F> SubscriberCounter for RedisBroker<F>
where
    F: RedisFactory + Send + Sync + 'static,
{
    async fn subscriber_count(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<usize, SubscriptionError> {
        Ok(self
            .topics
            .lock()
            .await
            .get(topic)
            .map(Fanout::len)
            .unwrap_or_default())
    }
}

/// Forwards messages from a dedicated subscription connection into the local fanout
///
/// Runs until either the last local subscriber is gone or the server closes the connection.
#[instrument(skip(pubsub, fanout, topics), fields(%topic))]
async fn pump<P: PubSubResource>(
    mut pubsub: P,
    topic: TopicDescriptor,
    fanout: Fanout<RawMessage>,
    topics: TopicRegistry,
) {
    let closed_by_server = {
        let mut messages = pubsub.on_message();

        loop {
            tokio::select! {
                message = messages.next() => match message {
                    Some(message) => {
                        let delivered = fanout.broadcast(Ok(message.get_payload_bytes().to_vec()));
                        trace!(delivered, "Forwarded payload");
                    }
                    None => break true,
                },
                _ = fanout.emptied() => {
                    let mut topics = topics.lock().await;
                    if fanout.is_empty() {
                        topics.remove(&topic);
                        break false;
                    }
                }
            }
        }
    };

    if closed_by_server {
        warn!("Broker subscription closed unexpectedly");
        topics.lock().await.remove(&topic);
        fanout.broadcast(Err(SubscriptionError::StreamClosed {
            topic: topic.to_string(),
        }));
        fanout.close();
        return;
    }

    debug!("Releasing broker subscription");
    if let Err(e) = pubsub.unsubscribe(topic.key()).await {
        let error = ConnectionTeardownError {
            topic: topic.to_string(),
            source: e.into(),
        };
        warn!(%error, "Unable to unsubscribe cleanly");
    }
}
