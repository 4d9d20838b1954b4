//! In-process broker for single-instance deployments
//!
//! Payloads never leave the process. Each topic is backed by one [`Fanout`] which is created
//! lazily on the first subscription and retained for the lifetime of the broker.

use super::super::fanout::Fanout;
use super::super::pubsub::{
    RawMessage, RawPublisher, RawSubscriber, RawSubscription, SubscriberCounter,
    TopicDescriptor,
};
use super::super::{PublishError, SubscriptionError};
use super::json::{JsonPublisher, JsonSubscriber};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Broker implementation which delivers payloads within the current process only
#[derive(Default)]
pub struct MemoryBroker {
    topics: Mutex<HashMap<TopicDescriptor, Fanout<RawMessage>>>,
}

impl MemoryBroker {
    /// Creates a new instance without any subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<TopicDescriptor, Fanout<RawMessage>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonPublisher for MemoryBroker {}
impl JsonSubscriber for MemoryBroker {}

#[async_trait]
impl RawPublisher for MemoryBroker {
    async fn publish_raw(
        &self,
        topic: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<usize, PublishError> {
        let fanout = self.topics().get(topic).cloned();
        let receivers = fanout
            .map(|fanout| fanout.broadcast(Ok(payload.to_vec())))
            .unwrap_or_default();

        trace!(%topic, receivers, "Published payload in-process");

        Ok(receivers)
    }
}

#[async_trait]
impl RawSubscriber for MemoryBroker {
    async fn subscribe_raw(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<RawSubscription, SubscriptionError> {
        let registration = self
            .topics()
            .entry(topic.clone())
            .or_insert_with(Fanout::new)
            .register();

        trace!(%topic, id = %registration.id(), "Registered in-process subscriber");

        Ok(registration.boxed())
    }
}

#[async_trait]
impl SubscriberCounter for MemoryBroker {
    async fn subscriber_count(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<usize, SubscriptionError> {
        Ok(self
            .topics()
            .get(topic)
            .map(Fanout::len)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod does {
    use super::*;

    const TOPIC: TopicDescriptor = TopicDescriptor::from_static("memory-test");
    const OTHER_TOPIC: TopicDescriptor = TopicDescriptor::from_static("memory-test-other");

    #[tokio::test]
    async fn fan_out_to_all_subscribers() {
        let broker = MemoryBroker::new();
        let mut subscriptions = Vec::new();
        for _ in 0..5 {
            subscriptions.push(broker.subscribe_raw(&TOPIC).await.unwrap());
        }

        assert_eq!(broker.publish_raw(&TOPIC, b"payload").await.unwrap(), 5);

        for subscription in subscriptions.iter_mut() {
            assert_eq!(subscription.next().await, Some(Ok(b"payload".to_vec())));
        }
    }

    #[tokio::test]
    async fn drop_payloads_without_subscribers() {
        let broker = MemoryBroker::new();
        assert_eq!(broker.publish_raw(&TOPIC, b"lost").await.unwrap(), 0);

        let mut subscription = broker.subscribe_raw(&TOPIC).await.unwrap();
        broker.publish_raw(&TOPIC, b"seen").await.unwrap();

        assert_eq!(subscription.next().await, Some(Ok(b"seen".to_vec())));
    }

    #[tokio::test]
    async fn keep_topics_apart() {
        let broker = MemoryBroker::new();
        let _subscription = broker.subscribe_raw(&TOPIC).await.unwrap();

        assert_eq!(broker.publish_raw(&OTHER_TOPIC, b"elsewhere").await.unwrap(), 0);
        assert_eq!(broker.subscriber_count(&OTHER_TOPIC).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn count_subscribers() {
        let broker = MemoryBroker::new();
        assert_eq!(broker.subscriber_count(&TOPIC).await.unwrap(), 0);

        let first = broker.subscribe_raw(&TOPIC).await.unwrap();
        let second = broker.subscribe_raw(&TOPIC).await.unwrap();
        assert_eq!(broker.subscriber_count(&TOPIC).await.unwrap(), 2);

        drop(first);
        assert_eq!(broker.subscriber_count(&TOPIC).await.unwrap(), 1);

        drop(second);
        assert_eq!(broker.subscriber_count(&TOPIC).await.unwrap(), 0);
    }
}
