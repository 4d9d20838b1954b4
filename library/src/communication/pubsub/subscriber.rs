use super::super::SubscriptionError;
use super::{Notification, TopicDescriptor};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Payload or failure delivered to a subscriber
pub type RawMessage = Result<Vec<u8>, SubscriptionError>;

/// Live sequence of raw payloads, dropping it releases the subscription
pub type RawSubscription = BoxStream<'static, RawMessage>;

/// Live sequence of typed notifications, dropping it releases the subscription
pub type NotificationStream<N> = BoxStream<'static, Result<N, SubscriptionError>>;

/// Structure which allows listening for serialized data on a topic
#[async_trait]
pub trait RawSubscriber {
    /// Registers a new subscriber which receives everything published from now on
    async fn subscribe_raw(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<RawSubscription, SubscriptionError>;
}

#[async_trait]
impl<S> RawSubscriber for Arc<S>
where
    S: RawSubscriber + Send + Sync + ?Sized,
{
    async fn subscribe_raw(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<RawSubscription, SubscriptionError> {
        (**self).subscribe_raw(topic).await
    }
}

/// Insight into the number of subscribers attached to a topic
#[async_trait]
pub trait SubscriberCounter {
    /// Number of subscribers registered with this process for the given topic
    async fn subscriber_count(&self, topic: &TopicDescriptor)
        -> Result<usize, SubscriptionError>;
}

#[async_trait]
impl<C> SubscriberCounter for Arc<C>
where
    C: SubscriberCounter + Send + Sync + ?Sized,
{
    async fn subscriber_count(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<usize, SubscriptionError> {
        (**self).subscriber_count(topic).await
    }
}

/// Subscriber for [`Notifications`](Notification)
#[async_trait]
pub trait NotificationSubscriber {
    /// Subscribes to the designated topic of a [`Notification`]
    async fn subscribe<N: Notification + Send + 'static>(
        &self,
    ) -> Result<NotificationStream<N>, SubscriptionError>;
}
