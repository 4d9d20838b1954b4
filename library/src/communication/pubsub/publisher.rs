use super::super::PublishError;
use super::{Notification, TopicDescriptor};
use async_trait::async_trait;
use std::sync::Arc;

/// Structure which allows publishing of serialized data to a topic
#[async_trait]
pub trait RawPublisher {
    /// Sends an opaque payload to a topic and returns the number of receivers reported by the broker
    async fn publish_raw(
        &self,
        topic: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<usize, PublishError>;
}

#[async_trait]
impl<P> RawPublisher for Arc<P>
where
    P: RawPublisher + Send + Sync + ?Sized,
{
    async fn publish_raw(
        &self,
        topic: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<usize, PublishError> {
        (**self).publish_raw(topic, payload).await
    }
}

/// Publisher for [`Notifications`](Notification)
#[async_trait]
pub trait NotificationPublisher {
    /// Publishes a [`Notification`] to its designated topic
    async fn publish<N: Notification + Send + Sync>(
        &self,
        notification: &N,
    ) -> Result<usize, PublishError>;
}
