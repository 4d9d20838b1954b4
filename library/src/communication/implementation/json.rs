//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! Implementors of the raw broker traits may opt into the strongly typed traits by implementing
//! the marker traits in this module. The default implementations translate between the opaque
//! payloads on the wire and [`Notification`] structures using [`serde_json`].

use super::super::pubsub::{
    Notification, NotificationPublisher, NotificationStream, NotificationSubscriber,
    RawPublisher, RawSubscriber,
};
use super::super::{PublishError, SubscriptionError};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

/// Marker trait providing a default [`NotificationPublisher`] implementation based on [`serde_json`]
pub trait JsonPublisher: RawPublisher + Send + Sync {}

impl<P> JsonPublisher for Arc<P> where P: RawPublisher + Send + Sync + ?Sized {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: JsonPublisher,
{
    /// Serializes the notification using [`serde_json::to_vec`]
    async fn publish<N: Notification + Send + Sync>(
        &self,
        notification: &N,
    ) -> Result<usize, PublishError> {
        let data = serde_json::to_vec(notification)?;
        self.publish_raw(&N::topic(), &data).await
    }
}

/// Marker trait providing a default [`NotificationSubscriber`] implementation based on [`serde_json`]
pub trait JsonSubscriber: RawSubscriber + Send + Sync {}

impl<S> JsonSubscriber for Arc<S> where S: RawSubscriber + Send + Sync + ?Sized {}

#[async_trait]
impl<S> NotificationSubscriber for S
where
    S: JsonSubscriber,
{
    /// Parses each payload using [`serde_json::from_slice`]
    async fn subscribe<N: Notification + Send + 'static>(
        &self,
    ) -> Result<NotificationStream<N>, SubscriptionError> {
        let stream = self
            .subscribe_raw(&N::topic())
            .await?
            .map(|message| {
                message.and_then(|payload| {
                    serde_json::from_slice::<N>(&payload).map_err(|e| {
                        SubscriptionError::Deserialization {
                            reason: e.to_string(),
                        }
                    })
                })
            })
            .boxed();

        Ok(stream)
    }
}
