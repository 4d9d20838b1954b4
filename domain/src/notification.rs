//! Broadcast of "new movie" announcements to every connected client
//!
//! The [`NotificationChannel`] binds the fixed [`NOTIFICATION`](NotificationEvent::topic) topic
//! to the [`NotificationEvent`] payload. It neither stores nor replays events: a stream only
//! observes what is emitted after it has been created.

use futures::{stream, StreamExt};
use library::communication::pubsub::{
    Notification, NotificationPublisher, NotificationStream, NotificationSubscriber,
    SubscriberCounter, TopicDescriptor,
};
use library::communication::{PublishError, SubscriptionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const TOPIC: TopicDescriptor = TopicDescriptor::from_static("NOTIFICATION");

/// Message announced whenever the `notify` operation is invoked
pub const NEW_MOVIE_MESSAGE: &str = "New movie launched!";

/// Fixed reply handed to the caller of the `notify` operation
pub const NOTIFICATION_SENT: &str = "Notification sent!";

/// Transient announcement delivered to all current subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEvent {
    /// Human readable text of the announcement
    pub message: String,
}

impl Notification for NotificationEvent {
    fn topic() -> TopicDescriptor {
        TOPIC
    }
}

/// Confirmation that the broker accepted a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Number of receivers reported by the broker
    pub receivers: usize,
}

/// Typed access to the notification topic of a broker
#[derive(Clone)]
pub struct NotificationChannel<B> {
    broker: B,
}

impl<B> NotificationChannel<B>
where
    B: NotificationPublisher + NotificationSubscriber + SubscriberCounter + Send + Sync,
{
    /// Creates a new channel on top of the given broker handle
    pub fn new(broker: B) -> Self {
        Self { broker }
    }

    /// Publishes a [`NotificationEvent`] and waits for the broker to acknowledge it
    ///
    /// Exactly one publish is attempted per call. The acknowledgement makes no statement about
    /// whether any subscriber actually received the event.
    #[instrument(skip(self, message))]
    pub async fn emit(&self, message: impl Into<String>) -> Result<Acknowledgement, PublishError> {
        let event = NotificationEvent {
            message: message.into(),
        };

        let receivers = self.broker.publish(&event).await?;
        debug!(receivers, "Notification published");

        Ok(Acknowledgement { receivers })
    }

    /// Registers a new subscriber and returns the events published from now on
    ///
    /// Each call creates an independent registration. The registration is released once the
    /// stream is dropped or has yielded its first error, the stream ends right after that error.
    pub async fn stream(&self) -> Result<NotificationStream<NotificationEvent>, SubscriptionError> {
        let events = self.broker.subscribe::<NotificationEvent>().await?;

        // Dropping the inner stream on the first error releases the registration
        let stream = stream::unfold(Some(events), |events| async move {
            let mut events = events?;
            let item = events.next().await?;
            let remaining = if item.is_err() { None } else { Some(events) };

            Some((item, remaining))
        })
        .boxed();

        Ok(stream)
    }

    /// Number of registrations this process currently holds on the notification topic
    pub async fn subscriber_count(&self) -> Result<usize, SubscriptionError> {
        self.broker.subscriber_count(&TOPIC).await
    }
}
