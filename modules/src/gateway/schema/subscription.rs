use super::types::Notification;
use super::GqlContext;
use futures::{Stream, StreamExt};
use juniper::{graphql_subscription, FieldError, FieldResult};
use std::pin::Pin;
use tracing::{debug, Instrument};

type NotificationStream = Pin<Box<dyn Stream<Item = FieldResult<Notification>> + Send>>;

pub struct Subscription;

#[graphql_subscription(context = GqlContext)]
impl Subscription {
    /// Announcements published after the subscription has been started
    async fn notification(context: &GqlContext) -> FieldResult<NotificationStream> {
        let span = tracing::info_span!("notification", connection = %context.connection_id);
        let stream = context.channel.stream().instrument(span.clone()).await?;
        debug!(parent: &span, "Notification subscription registered");

        let stream = stream
            .map(|item| item.map(Notification::from).map_err(FieldError::from))
            .boxed();

        Ok(stream)
    }
}
