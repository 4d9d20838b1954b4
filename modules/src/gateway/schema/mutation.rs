use super::{AcknowledgementPolicy, GqlContext};
use domain::notification::{NEW_MOVIE_MESSAGE, NOTIFICATION_SENT};
use juniper::{graphql_object, FieldResult};
use tracing::{info, warn};

pub struct Mutation;

#[graphql_object(context = GqlContext)]
impl Mutation {
    /// Announces a new movie to every subscribed client
    async fn notify(&self, context: &GqlContext) -> FieldResult<String> {
        match context.channel.emit(NEW_MOVIE_MESSAGE).await {
            Ok(ack) => {
                info!(receivers = ack.receivers, "Notification sent");
            }
            Err(error) if context.acknowledgement == AcknowledgementPolicy::FireAndForget => {
                warn!(%error, "Unable to publish notification");
            }
            Err(error) => return Err(error.into()),
        }

        Ok(NOTIFICATION_SENT.to_owned())
    }
}
