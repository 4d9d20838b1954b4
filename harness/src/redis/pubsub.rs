use super::handle::HandleRegistration;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{future, StreamExt};
use library::communication::implementation::redis::{is_disconnect, PubSubResource};
use redis::aio::PubSub;
use redis::{Msg, RedisResult};
use tracing::{error, warn};

/// Redis PubSub connection monitoring the connection state
///
/// The owning job is notified when the message stream ends unexpectedly or a command fails due to a lost connection.
pub struct MonitoredPubSub {
    pubsub: PubSub,
    handle: HandleRegistration,
}

impl MonitoredPubSub {
    pub(super) fn new(pubsub: PubSub, handle: HandleRegistration) -> Self {
        Self { pubsub, handle }
    }

    async fn check<T>(&mut self, result: RedisResult<T>) -> RedisResult<T> {
        if let Err(ref error) = result {
            if is_disconnect(error) {
                error!(?error, "Redis pubsub connection encountered error");
                self.handle.resource_died().await;
            }
        }

        result
    }
}

#[async_trait]
impl PubSubResource for MonitoredPubSub {
    async fn subscribe(&mut self, channel: &str) -> RedisResult<()> {
        let result = self.pubsub.subscribe(channel).await;
        self.check(result).await
    }

    async fn unsubscribe(&mut self, channel: &str) -> RedisResult<()> {
        let result = self.pubsub.unsubscribe(channel).await;
        self.check(result).await
    }

    fn on_message(&mut self) -> BoxStream<'_, Msg> {
        let mut handle = (*self.handle).clone();

        let death_notice = stream::once(async move {
            warn!("Redis pubsub stream ended");
            handle.resource_died().await;
            None
        });

        self.pubsub
            .on_message()
            .map(Some)
            .chain(death_notice)
            .filter_map(future::ready)
            .boxed()
    }
}
