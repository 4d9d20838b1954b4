//! Trait implementations using [`redis`](::redis)
//!
//! Payloads are sent with [`PUBLISH`](https://redis.io/commands/publish) and received through
//! [`SUBSCRIBE`](https://redis.io/commands/subscribe). Connection management is left to a
//! [`RedisFactory`] so that callers may monitor and recycle connections as they see fit.

mod broker;

pub use broker::*;

use crate::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use redis::aio::{ConnectionLike, PubSub};
use redis::{Msg, RedisError, RedisResult};

/// Wrapper trait for [`PubSub`](redis::aio::PubSub) to allow for black-box implementation
#[async_trait]
pub trait PubSubResource: Send {
    /// Subscribe to a channel by name
    async fn subscribe(&mut self, channel: &str) -> RedisResult<()>;

    /// Unsubscribe from a channel by name
    async fn unsubscribe(&mut self, channel: &str) -> RedisResult<()>;

    /// Listen for incoming messages on all subscribed channels
    fn on_message(&mut self) -> BoxStream<'_, Msg>;
}

#[async_trait]
impl PubSubResource for PubSub {
    async fn subscribe(&mut self, channel: &str) -> RedisResult<()> {
        PubSub::subscribe(self, channel).await
    }

    async fn unsubscribe(&mut self, channel: &str) -> RedisResult<()> {
        PubSub::unsubscribe(self, channel).await
    }

    fn on_message(&mut self) -> BoxStream<'_, Msg> {
        PubSub::on_message(self).boxed()
    }
}

/// Factory for redis connections
#[async_trait]
pub trait RedisFactory {
    /// Type returned when creating a PubSub connection
    type PubSub: PubSubResource + 'static;
    /// Type returned for regular commands
    type Connection: ConnectionLike + Send + 'static;

    /// Creates a new dedicated PubSub connection
    async fn pubsub(&self) -> Result<Self::PubSub, BoxedError>;

    /// Establishes a new connection or clones a shared one
    async fn connection(&self) -> Result<Self::Connection, BoxedError>;
}

/// Whether the error indicates that the connection to the server is gone
pub fn is_disconnect(error: &RedisError) -> bool {
    error.is_connection_dropped()
        || error.is_io_error()
        || error.is_connection_refusal()
        || error.is_timeout()
}
