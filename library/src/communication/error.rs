use crate::BoxedError;
use thiserror::Error;

/// Errors that may occur while publishing a payload to a broker
#[derive(Debug, Error)]
pub enum PublishError {
    /// Broker could not be reached
    #[error("broker is unreachable")]
    Unavailable(#[source] BoxedError),
    /// Broker received the publish but refused it
    #[error("broker rejected the publish to {topic}")]
    Rejected {
        /// Topic the payload was addressed to
        topic: String,
        /// Underlying error reported by the broker client
        #[source]
        source: BoxedError,
    },
    /// Notification could not be converted into its wire format
    #[error("failed to serialize notification")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that may occur while subscribing to or listening on a topic
///
/// The error is cloneable so that a single broker failure can be delivered to every local subscriber.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Subscription could not be established
    #[error("failed to subscribe to {topic}: {reason}")]
    Setup {
        /// Topic the subscription was requested for
        topic: String,
        /// Description of the underlying failure
        reason: String,
    },
    /// Underlying broker subscription has been closed
    #[error("broker subscription for {topic} has been closed")]
    StreamClosed {
        /// Topic of the closed subscription
        topic: String,
    },
    /// Received payload could not be parsed
    #[error("failed to deserialize notification: {reason}")]
    Deserialization {
        /// Description of the parser failure
        reason: String,
    },
}

/// Failure while releasing a broker subscription
///
/// Nobody is left to be told about this so it only ever ends up in the log.
#[derive(Debug, Error)]
#[error("failed to release broker subscription for {topic}")]
pub struct ConnectionTeardownError {
    /// Topic of the subscription
    pub topic: String,
    /// Underlying error
    #[source]
    pub source: BoxedError,
}
