use domain::catalog::Catalog;
use domain::notification::NotificationChannel;
use library::communication::pubsub::SharedBroker;
use std::sync::Arc;
use uuid::Uuid;

/// Reaction of the `notify` mutation to a failed publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcknowledgementPolicy {
    /// Failure is reported to the caller as a GraphQL error
    Propagate,
    /// Failure is logged and the caller receives the regular reply
    FireAndForget,
}

/// Per-request state handed to every resolver
#[derive(Clone)]
pub struct GqlContext {
    /// Notification topic of the broker shared by all connections
    pub channel: NotificationChannel<SharedBroker>,
    /// Read access to the movie graph
    pub catalog: Arc<dyn Catalog>,
    /// Behaviour of `notify` on publish failures
    pub acknowledgement: AcknowledgementPolicy,
    /// Identifier of the WebSocket connection, nil for plain HTTP requests
    pub connection_id: Uuid,
}

impl GqlContext {
    /// Creates a new context for plain HTTP requests
    pub fn new(
        broker: SharedBroker,
        catalog: Arc<dyn Catalog>,
        acknowledgement: AcknowledgementPolicy,
    ) -> Self {
        Self {
            channel: NotificationChannel::new(broker),
            catalog,
            acknowledgement,
            connection_id: Uuid::nil(),
        }
    }

    /// Clones the context and assigns a fresh connection identifier
    pub fn for_connection(&self) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            ..self.clone()
        }
    }
}

impl juniper::Context for GqlContext {}
