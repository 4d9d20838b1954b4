//! Traits describing a publish and subscribe broker
//!
//! The low-level traits ([`RawPublisher`], [`RawSubscriber`]) move opaque payloads. Implementors
//! may opt into the strongly typed [`NotificationPublisher`] and [`NotificationSubscriber`] traits
//! by implementing the marker traits from the [`json`](super::implementation::json) module.

mod notification;
mod publisher;
mod subscriber;
mod topic;

pub use notification::*;
pub use publisher::*;
pub use subscriber::*;
pub use topic::*;

use std::sync::Arc;

/// Object-safe union of all raw broker capabilities
pub trait Broker: RawPublisher + RawSubscriber + SubscriberCounter + Send + Sync {}

impl<B> Broker for B where B: RawPublisher + RawSubscriber + SubscriberCounter + Send + Sync {}

/// Type erased broker which can be shared between tasks
pub type SharedBroker = Arc<dyn Broker>;
