//! Structures to communicate between processes using publish and subscribe
//!
//! A publisher hands an opaque payload to a broker which forwards it to everybody
//! that is subscribed to the same [`Topic`](pubsub::TopicDescriptor) at that very moment.
//! There is no backlog: subscribers only observe what has been published after their
//! subscription has been established. Notifications are strongly typed through the
//! [`Notification`](pubsub::Notification) trait which binds a data structure to its topic.
//!
//! Within a process, a single broker subscription is shared between any number of local
//! subscribers. The [`fanout`] module contains the registry which multiplexes one incoming
//! message onto every local subscriber.

mod error;

pub mod fanout;
pub mod implementation;
pub mod pubsub;

pub use error::*;
