use super::TopicDescriptor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Entity to notify other parties about an event that took place
pub trait Notification: Serialize + DeserializeOwned + Debug {
    /// Topic on which this implementation is sent and received
    fn topic() -> TopicDescriptor;
}
