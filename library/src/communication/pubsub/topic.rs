use std::borrow::Cow;
use std::fmt;

/// Named channel on a broker
///
/// Publishers and subscribers agree on the name out-of-band, usually by
/// sharing a [`Notification`](super::Notification) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicDescriptor {
    key: Cow<'static, str>,
}

impl TopicDescriptor {
    /// Creates a new instance from a compile-time constant
    pub const fn from_static(key: &'static str) -> Self {
        Self {
            key: Cow::Borrowed(key),
        }
    }

    /// Creates a new instance from a runtime value
    pub fn new(key: String) -> Self {
        Self {
            key: Cow::Owned(key),
        }
    }

    /// Value used by broker implementations to identify the topic
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for TopicDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
