//! Broker double which verifies published notifications against a list of expectations
//!
//! Delivery is delegated to an inner [`MemoryBroker`] so that subscribers behave exactly as they
//! would in a single-instance deployment. Publish failures can be injected to exercise error paths.

use super::super::pubsub::{
    Notification, RawPublisher, RawSubscriber, RawSubscription, SubscriberCounter,
    TopicDescriptor,
};
use super::super::{PublishError, SubscriptionError};
use super::json::{JsonPublisher, JsonSubscriber};
use super::memory::MemoryBroker;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Strictness of a [`MockBroker`] when encountering publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectationMode {
    /// Publishes are never verified
    Ignore,
    /// Every publish has to match the next expectation
    ExpectOnlyProvided,
    /// Publishes that do not match the next expectation are skipped
    AllowNoise,
}

#[derive(Debug)]
struct ExpectedPublish {
    topic: TopicDescriptor,
    payload: Value,
}

/// Broker that asserts on publishes and delivers them in-process
pub struct MockBroker {
    inner: MemoryBroker,
    mode: ExpectationMode,
    expected: Mutex<VecDeque<ExpectedPublish>>,
    remaining: AtomicUsize,
    failures: AtomicUsize,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::with_mode(ExpectationMode::ExpectOnlyProvided)
    }
}

impl MockBroker {
    /// Creates a new instance with the given strictness
    pub fn with_mode(mode: ExpectationMode) -> Self {
        Self {
            inner: MemoryBroker::new(),
            mode,
            expected: Mutex::new(VecDeque::new()),
            remaining: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Creates a new instance which skips unexpected publishes
    pub fn permitting_noise() -> Self {
        Self::with_mode(ExpectationMode::AllowNoise)
    }

    /// Creates a new instance which does not verify publishes at all
    pub fn ignoring_publishes() -> Self {
        Self::with_mode(ExpectationMode::Ignore)
    }

    /// Appends a notification to the list of expected publishes
    pub fn expect<N: Notification>(&self, notification: &N) -> &Self {
        let payload =
            serde_json::to_value(notification).expect("Expected value failed to convert to JSON");

        println!("EXP {} {}", N::topic(), payload);

        self.expected.lock().unwrap().push_back(ExpectedPublish {
            topic: N::topic(),
            payload,
        });
        self.remaining.fetch_add(1, Ordering::SeqCst);

        self
    }

    /// Makes the next `count` publishes fail as if the broker was unreachable
    pub fn fail_next_publishes(&self, count: usize) -> &Self {
        self.failures.fetch_add(count, Ordering::SeqCst);
        self
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
            .is_ok()
    }

    fn verify(&self, topic: &TopicDescriptor, payload: &[u8]) {
        let payload: Value =
            serde_json::from_slice(payload).expect("Published payload is not valid JSON");

        println!("PUB {} {}", topic, payload);

        let mut expected = self.expected.lock().unwrap();

        match self.mode {
            ExpectationMode::Ignore => {}
            ExpectationMode::ExpectOnlyProvided => match expected.pop_front() {
                None => panic!(
                    "Unexpected notification was published to {}: {}",
                    topic, payload
                ),
                Some(next) => {
                    assert_eq!(
                        next.topic, *topic,
                        "Notification topic (right) did not match expectation (left)"
                    );
                    assert_eq!(next.payload, payload);
                }
            },
            ExpectationMode::AllowNoise => {
                let matches = expected
                    .front()
                    .map(|next| next.topic == *topic && next.payload == payload)
                    .unwrap_or(false);

                if matches {
                    expected.pop_front();
                }
            }
        }

        self.remaining.store(expected.len(), Ordering::SeqCst);
    }
}

impl JsonPublisher for MockBroker {}
impl JsonSubscriber for MockBroker {}

#[async_trait]
impl RawPublisher for MockBroker {
    async fn publish_raw(
        &self,
        topic: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<usize, PublishError> {
        if self.take_failure() {
            return Err(PublishError::Unavailable("injected publish failure".into()));
        }

        self.verify(topic, payload);
        self.inner.publish_raw(topic, payload).await
    }
}

#[async_trait]
impl RawSubscriber for MockBroker {
    async fn subscribe_raw(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<RawSubscription, SubscriptionError> {
        self.inner.subscribe_raw(topic).await
    }
}

#[async_trait]
impl SubscriberCounter for MockBroker {
    async fn subscriber_count(
        &self,
        topic: &TopicDescriptor,
    ) -> Result<usize, SubscriptionError> {
        self.inner.subscriber_count(topic).await
    }
}

impl Drop for MockBroker {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let remaining = self.remaining.load(Ordering::SeqCst);

            if self.mode != ExpectationMode::Ignore && remaining > 0 {
                panic!(
                    "MockBroker was dropped with {} expected notifications remaining",
                    remaining
                );
            }
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::communication::pubsub::{NotificationPublisher, NotificationSubscriber};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockNotification(usize);

    impl Notification for MockNotification {
        fn topic() -> TopicDescriptor {
            TopicDescriptor::from_static("mock")
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct ComplexMockNotification {
        answer: usize,
        other_field: String,
    }

    impl Notification for ComplexMockNotification {
        fn topic() -> TopicDescriptor {
            TopicDescriptor::from_static("mock")
        }
    }

    #[tokio::test]
    async fn fulfill_expectations() {
        let notification = MockNotification(42);
        let broker = MockBroker::default();

        broker.expect(&notification);
        broker.publish(&notification).await.unwrap();
    }

    #[tokio::test]
    async fn allow_noise() {
        let notification = MockNotification(42);
        let noise = MockNotification(1337);
        let broker = MockBroker::permitting_noise();

        broker.expect(&notification);
        broker.publish(&noise).await.unwrap();
        broker.publish(&notification).await.unwrap();
        broker.publish(&noise).await.unwrap();
    }

    #[tokio::test]
    async fn deliver_to_subscribers() {
        let broker = MockBroker::ignoring_publishes();
        let mut stream = broker.subscribe::<MockNotification>().await.unwrap();

        assert_eq!(broker.publish(&MockNotification(7)).await.unwrap(), 1);
        assert_eq!(stream.next().await, Some(Ok(MockNotification(7))));
    }

    #[tokio::test]
    async fn inject_failures() {
        let broker = MockBroker::ignoring_publishes();
        broker.fail_next_publishes(1);

        assert!(matches!(
            broker.publish(&MockNotification(1)).await,
            Err(PublishError::Unavailable(_))
        ));
        assert!(broker.publish(&MockNotification(2)).await.is_ok());
    }

    #[tokio::test]
    #[should_panic]
    async fn fail_on_different_content() {
        let expected = ComplexMockNotification {
            answer: 42,
            other_field: "hello world".into(),
        };

        let actual = ComplexMockNotification {
            answer: 42,
            other_field: "hello john".into(),
        };

        let broker = MockBroker::default();

        broker.expect(&expected);
        broker.publish(&actual).await.unwrap();
    }

    #[tokio::test]
    #[should_panic]
    async fn fail_on_unexpected() {
        let broker = MockBroker::default();
        broker.publish(&MockNotification(42)).await.unwrap();
    }

    #[tokio::test]
    #[should_panic]
    async fn fail_on_missing() {
        MockBroker::default().expect(&MockNotification(42));
    }
}
