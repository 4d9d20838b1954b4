use super::handle::{HandleRegistration, SharedConnection};
use super::pubsub::MonitoredPubSub;
use super::resource::RedisResource;
use async_trait::async_trait;
use jatsl::TaskResourceHandle;
use library::communication::implementation::redis::RedisFactory;
use library::helpers::redact_credentials;
use library::{BoxedError, EmptyResult};
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Errors that may occur while establishing a connection
#[derive(Debug, Error)]
pub enum RedisConnectError {
    /// URL could not be parsed
    #[error("invalid redis url {0}")]
    InvalidUrl(String, #[source] RedisError),
    /// Server refused or dropped the connection attempt
    #[error("unable to connect to redis server")]
    Refused(#[source] RedisError),
    /// Server did not answer in time
    #[error("timed out while connecting to redis after {0:?}")]
    Timeout(Duration),
}

/// [`RedisFactory`] implementation providing [`jatsl`] interop
///
/// Regular commands share one multiplexed connection which is owned by the factory and
/// re-established lazily after it failed. Every subscription gets a dedicated connection.
pub struct MonitoredRedisFactory {
    url: String,
    handle_provider: BoxedResourceHandleProvider,
    shared: Arc<SharedConnection>,
}

impl MonitoredRedisFactory {
    /// Creates a new factory opening connections to the given URL
    pub fn new(url: String, handle_provider: BoxedResourceHandleProvider) -> Self {
        Self {
            url,
            handle_provider,
            shared: Arc::new(SharedConnection::default()),
        }
    }

    /// Verifies that the server is reachable and answers commands
    pub async fn ping(&self) -> EmptyResult {
        let mut con = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    fn client(&self) -> Result<Client, RedisConnectError> {
        Client::open(self.url.as_str())
            .map_err(|e| RedisConnectError::InvalidUrl(redact_credentials(&self.url), e))
    }

    async fn connect<T, F>(&self, attempt: F) -> Result<T, RedisConnectError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        let result = match timeout(CONNECT_TIMEOUT, attempt).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(e)) => Err(RedisConnectError::Refused(e)),
            Err(_) => Err(RedisConnectError::Timeout(CONNECT_TIMEOUT)),
        };

        if let Err(error) = &result {
            warn!(%error, url = %redact_credentials(&self.url), "Unable to connect to redis server");
        }

        result
    }

    async fn shared_connection(&self) -> Result<MultiplexedConnection, RedisConnectError> {
        let mut shared = self.shared.connection.lock().await;

        if let Some(con) = shared.as_ref() {
            trace!("Reusing existing shared connection");
            return Ok(con.clone());
        }

        debug!("Establishing shared connection");
        let client = self.client()?;
        let con = self
            .connect(client.get_multiplexed_tokio_connection())
            .await?;
        *shared = Some(con.clone());

        Ok(con)
    }
}

#[async_trait]
impl RedisFactory for MonitoredRedisFactory {
    type PubSub = MonitoredPubSub;
    type Connection = RedisResource<MultiplexedConnection>;

    async fn pubsub(&self) -> Result<Self::PubSub, BoxedError> {
        let handle = self.handle_provider.create_handle();
        let client = self.client()?;
        let con = self.connect(client.get_async_connection()).await?;

        Ok(MonitoredPubSub::new(
            con.into_pubsub(),
            HandleRegistration::owned(handle),
        ))
    }

    async fn connection(&self) -> Result<Self::Connection, BoxedError> {
        let handle = self.handle_provider.create_handle();
        let con = self.shared_connection().await?;

        Ok(RedisResource::new(
            con,
            HandleRegistration::shared(handle, self.shared.clone()),
        ))
    }
}

/// Factory to provide [`TaskResourceHandle`] instances
pub trait ResourceHandleProvider {
    /// Instantiates a new [`TaskResourceHandle`]
    fn create_handle(&self) -> TaskResourceHandle;
}

/// Stub resource handle provider
///
/// Creates new instances using [`TaskResourceHandle::stub()`] for situations where you do not need redundancy or task management
pub struct DummyResourceHandleProvider {}

impl DummyResourceHandleProvider {
    /// Creates a new instance wrapped in an [`Arc`]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {})
    }
}

impl ResourceHandleProvider for DummyResourceHandleProvider {
    fn create_handle(&self) -> TaskResourceHandle {
        TaskResourceHandle::stub()
    }
}

/// Dynamic dispatch version of [`ResourceHandleProvider`]
pub type BoxedResourceHandleProvider = Arc<dyn ResourceHandleProvider + Send + Sync>;
