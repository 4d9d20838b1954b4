//! GraphQL gateway to the movie graph including real-time notifications

use async_trait::async_trait;
use domain::catalog::{Catalog, Neo4jCatalog};
use harness::{DummyResourceHandleProvider, Heart, Module, MonitoredRedisFactory};
use jatsl::{schedule, JobScheduler};
use library::{BoxedError, EmptyResult};
use std::sync::Arc;
use tracing::{info, instrument};

mod context;
mod options;
mod schema;
mod server;

pub use context::AcknowledgementPolicy;
pub use options::Options;

use crate::options::BrokerKind;
use server::{ServerConfig, ServerJob};

/// Module implementation
pub struct Gateway {
    options: Options,
    catalog: Option<Arc<dyn Catalog>>,
}

impl Gateway {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self {
            options,
            catalog: None,
        }
    }

    fn server_config(&self) -> ServerConfig {
        let acknowledgement = if self.options.fire_and_forget {
            AcknowledgementPolicy::FireAndForget
        } else {
            AcknowledgementPolicy::Propagate
        };

        ServerConfig {
            host: self.options.host.clone(),
            port: self.options.port,
            path: self.options.path.trim_matches('/').to_owned(),
            keep_alive: self.options.keep_alive,
            acknowledgement,
        }
    }
}

#[async_trait]
impl Module for Gateway {
    #[instrument(skip(self), fields(broker = %self.options.broker))]
    async fn pre_startup(&mut self) -> EmptyResult {
        let path = self.options.path.trim_matches('/');
        if path.is_empty() || path.contains('/') {
            return Err(format!("GraphQL path must be a single segment, got '{}'", path).into());
        }

        if self.options.broker == BrokerKind::Redis {
            MonitoredRedisFactory::new(
                self.options.redis.url.clone(),
                DummyResourceHandleProvider::new(),
            )
            .ping()
            .await?;
            info!("Redis server reachable");
        }

        let database = self.options.neo4j.connect().await?;
        info!(uri = %self.options.neo4j.uri, "Connected to graph database");
        self.catalog = Some(Arc::new(Neo4jCatalog::new(database)));

        Ok(())
    }

    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let catalog = self
            .catalog
            .clone()
            .ok_or("graph database has not been connected")?;

        let server_job = ServerJob::new(
            self.server_config(),
            self.options.broker,
            self.options.redis.url.clone(),
            catalog,
        );

        schedule!(scheduler, { server_job });

        Ok(Some(Heart::without_heart_stone()))
    }
}
