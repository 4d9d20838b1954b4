//! Thin access layer for [`neo4j`](https://neo4j.com) graph databases using [`neo4rs`]
//!
//! Queries are expected to return scalar columns which are mapped into plain structures through
//! the [`FromRow`] trait. Connection establishment is retried a bounded number of times.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

pub use neo4rs::{query, Query, Row};

/// Errors that may occur while talking to the graph database
#[derive(Debug, Error)]
pub enum GraphError {
    /// Connection could not be established within the permitted number of attempts
    #[error("unable to connect to graph database after {attempts} attempts: {reason}")]
    Connection {
        /// Number of attempts made
        attempts: usize,
        /// Description of the last failure
        reason: String,
    },
    /// Query was rejected or failed during execution
    #[error("graph query failed: {0}")]
    Query(String),
    /// A row did not contain an expected column or it had an unexpected type
    #[error("column {0} is missing or has an unexpected type")]
    MissingColumn(&'static str),
}

/// Structure which can be built from a single result row
pub trait FromRow: Sized {
    /// Extracts the structure from a row
    fn from_row(row: &Row) -> Result<Self, GraphError>;
}

/// Unwraps a column value retrieved through [`Row::get`]
pub fn required<T>(value: Option<T>, column: &'static str) -> Result<T, GraphError> {
    value.ok_or(GraphError::MissingColumn(column))
}

/// Shared handle to a graph database
#[derive(Clone)]
pub struct GraphDatabase {
    graph: Arc<neo4rs::Graph>,
}

impl GraphDatabase {
    /// Connects to the database, retrying up to `attempts` times
    ///
    /// Only the bolt protocol is spoken, a leading `bolt://` or `neo4j://` scheme is stripped.
    /// A warning is logged on the first failed attempt only.
    #[instrument(skip(password))]
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        attempts: usize,
    ) -> Result<Self, GraphError> {
        let address = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
        let retry_interval = Duration::from_secs(2);
        let request_timeout = Duration::from_secs(4);
        let mut reason = String::from("no connection attempt made");

        for attempt in 1..=attempts {
            match timeout(request_timeout, neo4rs::Graph::new(address, user, password)).await {
                Ok(Ok(graph)) => {
                    debug!(attempt, "Connected to graph database");
                    return Ok(Self {
                        graph: Arc::new(graph),
                    });
                }
                Ok(Err(e)) => reason = format!("{:?}", e),
                Err(_) => reason = String::from("connection attempt timed out"),
            }

            if attempt == 1 {
                warn!(%reason, "Unable to connect to graph database, retrying");
            }

            if attempt < attempts {
                sleep(retry_interval).await;
            }
        }

        Err(GraphError::Connection { attempts, reason })
    }

    /// Executes a query and maps every returned row
    pub async fn fetch<T: FromRow>(&self, query: Query) -> Result<Vec<T>, GraphError> {
        let mut stream = self
            .graph
            .execute(query)
            .await
            .map_err(|e| GraphError::Query(format!("{:?}", e)))?;

        let mut items = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| GraphError::Query(format!("{:?}", e)))?
        {
            items.push(T::from_row(&row)?);
        }

        Ok(items)
    }

    /// Executes a query and maps the first returned row, if any
    pub async fn fetch_optional<T: FromRow>(&self, query: Query) -> Result<Option<T>, GraphError> {
        Ok(self.fetch(query).await?.into_iter().next())
    }

    /// Verifies that the database answers queries
    pub async fn ping(&self) -> Result<(), GraphError> {
        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| GraphError::Query(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn report_missing_columns() {
        assert_eq!(required(Some(42), "answer").unwrap(), 42);
        assert!(matches!(
            required::<i64>(None, "answer"),
            Err(GraphError::MissingColumn("answer"))
        ));
    }

    #[tokio::test]
    async fn give_up_after_attempts() {
        let result = GraphDatabase::connect("bolt://localhost:7687", "neo4j", "secret", 0).await;

        assert!(matches!(
            result,
            Err(GraphError::Connection { attempts: 0, .. })
        ));
    }

    #[tokio::test]
    #[ignore = "requires a neo4j server at NEO4J_TEST_URI"]
    async fn answer_queries() {
        struct One(i64);

        impl FromRow for One {
            fn from_row(row: &Row) -> Result<Self, GraphError> {
                Ok(One(required(row.get("one"), "one")?))
            }
        }

        let uri = std::env::var("NEO4J_TEST_URI").unwrap_or_else(|_| "localhost:7687".into());
        let password = std::env::var("NEO4J_PASSWORD").unwrap();
        let database = GraphDatabase::connect(&uri, "neo4j", &password, 3)
            .await
            .unwrap();

        database.ping().await.unwrap();

        let rows: Vec<One> = database.fetch(query("RETURN 1 AS one")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 1);
    }
}
