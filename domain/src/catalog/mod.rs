//! Read-only view on the movie graph
//!
//! Movies and actors are linked through `ACTED_IN` relationships pointing from a movie to the
//! actors that appear in it. Identifiers are opaque strings stored on the nodes themselves.

mod memory;
mod neo4j;

pub use self::memory::*;
pub use self::neo4j::*;

use async_trait::async_trait;
use library::graph::GraphError;
use thiserror::Error;

/// Film stored in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Year of release, if known
    pub released: Option<i64>,
}

/// Person appearing in movies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Unique identifier
    pub id: String,
    /// Full name
    pub name: String,
}

/// Restriction applied to listing operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Case-insensitive substring the title or name has to contain
    pub contains: Option<String>,
    /// Maximum number of returned entries
    pub limit: Option<i64>,
}

impl Filter {
    /// Number of entries returned when no explicit limit is set
    pub const DEFAULT_LIMIT: i64 = 100;

    /// Effective limit, negative values are treated as zero
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).max(0)
    }

    /// Lowercase needle to match against, empty if every entry matches
    pub fn needle(&self) -> String {
        self.contains
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default()
    }
}

/// Errors that may occur while reading from the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying graph database failed
    #[error("graph database failure")]
    Graph(#[from] GraphError),
}

/// Source of movies and actors
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists movies whose title matches the filter, ordered by title
    async fn movies(&self, filter: &Filter) -> Result<Vec<Movie>, CatalogError>;

    /// Looks up a single movie
    async fn movie(&self, id: &str) -> Result<Option<Movie>, CatalogError>;

    /// Lists actors whose name matches the filter, ordered by name
    async fn actors(&self, filter: &Filter) -> Result<Vec<Actor>, CatalogError>;

    /// Looks up a single actor
    async fn actor(&self, id: &str) -> Result<Option<Actor>, CatalogError>;

    /// Actors appearing in a movie, ordered by name
    async fn actors_in(&self, movie_id: &str) -> Result<Vec<Actor>, CatalogError>;

    /// Movies an actor appeared in, ordered by title
    async fn movies_of(&self, actor_id: &str) -> Result<Vec<Movie>, CatalogError>;
}
